/// Authenticated caller
///
/// Built by the API's authentication extractor once the bearer token has been
/// validated, checked against the revocation store and resolved to an active
/// user. Handlers use it for policy checks and ownership tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::policy::{self, Action, AuthzError, Resource};
use crate::models::user::{User, UserRole};

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,

    /// Id of the access token used for this request
    pub jti: Uuid,

    /// Expiry of that token, kept so logout can revoke it for its remaining lifetime
    pub token_expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn new(user: User, jti: Uuid, token_expires_at: DateTime<Utc>) -> Self {
        Self {
            user,
            jti,
            token_expires_at,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    /// Runs the policy check for this caller
    pub fn authorize(
        &self,
        resource: Resource,
        action: Action,
        is_owner: bool,
    ) -> Result<(), AuthzError> {
        policy::authorize(self.role(), resource, action, is_owner)
    }

    pub fn can(&self, resource: Resource, action: Action, is_owner: bool) -> bool {
        policy::can(self.role(), resource, action, is_owner)
    }

    pub fn sees_sensitive(&self, resource: Resource, is_owner: bool) -> bool {
        policy::sees_sensitive(resource, self.role(), is_owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::tests::sample_user;

    #[test]
    fn test_context_delegates_to_policy() {
        let coach = AuthContext::new(sample_user(UserRole::Coach), Uuid::new_v4(), Utc::now());

        assert_eq!(coach.role(), UserRole::Coach);
        assert!(!coach.is_admin());
        assert!(coach.authorize(Resource::Matches, Action::Create, false).is_ok());
        assert!(!coach.can(Resource::Finances, Action::Approve, false));
        assert!(coach.sees_sensitive(Resource::Players, false));
    }
}
