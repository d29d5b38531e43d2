/// Role-based access policy
///
/// Every permission check in the API goes through [`authorize`], which looks
/// up one row of [`RULES`] for a (resource, action) pair. A rule grants the
/// action to a set of roles outright and to a second set of roles only when
/// the caller owns the record (their own player profile, an article they
/// wrote, their own account).
///
/// | Resource  | Read                  | Create              | Update                          | Delete                          | Approve | Publish |
/// |-----------|-----------------------|---------------------|---------------------------------|---------------------------------|---------|---------|
/// | Users     | admin, owner          |                     | admin, owner                    |                                 |         |         |
/// | Players   | everyone              | admin, coach        | admin, coach, owning player     | admin                           |         |         |
/// | Matches   | everyone              | admin, coach        | admin, coach                    | admin                           |         |         |
/// | Trainings | everyone              | admin, coach        | admin, coach                    | admin                           |         |         |
/// | Finances  | admin, coach, staff   | admin, staff        | admin, staff                    | admin                           | admin   |         |
/// | News      | everyone (published)  | admin, coach, staff | admin, owning coach/staff       | admin, owning coach/staff       |         | admin   |
///
/// `Manage` on users (activate/deactivate) is admin only.
///
/// # Example
///
/// ```
/// use clubhouse_shared::auth::policy::{authorize, Action, Resource};
/// use clubhouse_shared::models::user::UserRole;
///
/// assert!(authorize(UserRole::Coach, Resource::Matches, Action::Update, false).is_ok());
///
/// let denied = authorize(UserRole::Staff, Resource::Finances, Action::Approve, false);
/// assert_eq!(denied.unwrap_err().to_string(), "Admin access required");
/// ```

use crate::models::user::UserRole::{self, Admin, Coach, Player, Staff, Supporter};

pub const ADMIN_REQUIRED: &str = "Admin access required";
pub const ADMIN_OR_COACH_REQUIRED: &str = "Admin or coach access required";
pub const PERMISSION_DENIED: &str = "Permission denied";

/// Protected resource groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    Players,
    Matches,
    Trainings,
    Finances,
    News,
}

/// Actions on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    /// Finance approve, reject and complete
    Approve,
    /// News publish and unpublish
    Publish,
    /// Account activation
    Manage,
}

/// Authorization failure; the message is shown to the client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct AuthzError(pub &'static str);

/// One row of the policy table
#[derive(Debug)]
pub struct Rule {
    pub resource: Resource,
    pub action: Action,
    /// Roles granted regardless of ownership
    pub roles: &'static [UserRole],
    /// Roles granted only on records they own
    pub owner_roles: &'static [UserRole],
    /// Message returned when the rule denies
    pub denial: &'static str,
}

const EVERYONE: &[UserRole] = &[Admin, Coach, Player, Staff, Supporter];
const ADMIN: &[UserRole] = &[Admin];
const ADMIN_COACH: &[UserRole] = &[Admin, Coach];
const NOBODY: &[UserRole] = &[];

const fn rule(
    resource: Resource,
    action: Action,
    roles: &'static [UserRole],
    owner_roles: &'static [UserRole],
    denial: &'static str,
) -> Rule {
    Rule {
        resource,
        action,
        roles,
        owner_roles,
        denial,
    }
}

pub static RULES: &[Rule] = &[
    rule(Resource::Users, Action::Read, ADMIN, EVERYONE, ADMIN_REQUIRED),
    rule(Resource::Users, Action::Update, ADMIN, EVERYONE, ADMIN_REQUIRED),
    rule(Resource::Users, Action::Manage, ADMIN, NOBODY, ADMIN_REQUIRED),
    rule(Resource::Players, Action::Read, EVERYONE, NOBODY, PERMISSION_DENIED),
    rule(Resource::Players, Action::Create, ADMIN_COACH, NOBODY, ADMIN_OR_COACH_REQUIRED),
    rule(Resource::Players, Action::Update, ADMIN_COACH, &[Player], PERMISSION_DENIED),
    rule(Resource::Players, Action::Delete, ADMIN, NOBODY, ADMIN_REQUIRED),
    rule(Resource::Matches, Action::Read, EVERYONE, NOBODY, PERMISSION_DENIED),
    rule(Resource::Matches, Action::Create, ADMIN_COACH, NOBODY, ADMIN_OR_COACH_REQUIRED),
    rule(Resource::Matches, Action::Update, ADMIN_COACH, NOBODY, ADMIN_OR_COACH_REQUIRED),
    rule(Resource::Matches, Action::Delete, ADMIN, NOBODY, ADMIN_REQUIRED),
    rule(Resource::Trainings, Action::Read, EVERYONE, NOBODY, PERMISSION_DENIED),
    rule(Resource::Trainings, Action::Create, ADMIN_COACH, NOBODY, ADMIN_OR_COACH_REQUIRED),
    rule(Resource::Trainings, Action::Update, ADMIN_COACH, NOBODY, ADMIN_OR_COACH_REQUIRED),
    rule(Resource::Trainings, Action::Delete, ADMIN, NOBODY, ADMIN_REQUIRED),
    rule(Resource::Finances, Action::Read, &[Admin, Coach, Staff], NOBODY, PERMISSION_DENIED),
    rule(Resource::Finances, Action::Create, &[Admin, Staff], NOBODY, PERMISSION_DENIED),
    rule(Resource::Finances, Action::Update, &[Admin, Staff], NOBODY, PERMISSION_DENIED),
    rule(Resource::Finances, Action::Delete, ADMIN, NOBODY, ADMIN_REQUIRED),
    rule(Resource::Finances, Action::Approve, ADMIN, NOBODY, ADMIN_REQUIRED),
    rule(Resource::News, Action::Read, EVERYONE, NOBODY, PERMISSION_DENIED),
    rule(Resource::News, Action::Create, &[Admin, Coach, Staff], NOBODY, PERMISSION_DENIED),
    rule(Resource::News, Action::Update, ADMIN, &[Coach, Staff], PERMISSION_DENIED),
    rule(Resource::News, Action::Delete, ADMIN, &[Coach, Staff], PERMISSION_DENIED),
    rule(Resource::News, Action::Publish, ADMIN, NOBODY, ADMIN_REQUIRED),
];

/// Finds the rule for a (resource, action) pair
pub fn rule_for(resource: Resource, action: Action) -> Option<&'static Rule> {
    RULES
        .iter()
        .find(|rule| rule.resource == resource && rule.action == action)
}

/// Checks whether `role` may perform `action` on `resource`
///
/// Pairs without a rule are denied.
pub fn authorize(
    role: UserRole,
    resource: Resource,
    action: Action,
    is_owner: bool,
) -> Result<(), AuthzError> {
    let Some(rule) = rule_for(resource, action) else {
        return Err(AuthzError(PERMISSION_DENIED));
    };

    if rule.roles.contains(&role) || (is_owner && rule.owner_roles.contains(&role)) {
        Ok(())
    } else {
        Err(AuthzError(rule.denial))
    }
}

pub fn can(role: UserRole, resource: Resource, action: Action, is_owner: bool) -> bool {
    authorize(role, resource, action, is_owner).is_ok()
}

/// Whether the caller gets the sensitive serialization of a record
///
/// - users: the account owner or an admin
/// - players: admin, coach, or the player themself
/// - finances: admin
pub fn sees_sensitive(resource: Resource, role: UserRole, is_owner: bool) -> bool {
    match resource {
        Resource::Users => role == Admin || is_owner,
        Resource::Players => matches!(role, Admin | Coach) || (is_owner && role == Player),
        Resource::Finances => role == Admin,
        Resource::Matches | Resource::Trainings | Resource::News => false,
    }
}

/// Non-admins may only edit transactions still awaiting approval
pub fn authorize_finance_edit(role: UserRole, is_pending: bool) -> Result<(), AuthzError> {
    authorize(role, Resource::Finances, Action::Update, false)?;

    if !is_pending && role != Admin {
        return Err(AuthzError("Cannot update approved/completed transactions"));
    }

    Ok(())
}
