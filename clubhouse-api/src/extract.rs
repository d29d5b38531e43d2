/// Request extractors
///
/// - `AuthContext`: the authenticated caller. Resolves the bearer token,
///   checks it against the revocation store and loads the (active) user.
///   `Option<AuthContext>` gives optional authentication.
/// - `ValidatedJson<T>`: JSON body run through `validator` before the handler sees it
/// - `ApiQuery<T>` / `ApiPath<T>`: query and path extractors whose rejections
///   use the API error envelope

use crate::{app::AppState, error::ApiError};
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header, request::Parts},
    Json,
};
use clubhouse_shared::{
    auth::{context::AuthContext, jwt},
    models::user::User,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Pulls the token out of `Authorization: Bearer <token>`
pub fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Expected Bearer token"))
}

/// Resolves an access token to the caller it belongs to
pub async fn authenticate(state: &AppState, token: &str) -> Result<AuthContext, ApiError> {
    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    if state.revocation.is_revoked(claims.jti).await? {
        return Err(ApiError::unauthorized("Token has been revoked"));
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized("Account is deactivated"));
    }

    tracing::debug!(user_id = %user.id, role = user.role.as_str(), "Request authenticated");
    Ok(AuthContext::new(user, claims.jti, claims.expires_at()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<AuthContext>() {
            return Ok(auth.clone());
        }

        let token = bearer_token(parts)?.to_string();
        let auth = authenticate(state, &token).await?;
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

/// JSON body that has passed validation
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/api/auth/profile");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))).unwrap(), "abc.def");
        assert!(matches!(
            bearer_token(&parts_with(None)),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            bearer_token(&parts_with(Some("Basic dXNlcg=="))),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(bearer_token(&parts_with(Some("Bearer "))).is_err());
    }
}
