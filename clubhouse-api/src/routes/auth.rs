/// Authentication and account endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Create an account, returns tokens
/// - `POST /api/auth/login` - Exchange credentials for tokens
/// - `POST /api/auth/refresh` - New access token from a refresh token
/// - `POST /api/auth/logout` - Revoke the current token(s)
/// - `GET|PUT /api/auth/profile` - Own profile
/// - `POST /api/auth/change-password`
/// - `GET /api/auth/users` - User directory (admin)
/// - `POST /api/auth/users/:id/deactivate|activate` (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::message,
};
use axum::{extract::State, http::StatusCode, Json};
use clubhouse_shared::{
    auth::{
        context::AuthContext,
        jwt::{self, Claims, TokenPair, TokenType},
        password,
        policy::{Action, Resource},
    },
    models::{
        player::{Player, PlayerView},
        user::{NewUser, ProfilePatch, User, UserFilter, UserRole, UserView},
    },
    pagination::{PageRequest, Pagination},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const ACCOUNT_DEACTIVATED: &str = "Account is deactivated";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 80, message = "Username must be between 3 and 80 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked against the strength rules in the handler
    pub password: String,

    #[validate(length(min = 1, max = 50))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50))]
    pub last_name: String,

    /// Defaults to supporter
    #[serde(default)]
    pub role: UserRole,

    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email
    #[serde(alias = "email")]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Register and login response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub user: UserView,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserView,
    pub player: Option<PlayerView>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub role: Option<UserRole>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserView>,
    pub pagination: Pagination,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
///
/// {
///   "username": "jdupont",
///   "email": "jdupont@club.example",
///   "password": "Secure123",
///   "first_name": "Jean",
///   "last_name": "Dupont",
///   "role": "coach"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or weak password
/// - `409 Conflict`: Username or email already exists
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    password::validate_password_strength(&req.password)
        .map_err(|msg| ApiError::field("password", msg))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        NewUser {
            username: req.username.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            password_hash,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            role: req.role,
            phone: req.phone,
        },
    )
    .await?;

    let tokens = state.issue_tokens(user.id)?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "User registered successfully",
            user: user.view(true),
            tokens,
        }),
    ))
}

/// Login with username or email
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown user, wrong password or deactivated account
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let mut user = User::find_by_login(&state.db, req.username.trim())
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    if !user.is_active {
        return Err(ApiError::unauthorized(ACCOUNT_DEACTIVATED));
    }

    user.last_login_at = User::touch_last_login(&state.db, user.id).await?;
    let tokens = state.issue_tokens(user.id)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(SessionResponse {
        message: "Login successful",
        user: user.view(true),
        tokens,
    }))
}

/// Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    if state.revocation.is_revoked(claims.jti).await? {
        return Err(ApiError::unauthorized("Token has been revoked"));
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized(ACCOUNT_DEACTIVATED));
    }

    let ttl = state.config.jwt.access_ttl();
    let access = Claims::with_expiration(user.id, TokenType::Access, ttl);

    Ok(Json(RefreshResponse {
        access_token: jwt::create_token(&access, state.jwt_secret())?,
        token_type: "Bearer",
        expires_in: ttl.num_seconds(),
    }))
}

/// Revoke the access token used for this request
///
/// A refresh token in the body is revoked too when it is valid and
/// belongs to the caller; anything else in the body is ignored.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Option<Json<LogoutRequest>>,
) -> ApiResult<Json<Value>> {
    state
        .revocation
        .revoke(auth.jti, auth.token_expires_at)
        .await?;

    let refresh_token = body.and_then(|Json(req)| req.refresh_token);
    if let Some(token) = refresh_token {
        if let Ok(claims) = jwt::validate_refresh_token(&token, state.jwt_secret()) {
            if claims.sub == auth.user_id() {
                state
                    .revocation
                    .revoke(claims.jti, claims.expires_at())
                    .await?;
            }
        }
    }

    tracing::info!(user_id = %auth.user_id(), "User logged out");
    Ok(message("Successfully logged out"))
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ProfileResponse>> {
    let player = Player::find_record_by_user(&state.db, auth.user_id())
        .await?
        .map(|record| record.view(true, crate::routes::today()));

    Ok(Json(ProfileResponse {
        user: auth.user.view(true),
        player,
    }))
}

/// Partial update of names, email and phone
///
/// # Errors
///
/// - `409 Conflict`: Email already used by another account
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(mut patch): ValidatedJson<ProfilePatch>,
) -> ApiResult<Json<Value>> {
    patch.email = patch.email.map(|email| email.trim().to_lowercase());

    let mut user = auth.user;
    user.apply_profile(patch);

    let user = user.save_profile(&state.db).await?;

    Ok(Json(serde_json::json!({
        "message": "Profile updated successfully",
        "user": user.view(true),
    })))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    if !password::verify_password(&req.current_password, &auth.user.password_hash)? {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    password::validate_password_strength(&req.new_password)
        .map_err(|msg| ApiError::field("new_password", msg))?;

    let password_hash = password::hash_password(&req.new_password)?;
    User::set_password_hash(&state.db, auth.user_id(), &password_hash).await?;

    tracing::info!(user_id = %auth.user_id(), "Password changed");
    Ok(message("Password changed successfully"))
}

/// User directory, newest accounts first (admin)
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<UsersQuery>,
) -> ApiResult<Json<UsersResponse>> {
    auth.authorize(Resource::Users, Action::Read, false)?;

    let page = PageRequest::new(query.page, query.per_page, 20);
    let filter = UserFilter {
        role: query.role,
        search: query.search,
    };

    let (users, total) = User::list(&state.db, &filter, &page).await?;

    Ok(Json(UsersResponse {
        users: users.iter().map(|user| user.view(true)).collect(),
        pagination: Pagination::new(&page, total),
    }))
}

async fn set_active(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    is_active: bool,
) -> ApiResult<User> {
    auth.authorize(Resource::Users, Action::Manage, false)?;

    if !is_active && id == auth.user_id() {
        return Err(ApiError::bad_request("Cannot deactivate your own account"));
    }

    let user = User::set_active(&state.db, id, is_active)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(
        user_id = %user.id,
        admin_id = %auth.user_id(),
        is_active,
        "Account activation changed"
    );
    Ok(user)
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let user = set_active(&state, &auth, id, false).await?;

    Ok(Json(serde_json::json!({
        "message": "User deactivated successfully",
        "user": user.view(true),
    })))
}

pub async fn activate_user(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let user = set_active(&state, &auth, id, true).await?;

    Ok(Json(serde_json::json!({
        "message": "User activated successfully",
        "user": user.view(true),
    })))
}
