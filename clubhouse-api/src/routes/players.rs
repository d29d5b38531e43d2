/// Player endpoints
///
/// Every endpoint requires authentication. Salaries, medical data and
/// contact details are only serialized for admins, coaches and the player
/// themself.
///
/// # Endpoints
///
/// - `GET /api/players` - Roster (filters: position, status, search)
/// - `GET /api/players/positions` - Position codes and labels
/// - `GET /api/players/:id` - Player with career totals
/// - `POST /api/players` - Create a player profile (admin, coach)
/// - `PUT /api/players/:id` - Update (admin, coach, or own profile)
/// - `DELETE /api/players/:id` - Delete (admin)
/// - `GET /api/players/:id/stats?season=2024` - Season statistics

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::{message, today},
};
use axum::{extract::State, http::StatusCode, Json};
use clubhouse_shared::{
    auth::{
        context::AuthContext,
        policy::{Action, Resource},
    },
    models::{
        player::{
            season_bounds, season_year_of, CareerTotals, NewPlayer, Player, PlayerFilter,
            PlayerPatch, PlayerPosition, PlayerRecord, PlayerStatus, PlayerView,
        },
        player_stats::{PlayerStats, PlayerStatsView},
        user::{User, UserRole},
    },
    pagination::{PageRequest, Pagination},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

const PLAYER_NOT_FOUND: &str = "Player not found";
const INVALID_SEASON: &str = "Invalid season";

#[derive(Debug, Deserialize)]
pub struct PlayersQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub position: Option<PlayerPosition>,
    /// Defaults to active players
    pub status: Option<PlayerStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    pub players: Vec<PlayerView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct PlayerDetail {
    #[serde(flatten)]
    pub player: PlayerView,
    pub total_stats: CareerTotals,
}

#[derive(Debug, Deserialize)]
pub struct SeasonQuery {
    /// Year the season starts in; defaults to the current season
    pub season: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct PlayerStatsResponse {
    pub player_id: Uuid,
    pub player_name: String,
    pub season_year: i32,
    pub season_stats: Vec<PlayerStatsView>,
    pub total_stats: CareerTotals,
    pub current_rating: f64,
}

fn is_own(auth: &AuthContext, record: &PlayerRecord) -> bool {
    record.player.user_id == auth.user_id()
}

fn view_for(auth: &AuthContext, record: &PlayerRecord) -> PlayerView {
    let sensitive = auth.sees_sensitive(Resource::Players, is_own(auth, record));
    record.view(sensitive, today())
}

pub async fn list_players(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<PlayersQuery>,
) -> ApiResult<Json<PlayersResponse>> {
    auth.authorize(Resource::Players, Action::Read, false)?;

    let page = PageRequest::new(query.page, query.per_page, 20);
    let filter = PlayerFilter {
        position: query.position,
        status: Some(query.status.unwrap_or_default()),
        search: query.search,
    };

    let (records, total) = Player::list(&state.db, &filter, &page).await?;

    Ok(Json(PlayersResponse {
        players: records.iter().map(|r| view_for(&auth, r)).collect(),
        pagination: Pagination::new(&page, total),
    }))
}

/// Position codes mapped to their labels
pub async fn list_positions(auth: AuthContext) -> ApiResult<Json<BTreeMap<&'static str, &'static str>>> {
    auth.authorize(Resource::Players, Action::Read, false)?;

    Ok(Json(
        PlayerPosition::ALL
            .iter()
            .map(|position| (position.code(), position.label()))
            .collect(),
    ))
}

pub async fn get_player(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<PlayerDetail>> {
    auth.authorize(Resource::Players, Action::Read, false)?;

    let record = Player::find_record(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(PLAYER_NOT_FOUND))?;
    let total_stats = Player::career_totals(&state.db, id).await?;

    Ok(Json(PlayerDetail {
        player: view_for(&auth, &record),
        total_stats,
    }))
}

/// Create a player profile for an existing user
///
/// The user's role becomes `player`.
///
/// # Errors
///
/// - `404 Not Found`: Unknown user
/// - `409 Conflict`: User already has a profile, or jersey number taken
pub async fn create_player(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(data): ValidatedJson<NewPlayer>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    auth.authorize(Resource::Players, Action::Create, false)?;

    let mut tx = state.db.begin().await?;

    let user = User::find_by_id(&mut *tx, data.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let player = Player::create(&mut *tx, data).await?;
    if user.role != UserRole::Player {
        User::set_role(&mut *tx, user.id, UserRole::Player).await?;
    }

    let record = Player::find_record(&mut *tx, player.id)
        .await?
        .ok_or_else(|| ApiError::internal("Created player not readable"))?;

    tx.commit().await?;

    tracing::info!(
        player_id = %player.id,
        user_id = %user.id,
        created_by = %auth.user_id(),
        "Player created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Player created successfully",
            "player": record.view(true, today()),
        })),
    ))
}

/// Partial update; a player may update their own profile
pub async fn update_player(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<PlayerPatch>,
) -> ApiResult<Json<Value>> {
    let mut tx = state.db.begin().await?;

    let mut player = Player::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(PLAYER_NOT_FOUND))?;

    auth.authorize(
        Resource::Players,
        Action::Update,
        player.user_id == auth.user_id(),
    )?;

    player.apply(patch);
    player.save(&mut *tx).await?;

    let record = Player::find_record(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(PLAYER_NOT_FOUND))?;

    tx.commit().await?;

    tracing::info!(player_id = %id, updated_by = %auth.user_id(), "Player updated");

    Ok(Json(json!({
        "message": "Player updated successfully",
        "player": record.view(true, today()),
    })))
}

/// Delete a player; the linked user reverts to supporter
pub async fn delete_player(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Players, Action::Delete, false)?;

    let mut tx = state.db.begin().await?;

    let player = Player::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(PLAYER_NOT_FOUND))?;

    Player::delete(&mut *tx, id).await?;
    User::set_role(&mut *tx, player.user_id, UserRole::Supporter).await?;

    tx.commit().await?;

    tracing::info!(player_id = %id, deleted_by = %auth.user_id(), "Player deleted");
    Ok(message("Player deleted successfully"))
}

/// Statistics for one season (Aug 1 to Jul 31) plus career totals
pub async fn player_stats(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<SeasonQuery>,
) -> ApiResult<Json<PlayerStatsResponse>> {
    auth.authorize(Resource::Players, Action::Read, false)?;

    let season_year = query.season.unwrap_or_else(|| season_year_of(today()));
    let (from, to) =
        season_bounds(season_year).ok_or_else(|| ApiError::bad_request(INVALID_SEASON))?;

    let record = Player::find_record(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(PLAYER_NOT_FOUND))?;

    let season_stats = PlayerStats::for_player_between(&state.db, id, from, to).await?;
    let total_stats = Player::career_totals(&state.db, id).await?;

    Ok(Json(PlayerStatsResponse {
        player_id: id,
        player_name: record.full_name(),
        season_year,
        season_stats: season_stats.iter().map(|s| s.view()).collect(),
        total_stats,
        current_rating: record.player.rating,
    }))
}
