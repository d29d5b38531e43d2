/// Match endpoints
///
/// # Endpoints
///
/// - `GET /api/matches` - Paginated, newest first (filters: competition, status, year)
/// - `GET /api/matches/upcoming?limit=5`
/// - `GET /api/matches/results?limit=5`
/// - `GET /api/matches/:id` - Match with team stats and goalscorers
/// - `POST /api/matches` - Create (admin, coach)
/// - `PUT /api/matches/:id` - Partial update; result follows the score
/// - `DELETE /api/matches/:id` - Delete (admin)
/// - `POST /api/matches/:id/result` - Set the final score
/// - `GET|POST /api/matches/:id/stats` - Per-player statistics

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::message,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use clubhouse_shared::{
    auth::{
        context::AuthContext,
        policy::{Action, Resource},
    },
    models::{
        matches::{
            Competition, Match, MatchFilter, MatchPatch, MatchResult, MatchStatus, MatchView,
            NewMatch, ScoreInput,
        },
        player::Player,
        player_stats::{PlayerStats, PlayerStatsView, StatsInput, TeamStats},
    },
    pagination::{clamp_limit, PageRequest, Pagination},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

const MATCH_NOT_FOUND: &str = "Match not found";

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub competition: Option<Competition>,
    pub status: Option<MatchStatus>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct MatchDetail {
    #[serde(flatten)]
    pub fixture: MatchView,
    pub team_stats: TeamStats,
    pub goalscorers: Vec<PlayerStatsView>,
}

#[derive(Debug, Serialize)]
pub struct MatchInfo {
    pub opponent: String,
    pub date: DateTime<Utc>,
    pub score: String,
    pub result: MatchResult,
}

#[derive(Debug, Serialize)]
pub struct MatchStatsResponse {
    pub match_id: Uuid,
    pub match_info: MatchInfo,
    pub player_stats: Vec<PlayerStatsView>,
    pub team_stats: TeamStats,
}

pub async fn list_matches(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<MatchesQuery>,
) -> ApiResult<Json<MatchesResponse>> {
    auth.authorize(Resource::Matches, Action::Read, false)?;

    let page = PageRequest::new(query.page, query.per_page, 10);
    let filter = MatchFilter {
        competition: query.competition,
        status: query.status,
        year: query.year,
    };

    let (matches, total) = Match::list(&state.db, &filter, &page).await?;
    let now = Utc::now();

    Ok(Json(MatchesResponse {
        matches: matches.iter().map(|m| m.view_at(now)).collect(),
        pagination: Pagination::new(&page, total),
    }))
}

pub async fn upcoming_matches(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Matches, Action::Read, false)?;

    let matches = Match::upcoming(&state.db, clamp_limit(query.limit, 5)).await?;
    let views: Vec<MatchView> = matches.iter().map(Match::view).collect();

    Ok(Json(json!({ "upcoming_matches": views })))
}

pub async fn recent_results(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Matches, Action::Read, false)?;

    let matches = Match::recent_results(&state.db, clamp_limit(query.limit, 5)).await?;
    let views: Vec<MatchView> = matches.iter().map(Match::view).collect();

    Ok(Json(json!({ "recent_results": views })))
}

pub async fn get_match(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MatchDetail>> {
    auth.authorize(Resource::Matches, Action::Read, false)?;

    let fixture = Match::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(MATCH_NOT_FOUND))?;
    let stats = PlayerStats::for_match(&state.db, id).await?;

    Ok(Json(MatchDetail {
        fixture: fixture.view(),
        team_stats: TeamStats::from_stats(stats.iter().map(|r| &r.stats)),
        goalscorers: stats
            .iter()
            .filter(|r| r.stats.goals > 0)
            .map(|r| r.view())
            .collect(),
    }))
}

pub async fn create_match(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(data): ValidatedJson<NewMatch>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    auth.authorize(Resource::Matches, Action::Create, false)?;

    let fixture = Match::create(&state.db, data).await?;

    tracing::info!(
        match_id = %fixture.id,
        opponent = %fixture.opponent,
        created_by = %auth.user_id(),
        "Match created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Match created successfully",
            "match": fixture.view(),
        })),
    ))
}

/// Partial update; the result is recomputed from the merged score
pub async fn update_match(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<MatchPatch>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Matches, Action::Update, false)?;

    let mut tx = state.db.begin().await?;

    let mut fixture = Match::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(MATCH_NOT_FOUND))?;

    fixture.apply(patch);
    let fixture = fixture.save(&mut *tx).await?;

    tx.commit().await?;

    tracing::info!(match_id = %id, result = ?fixture.result, "Match updated");

    Ok(Json(json!({
        "message": "Match updated successfully",
        "match": fixture.view(),
    })))
}

pub async fn delete_match(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Matches, Action::Delete, false)?;

    if !Match::delete(&state.db, id).await? {
        return Err(ApiError::not_found(MATCH_NOT_FOUND));
    }

    tracing::info!(match_id = %id, deleted_by = %auth.user_id(), "Match deleted");
    Ok(message("Match deleted successfully"))
}

/// Record the final score
pub async fn set_result(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(score): ValidatedJson<ScoreInput>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Matches, Action::Update, false)?;

    let mut tx = state.db.begin().await?;

    let mut fixture = Match::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(MATCH_NOT_FOUND))?;

    fixture.set_score(score.goals_for, score.goals_against);
    let fixture = fixture.save(&mut *tx).await?;

    tx.commit().await?;

    tracing::info!(match_id = %id, score = %fixture.score(), "Match result recorded");

    Ok(Json(json!({
        "message": "Match result updated successfully",
        "match": fixture.view(),
    })))
}

/// Insert or replace one player's statistics and refresh their rating
pub async fn record_stats(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<StatsInput>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Matches, Action::Update, false)?;

    let mut tx = state.db.begin().await?;

    if Match::find_by_id(&mut *tx, id).await?.is_none() {
        return Err(ApiError::not_found(MATCH_NOT_FOUND));
    }
    let player_id = input.player_id;
    if Player::find_by_id(&mut *tx, player_id).await?.is_none() {
        return Err(ApiError::not_found("Player not found"));
    }

    let stats = PlayerStats::upsert(&mut *tx, id, input).await?;
    let rating = Player::refresh_rating(&mut *tx, player_id).await?;

    let record = PlayerStats::find_record(&mut *tx, stats.id)
        .await?
        .ok_or_else(|| ApiError::internal("Saved stats not readable"))?;

    tx.commit().await?;

    tracing::info!(
        match_id = %id,
        player_id = %player_id,
        rating = ?rating,
        "Player stats recorded"
    );

    Ok(Json(json!({
        "message": "Player stats updated successfully",
        "stats": record.view(),
    })))
}

pub async fn match_stats(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MatchStatsResponse>> {
    auth.authorize(Resource::Matches, Action::Read, false)?;

    let fixture = Match::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(MATCH_NOT_FOUND))?;
    let stats = PlayerStats::for_match(&state.db, id).await?;

    Ok(Json(MatchStatsResponse {
        match_id: id,
        match_info: MatchInfo {
            opponent: fixture.opponent.clone(),
            date: fixture.date,
            score: fixture.score(),
            result: fixture.result,
        },
        team_stats: TeamStats::from_stats(stats.iter().map(|r| &r.stats)),
        player_stats: stats.iter().map(|r| r.view()).collect(),
    }))
}
