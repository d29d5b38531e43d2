/// Training session endpoints
///
/// # Endpoints
///
/// - `GET /api/trainings` - Paginated (filters: type, date_from, date_to, upcoming)
/// - `GET /api/trainings/upcoming?limit=5`
/// - `GET /api/trainings/today` - Today's sessions with attendance
/// - `GET /api/trainings/:id` - Session with attendees and absentees
/// - `POST /api/trainings` - Create (admin, coach)
/// - `PUT /api/trainings/:id` - Partial update (admin, coach)
/// - `DELETE /api/trainings/:id` - Delete (admin)
/// - `GET|POST /api/trainings/:id/attendance` - Attendance summary / mark attendance

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::{message, today},
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{NaiveDate, NaiveTime};
use clubhouse_shared::{
    auth::{
        context::AuthContext,
        policy::{Action, Resource},
    },
    models::{
        attendance::{Attendance, AttendanceInput, AttendanceRecord, AttendanceSummary, AttendanceView},
        player::Player,
        training::{
            hh_mm, NewTraining, Training, TrainingFilter, TrainingPatch, TrainingRecord,
            TrainingType, TrainingView,
        },
    },
    pagination::{clamp_limit, PageRequest, Pagination},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

const TRAINING_NOT_FOUND: &str = "Training not found";

#[derive(Debug, Deserialize)]
pub struct TrainingsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[serde(rename = "type")]
    pub training_type: Option<TrainingType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Only sessions from today on
    #[serde(default)]
    pub upcoming: bool,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TrainingsResponse {
    pub trainings: Vec<TrainingView>,
    pub pagination: Pagination,
}

/// Session with its attendance split by presence
#[derive(Debug, Serialize)]
pub struct TrainingDetail {
    #[serde(flatten)]
    pub training: TrainingView,
    pub attendees: Vec<AttendanceView>,
    pub absentees: Vec<AttendanceView>,
}

impl TrainingDetail {
    fn new(record: &TrainingRecord, attendances: &[AttendanceRecord]) -> Self {
        let (attendees, absentees): (Vec<_>, Vec<_>) = attendances
            .iter()
            .partition(|record| record.attendance.attended);

        Self {
            training: record.view(),
            attendees: attendees.into_iter().map(AttendanceRecord::view).collect(),
            absentees: absentees.into_iter().map(AttendanceRecord::view).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrainingInfo {
    pub title: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "hh_mm::serialize")]
    pub start_time: NaiveTime,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub training_id: Uuid,
    pub training_info: TrainingInfo,
    pub attendance_summary: AttendanceSummary,
    pub attendances: Vec<AttendanceView>,
}

pub async fn list_trainings(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<TrainingsQuery>,
) -> ApiResult<Json<TrainingsResponse>> {
    auth.authorize(Resource::Trainings, Action::Read, false)?;

    let page = PageRequest::new(query.page, query.per_page, 20);
    let filter = TrainingFilter {
        training_type: query.training_type,
        date_from: query.date_from,
        date_to: query.date_to,
        upcoming_from: query.upcoming.then(today),
    };

    let (records, total) = Training::list(&state.db, &filter, &page).await?;

    Ok(Json(TrainingsResponse {
        trainings: records.iter().map(TrainingRecord::view).collect(),
        pagination: Pagination::new(&page, total),
    }))
}

pub async fn upcoming_trainings(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Trainings, Action::Read, false)?;

    let records = Training::upcoming(&state.db, today(), clamp_limit(query.limit, 5)).await?;
    let views: Vec<TrainingView> = records.iter().map(TrainingRecord::view).collect();

    Ok(Json(json!({ "upcoming_trainings": views })))
}

pub async fn todays_trainings(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Trainings, Action::Read, false)?;

    let records = Training::on_date(&state.db, today()).await?;

    let mut sessions = Vec::with_capacity(records.len());
    for record in &records {
        let attendances = Attendance::for_training(&state.db, record.training.id).await?;
        sessions.push(TrainingDetail::new(record, &attendances));
    }

    Ok(Json(json!({ "today_trainings": sessions })))
}

pub async fn get_training(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TrainingDetail>> {
    auth.authorize(Resource::Trainings, Action::Read, false)?;

    let record = Training::find_record(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(TRAINING_NOT_FOUND))?;
    let attendances = Attendance::for_training(&state.db, id).await?;

    Ok(Json(TrainingDetail::new(&record, &attendances)))
}

/// Create a session
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or start time not before end time
pub async fn create_training(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(data): ValidatedJson<NewTraining>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    auth.authorize(Resource::Trainings, Action::Create, false)?;
    data.check()?;

    let training = Training::create(&state.db, data).await?;

    tracing::info!(
        training_id = %training.id,
        date = %training.date,
        created_by = %auth.user_id(),
        "Training created"
    );

    let record = TrainingRecord {
        training,
        attendance_count: 0,
        total_invited: 0,
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Training created successfully",
            "training": record.view(),
        })),
    ))
}

pub async fn update_training(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<TrainingPatch>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Trainings, Action::Update, false)?;

    let mut tx = state.db.begin().await?;

    let mut training = Training::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(TRAINING_NOT_FOUND))?;

    training.apply(patch)?;
    training.save(&mut *tx).await?;

    let record = Training::find_record(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(TRAINING_NOT_FOUND))?;

    tx.commit().await?;

    tracing::info!(training_id = %id, updated_by = %auth.user_id(), "Training updated");

    Ok(Json(json!({
        "message": "Training updated successfully",
        "training": record.view(),
    })))
}

pub async fn delete_training(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Trainings, Action::Delete, false)?;

    if !Training::delete(&state.db, id).await? {
        return Err(ApiError::not_found(TRAINING_NOT_FOUND));
    }

    tracing::info!(training_id = %id, deleted_by = %auth.user_id(), "Training deleted");
    Ok(message("Training deleted successfully"))
}

/// Mark one player's attendance; marking again replaces the previous entry
pub async fn mark_attendance(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<AttendanceInput>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Trainings, Action::Update, false)?;

    let mut tx = state.db.begin().await?;

    if !Training::exists(&mut *tx, id).await? {
        return Err(ApiError::not_found(TRAINING_NOT_FOUND));
    }
    if Player::find_by_id(&mut *tx, input.player_id).await?.is_none() {
        return Err(ApiError::not_found("Player not found"));
    }

    let attendance = Attendance::upsert(&mut *tx, id, input).await?;
    let record = Attendance::find_record(&mut *tx, attendance.id)
        .await?
        .ok_or_else(|| ApiError::internal("Saved attendance not readable"))?;

    tx.commit().await?;

    tracing::debug!(
        training_id = %id,
        player_id = %attendance.player_id,
        attended = attendance.attended,
        "Attendance marked"
    );

    Ok(Json(json!({
        "message": "Attendance marked successfully",
        "attendance": record.view(),
    })))
}

pub async fn get_attendance(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<AttendanceResponse>> {
    auth.authorize(Resource::Trainings, Action::Read, false)?;

    let record = Training::find_record(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(TRAINING_NOT_FOUND))?;
    let attendances = Attendance::for_training(&state.db, id).await?;
    let training = record.training;

    Ok(Json(AttendanceResponse {
        training_id: id,
        training_info: TrainingInfo {
            title: training.title,
            date: training.date,
            start_time: training.start_time,
            location: training.location,
        },
        attendance_summary: AttendanceSummary::from_records(&attendances),
        attendances: attendances.iter().map(AttendanceRecord::view).collect(),
    }))
}
