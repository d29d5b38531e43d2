/// Training sessions
///
/// A session takes place on one date between a start and an end time
/// (`trainings_time_window` keeps `start_time < end_time`). Attendance is
/// tracked per player in `models::attendance`; attendance counts are loaded
/// together with the session as a [`TrainingRecord`].
///
/// Times travel as `HH:MM` strings in JSON; `HH:MM:SS` is accepted on input.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::percentage;
use crate::error::DomainError;
use crate::pagination::PageRequest;

pub const INVALID_WINDOW: &str = "Start time must be before end time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "training_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TrainingType {
    Technical,
    Physical,
    Tactical,
    Recovery,
    Friendly,
}

impl Default for TrainingType {
    fn default() -> Self {
        TrainingType::Technical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "training_intensity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Default for Intensity {
    fn default() -> Self {
        Intensity::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "field_condition", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldCondition {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Serde helpers for `HH:MM` times
pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de, Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    de::Error::custom(format!("invalid time '{}', expected HH:MM", raw))
                }),
                None => Ok(None),
            }
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Training {
    pub id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub training_type: TrainingType,
    pub intensity: Intensity,
    pub objectives: Option<String>,
    pub description: Option<String>,
    pub exercises: Option<String>,
    pub equipment_needed: Option<String>,
    pub weather: Option<String>,
    pub temperature: Option<f64>,
    pub field_condition: Option<FieldCondition>,
    pub completed: bool,
    pub notes: Option<String>,
    pub coach_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Training with its attendance counts
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrainingRecord {
    #[sqlx(flatten)]
    pub training: Training,
    pub attendance_count: i64,
    pub total_invited: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingView {
    pub id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
    pub location: String,
    #[serde(rename = "type")]
    pub training_type: TrainingType,
    pub intensity: Intensity,
    pub objectives: Option<String>,
    pub description: Option<String>,
    pub exercises: Option<String>,
    pub equipment_needed: Option<String>,
    pub weather: Option<String>,
    pub temperature: Option<f64>,
    pub field_condition: Option<FieldCondition>,
    pub completed: bool,
    pub notes: Option<String>,
    pub coach_feedback: Option<String>,
    pub is_upcoming: bool,
    pub is_today: bool,
    pub attendance_count: i64,
    pub total_invited: i64,
    pub attendance_rate: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTraining {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    #[serde(rename = "type", default)]
    pub training_type: TrainingType,
    #[serde(default)]
    pub intensity: Intensity,
    pub objectives: Option<String>,
    pub description: Option<String>,
    pub exercises: Option<String>,
    pub equipment_needed: Option<String>,
}

/// Partial update of a training; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TrainingPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "hh_mm::option::deserialize")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "hh_mm::option::deserialize")]
    pub end_time: Option<NaiveTime>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub training_type: Option<TrainingType>,
    pub intensity: Option<Intensity>,
    pub objectives: Option<String>,
    pub description: Option<String>,
    pub exercises: Option<String>,
    pub equipment_needed: Option<String>,
    #[validate(length(max = 50))]
    pub weather: Option<String>,
    pub temperature: Option<f64>,
    pub field_condition: Option<FieldCondition>,
    pub completed: Option<bool>,
    pub notes: Option<String>,
    pub coach_feedback: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingFilter {
    pub training_type: Option<TrainingType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Sessions on or after this day
    pub upcoming_from: Option<NaiveDate>,
}

/// Rejects a session whose start is not strictly before its end
pub fn check_window(start: NaiveTime, end: NaiveTime) -> Result<(), DomainError> {
    if start < end {
        Ok(())
    } else {
        Err(DomainError::state(INVALID_WINDOW))
    }
}

impl NewTraining {
    pub fn check(&self) -> Result<(), DomainError> {
        check_window(self.start_time, self.end_time)
    }
}

impl Training {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes().max(0)
    }

    pub fn is_upcoming_at(&self, now: DateTime<Utc>) -> bool {
        self.date.and_time(self.start_time) > now.naive_utc()
    }

    /// Applies a patch, then checks the merged time window
    pub fn apply(&mut self, patch: TrainingPatch) -> Result<(), DomainError> {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(start) = patch.start_time {
            self.start_time = start;
        }
        if let Some(end) = patch.end_time {
            self.end_time = end;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(kind) = patch.training_type {
            self.training_type = kind;
        }
        if let Some(intensity) = patch.intensity {
            self.intensity = intensity;
        }
        if patch.objectives.is_some() {
            self.objectives = patch.objectives;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if patch.exercises.is_some() {
            self.exercises = patch.exercises;
        }
        if patch.equipment_needed.is_some() {
            self.equipment_needed = patch.equipment_needed;
        }
        if patch.weather.is_some() {
            self.weather = patch.weather;
        }
        if patch.temperature.is_some() {
            self.temperature = patch.temperature;
        }
        if patch.field_condition.is_some() {
            self.field_condition = patch.field_condition;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if patch.notes.is_some() {
            self.notes = patch.notes;
        }
        if patch.coach_feedback.is_some() {
            self.coach_feedback = patch.coach_feedback;
        }

        check_window(self.start_time, self.end_time)
    }
}

impl TrainingRecord {
    pub fn attendance_rate(&self) -> f64 {
        percentage(self.attendance_count, self.total_invited)
    }

    pub fn view_at(&self, now: DateTime<Utc>) -> TrainingView {
        let t = &self.training;
        TrainingView {
            id: t.id,
            title: t.title.clone(),
            date: t.date,
            start_time: t.start_time,
            end_time: t.end_time,
            duration_minutes: t.duration_minutes(),
            location: t.location.clone(),
            training_type: t.training_type,
            intensity: t.intensity,
            objectives: t.objectives.clone(),
            description: t.description.clone(),
            exercises: t.exercises.clone(),
            equipment_needed: t.equipment_needed.clone(),
            weather: t.weather.clone(),
            temperature: t.temperature,
            field_condition: t.field_condition,
            completed: t.completed,
            notes: t.notes.clone(),
            coach_feedback: t.coach_feedback.clone(),
            is_upcoming: t.is_upcoming_at(now),
            is_today: t.date == now.date_naive(),
            attendance_count: self.attendance_count,
            total_invited: self.total_invited,
            attendance_rate: self.attendance_rate(),
            created_at: t.created_at,
        }
    }

    pub fn view(&self) -> TrainingView {
        self.view_at(Utc::now())
    }
}

const RECORD_SELECT: &str = r#"
    SELECT t.*,
        (SELECT COUNT(*) FROM training_attendances a WHERE a.training_id = t.id AND a.attended) AS attendance_count,
        (SELECT COUNT(*) FROM training_attendances a WHERE a.training_id = t.id) AS total_invited
    FROM trainings t
"#;

impl Training {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: NewTraining,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Training>(
            r#"
            INSERT INTO trainings (
                title, date, start_time, end_time, location, training_type, intensity,
                objectives, description, exercises, equipment_needed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(data.title)
        .bind(data.date)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.location)
        .bind(data.training_type)
        .bind(data.intensity)
        .bind(data.objectives)
        .bind(data.description)
        .bind(data.exercises)
        .bind(data.equipment_needed)
        .fetch_one(executor)
        .await
    }

    pub async fn exists<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM trainings WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Training>("SELECT * FROM trainings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_record<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<TrainingRecord>, sqlx::Error> {
        sqlx::query_as::<_, TrainingRecord>(&format!("{} WHERE t.id = $1", RECORD_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn save<'e, E: PgExecutor<'e>>(&self, executor: E) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE trainings
            SET title = $2, date = $3, start_time = $4, end_time = $5, location = $6,
                training_type = $7, intensity = $8, objectives = $9, description = $10,
                exercises = $11, equipment_needed = $12, weather = $13, temperature = $14,
                field_condition = $15, completed = $16, notes = $17, coach_feedback = $18,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(&self.title)
        .bind(self.date)
        .bind(self.start_time)
        .bind(self.end_time)
        .bind(&self.location)
        .bind(self.training_type)
        .bind(self.intensity)
        .bind(&self.objectives)
        .bind(&self.description)
        .bind(&self.exercises)
        .bind(&self.equipment_needed)
        .bind(&self.weather)
        .bind(self.temperature)
        .bind(self.field_condition)
        .bind(self.completed)
        .bind(&self.notes)
        .bind(&self.coach_feedback)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Deletes a session; its attendance rows cascade
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM trainings WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sessions on or after `from`, soonest first
    pub async fn upcoming<'e, E: PgExecutor<'e>>(
        executor: E,
        from: NaiveDate,
        limit: i64,
    ) -> Result<Vec<TrainingRecord>, sqlx::Error> {
        sqlx::query_as::<_, TrainingRecord>(&format!(
            "{} WHERE t.date >= $1 ORDER BY t.date ASC, t.start_time ASC LIMIT $2",
            RECORD_SELECT
        ))
        .bind(from)
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    /// Sessions held on one day, by start time
    pub async fn on_date<'e, E: PgExecutor<'e>>(
        executor: E,
        day: NaiveDate,
    ) -> Result<Vec<TrainingRecord>, sqlx::Error> {
        sqlx::query_as::<_, TrainingRecord>(&format!(
            "{} WHERE t.date = $1 ORDER BY t.start_time ASC",
            RECORD_SELECT
        ))
        .bind(day)
        .fetch_all(executor)
        .await
    }

    /// Lists sessions newest first
    pub async fn list(
        pool: &PgPool,
        filter: &TrainingFilter,
        page: &PageRequest,
    ) -> Result<(Vec<TrainingRecord>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM trainings t WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(RECORD_SELECT);
        select.push(" WHERE TRUE");
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY t.date DESC, t.start_time DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let trainings = select
            .build_query_as::<TrainingRecord>()
            .fetch_all(pool)
            .await?;
        Ok((trainings, total))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TrainingFilter) {
    if let Some(kind) = filter.training_type {
        builder.push(" AND t.training_type = ").push_bind(kind);
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND t.date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND t.date <= ").push_bind(to);
    }
    if let Some(from) = filter.upcoming_from {
        builder.push(" AND t.date >= ").push_bind(from);
    }
}
