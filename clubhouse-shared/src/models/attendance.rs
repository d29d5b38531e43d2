/// Training attendance
///
/// One row per (training, player), enforced by
/// `unique_training_player_attendance`. Marking attendance again for the same
/// player replaces every field of the existing row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;
use validator::Validate;

use super::percentage;
use super::user::join_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "effort_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EffortLevel {
    Poor,
    Fair,
    Good,
    Excellent,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Attendance {
    pub id: Uuid,
    pub training_id: Uuid,
    pub player_id: Uuid,
    pub attended: bool,
    pub excuse: Option<String>,
    pub late_arrival: bool,
    pub early_departure: bool,
    pub effort_level: Option<EffortLevel>,
    pub performance_rating: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attendance {
    /// "Present", "Present (Late) (Left Early)", "Absent", "Absent - Sick"
    pub fn status(&self) -> String {
        if self.attended {
            let mut status = String::from("Present");
            if self.late_arrival {
                status.push_str(" (Late)");
            }
            if self.early_departure {
                status.push_str(" (Left Early)");
            }
            status
        } else {
            match self.excuse.as_deref().filter(|e| !e.is_empty()) {
                Some(excuse) => format!("Absent - {}", excuse),
                None => "Absent".to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRecord {
    #[sqlx(flatten)]
    pub attendance: Attendance,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceView {
    pub id: Uuid,
    pub training_id: Uuid,
    pub player_id: Uuid,
    pub player_name: String,
    pub attended: bool,
    pub status: String,
    pub excuse: Option<String>,
    pub late_arrival: bool,
    pub early_departure: bool,
    pub effort_level: Option<EffortLevel>,
    pub performance_rating: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn view(&self) -> AttendanceView {
        let a = &self.attendance;
        AttendanceView {
            id: a.id,
            training_id: a.training_id,
            player_id: a.player_id,
            player_name: join_name(&self.first_name, &self.last_name),
            attended: a.attended,
            status: a.status(),
            excuse: a.excuse.clone(),
            late_arrival: a.late_arrival,
            early_departure: a.early_departure,
            effort_level: a.effort_level,
            performance_rating: a.performance_rating,
            notes: a.notes.clone(),
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AttendanceInput {
    pub player_id: Uuid,
    pub attended: bool,
    #[validate(length(max = 200))]
    pub excuse: Option<String>,
    #[serde(default)]
    pub late_arrival: bool,
    #[serde(default)]
    pub early_departure: bool,
    pub effort_level: Option<EffortLevel>,
    #[validate(range(min = 1.0, max = 10.0))]
    pub performance_rating: Option<f64>,
    pub notes: Option<String>,
}

/// Counts for `GET /trainings/{id}/attendance`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub total_invited: i64,
    pub attendance_count: i64,
    pub attendance_rate: f64,
}

impl AttendanceSummary {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let total_invited = records.len() as i64;
        let attendance_count = records.iter().filter(|r| r.attendance.attended).count() as i64;

        Self {
            total_invited,
            attendance_count,
            attendance_rate: percentage(attendance_count, total_invited),
        }
    }
}

const RECORD_SELECT: &str = r#"
    SELECT a.*, u.first_name, u.last_name
    FROM training_attendances a
    JOIN players p ON p.id = a.player_id
    JOIN users u ON u.id = p.user_id
"#;

impl Attendance {
    /// Inserts or replaces the attendance of a player at a training
    pub async fn upsert<'e, E: PgExecutor<'e>>(
        executor: E,
        training_id: Uuid,
        input: AttendanceInput,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attendance>(
            r#"
            INSERT INTO training_attendances (
                training_id, player_id, attended, excuse, late_arrival, early_departure,
                effort_level, performance_rating, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT ON CONSTRAINT unique_training_player_attendance DO UPDATE SET
                attended = EXCLUDED.attended,
                excuse = EXCLUDED.excuse,
                late_arrival = EXCLUDED.late_arrival,
                early_departure = EXCLUDED.early_departure,
                effort_level = EXCLUDED.effort_level,
                performance_rating = EXCLUDED.performance_rating,
                notes = EXCLUDED.notes,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(training_id)
        .bind(input.player_id)
        .bind(input.attended)
        .bind(input.excuse)
        .bind(input.late_arrival)
        .bind(input.early_departure)
        .bind(input.effort_level)
        .bind(input.performance_rating)
        .bind(input.notes)
        .fetch_one(executor)
        .await
    }

    pub async fn find_record<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&format!("{} WHERE a.id = $1", RECORD_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Every attendance row of a training, by player name
    pub async fn for_training<'e, E: PgExecutor<'e>>(
        executor: E,
        training_id: Uuid,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&format!(
            "{} WHERE a.training_id = $1 ORDER BY u.last_name ASC, u.first_name ASC",
            RECORD_SELECT
        ))
        .bind(training_id)
        .fetch_all(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(attended: bool, late: bool, early: bool, excuse: Option<&str>) -> AttendanceRecord {
        let now = Utc::now();
        AttendanceRecord {
            attendance: Attendance {
                id: Uuid::new_v4(),
                training_id: Uuid::new_v4(),
                player_id: Uuid::new_v4(),
                attended,
                excuse: excuse.map(str::to_string),
                late_arrival: late,
                early_departure: early,
                effort_level: None,
                performance_rating: None,
                notes: None,
                created_at: now,
                updated_at: now,
            },
            first_name: "Aymen".to_string(),
            last_name: "Abdennour".to_string(),
        }
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(record(true, false, false, None).attendance.status(), "Present");
        assert_eq!(record(true, true, false, None).attendance.status(), "Present (Late)");
        assert_eq!(
            record(true, true, true, None).attendance.status(),
            "Present (Late) (Left Early)"
        );
        assert_eq!(record(false, false, false, None).attendance.status(), "Absent");
        assert_eq!(
            record(false, false, false, Some("Sick")).attendance.status(),
            "Absent - Sick"
        );
    }

    #[test]
    fn test_summary() {
        let records = vec![
            record(true, false, false, None),
            record(true, true, false, None),
            record(false, false, false, Some("Injured")),
        ];
        let summary = AttendanceSummary::from_records(&records);

        assert_eq!(summary.total_invited, 3);
        assert_eq!(summary.attendance_count, 2);
        assert_eq!(summary.attendance_rate, 66.7);

        let empty = AttendanceSummary::from_records(&[]);
        assert_eq!(empty.attendance_rate, 0.0);
    }

    #[test]
    fn test_view() {
        let json = serde_json::to_value(record(false, false, false, Some("Sick")).view()).unwrap();
        assert_eq!(json["player_name"], "Aymen Abdennour");
        assert_eq!(json["status"], "Absent - Sick");
    }

    #[test]
    fn test_input_requires_attended() {
        let missing = serde_json::from_value::<AttendanceInput>(serde_json::json!({
            "player_id": Uuid::new_v4()
        }));
        assert!(missing.is_err());

        let input: AttendanceInput = serde_json::from_value(serde_json::json!({
            "player_id": Uuid::new_v4(),
            "attended": true,
            "effort_level": "excellent",
            "performance_rating": 0.5
        }))
        .unwrap();
        assert!(!input.late_arrival);
        assert!(input.validate().is_err());
    }
}
