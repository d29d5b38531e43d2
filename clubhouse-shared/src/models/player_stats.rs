/// Per-match player statistics
///
/// One row per (player, match), enforced by `unique_player_match_stats`.
/// Recording stats for a player who already has a row for the match
/// overwrites it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::percentage;
use super::user::join_name;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerStats {
    pub id: Uuid,
    pub player_id: Uuid,
    pub match_id: Uuid,
    pub minutes_played: i32,
    pub started: bool,
    pub substituted_in: Option<i32>,
    pub substituted_out: Option<i32>,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub shots: i32,
    pub shots_on_target: i32,
    pub passes_completed: i32,
    pub passes_attempted: i32,
    pub tackles: i32,
    pub interceptions: i32,
    pub fouls_committed: i32,
    pub fouls_suffered: i32,
    pub performance_rating: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerStats {
    pub fn shot_accuracy(&self) -> f64 {
        percentage(self.shots_on_target.into(), self.shots.into())
    }

    pub fn pass_accuracy(&self) -> f64 {
        percentage(self.passes_completed.into(), self.passes_attempted.into())
    }
}

/// Stats row with the player's name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerStatsRecord {
    #[sqlx(flatten)]
    pub stats: PlayerStats,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatsView {
    pub id: Uuid,
    pub player_id: Uuid,
    pub player_name: String,
    pub match_id: Uuid,
    pub minutes_played: i32,
    pub started: bool,
    pub substituted_in: Option<i32>,
    pub substituted_out: Option<i32>,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub shots: i32,
    pub shots_on_target: i32,
    pub shot_accuracy: f64,
    pub passes_completed: i32,
    pub passes_attempted: i32,
    pub pass_accuracy: f64,
    pub tackles: i32,
    pub interceptions: i32,
    pub fouls_committed: i32,
    pub fouls_suffered: i32,
    pub performance_rating: Option<f64>,
    pub notes: Option<String>,
}

impl PlayerStatsRecord {
    pub fn view(&self) -> PlayerStatsView {
        let s = &self.stats;
        PlayerStatsView {
            id: s.id,
            player_id: s.player_id,
            player_name: join_name(&self.first_name, &self.last_name),
            match_id: s.match_id,
            minutes_played: s.minutes_played,
            started: s.started,
            substituted_in: s.substituted_in,
            substituted_out: s.substituted_out,
            goals: s.goals,
            assists: s.assists,
            yellow_cards: s.yellow_cards,
            red_cards: s.red_cards,
            shots: s.shots,
            shots_on_target: s.shots_on_target,
            shot_accuracy: s.shot_accuracy(),
            passes_completed: s.passes_completed,
            passes_attempted: s.passes_attempted,
            pass_accuracy: s.pass_accuracy(),
            tackles: s.tackles,
            interceptions: s.interceptions,
            fouls_committed: s.fouls_committed,
            fouls_suffered: s.fouls_suffered,
            performance_rating: s.performance_rating,
            notes: s.notes.clone(),
        }
    }
}

/// Aggregates over every stats row of a match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeamStats {
    pub total_goals: i64,
    pub total_assists: i64,
    pub total_yellow_cards: i64,
    pub total_red_cards: i64,
    pub players_used: i64,
}

impl TeamStats {
    pub fn from_stats<'a>(stats: impl IntoIterator<Item = &'a PlayerStats>) -> Self {
        stats.into_iter().fold(TeamStats::default(), |mut acc, s| {
            acc.total_goals += i64::from(s.goals);
            acc.total_assists += i64::from(s.assists);
            acc.total_yellow_cards += i64::from(s.yellow_cards);
            acc.total_red_cards += i64::from(s.red_cards);
            acc.players_used += 1;
            acc
        })
    }
}

/// Stats submitted for one player in one match
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_stat_totals"))]
pub struct StatsInput {
    pub player_id: Uuid,
    #[serde(default)]
    #[validate(range(min = 0, max = 130))]
    pub minutes_played: i32,
    #[serde(default)]
    pub started: bool,
    #[validate(range(min = 0, max = 130))]
    pub substituted_in: Option<i32>,
    #[validate(range(min = 0, max = 130))]
    pub substituted_out: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub goals: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub assists: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 2))]
    pub yellow_cards: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 1))]
    pub red_cards: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub shots: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub shots_on_target: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub passes_completed: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub passes_attempted: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub tackles: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub interceptions: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub fouls_committed: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub fouls_suffered: i32,
    #[validate(range(min = 1.0, max = 10.0))]
    pub performance_rating: Option<f64>,
    pub notes: Option<String>,
}

fn validate_stat_totals(input: &StatsInput) -> Result<(), ValidationError> {
    if input.shots_on_target > input.shots {
        let mut err = ValidationError::new("shots_on_target");
        err.message = Some("Shots on target cannot exceed total shots".into());
        return Err(err);
    }
    if input.passes_completed > input.passes_attempted {
        let mut err = ValidationError::new("passes_completed");
        err.message = Some("Completed passes cannot exceed attempted passes".into());
        return Err(err);
    }
    Ok(())
}

const RECORD_SELECT: &str = r#"
    SELECT s.*, u.first_name, u.last_name
    FROM player_stats s
    JOIN players p ON p.id = s.player_id
    JOIN users u ON u.id = p.user_id
"#;

impl PlayerStats {
    /// Inserts or overwrites the player's stats for a match
    pub async fn upsert<'e, E: PgExecutor<'e>>(
        executor: E,
        match_id: Uuid,
        input: StatsInput,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PlayerStats>(
            r#"
            INSERT INTO player_stats (
                player_id, match_id, minutes_played, started, substituted_in, substituted_out,
                goals, assists, yellow_cards, red_cards, shots, shots_on_target,
                passes_completed, passes_attempted, tackles, interceptions,
                fouls_committed, fouls_suffered, performance_rating, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT ON CONSTRAINT unique_player_match_stats DO UPDATE SET
                minutes_played = EXCLUDED.minutes_played,
                started = EXCLUDED.started,
                substituted_in = EXCLUDED.substituted_in,
                substituted_out = EXCLUDED.substituted_out,
                goals = EXCLUDED.goals,
                assists = EXCLUDED.assists,
                yellow_cards = EXCLUDED.yellow_cards,
                red_cards = EXCLUDED.red_cards,
                shots = EXCLUDED.shots,
                shots_on_target = EXCLUDED.shots_on_target,
                passes_completed = EXCLUDED.passes_completed,
                passes_attempted = EXCLUDED.passes_attempted,
                tackles = EXCLUDED.tackles,
                interceptions = EXCLUDED.interceptions,
                fouls_committed = EXCLUDED.fouls_committed,
                fouls_suffered = EXCLUDED.fouls_suffered,
                performance_rating = EXCLUDED.performance_rating,
                notes = EXCLUDED.notes,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(input.player_id)
        .bind(match_id)
        .bind(input.minutes_played)
        .bind(input.started)
        .bind(input.substituted_in)
        .bind(input.substituted_out)
        .bind(input.goals)
        .bind(input.assists)
        .bind(input.yellow_cards)
        .bind(input.red_cards)
        .bind(input.shots)
        .bind(input.shots_on_target)
        .bind(input.passes_completed)
        .bind(input.passes_attempted)
        .bind(input.tackles)
        .bind(input.interceptions)
        .bind(input.fouls_committed)
        .bind(input.fouls_suffered)
        .bind(input.performance_rating)
        .bind(input.notes)
        .fetch_one(executor)
        .await
    }

    pub async fn find_record<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<PlayerStatsRecord>, sqlx::Error> {
        sqlx::query_as::<_, PlayerStatsRecord>(&format!("{} WHERE s.id = $1", RECORD_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Every stats row of a match, best scorers first
    pub async fn for_match<'e, E: PgExecutor<'e>>(
        executor: E,
        match_id: Uuid,
    ) -> Result<Vec<PlayerStatsRecord>, sqlx::Error> {
        sqlx::query_as::<_, PlayerStatsRecord>(&format!(
            "{} WHERE s.match_id = $1 ORDER BY s.goals DESC, s.assists DESC, u.last_name ASC",
            RECORD_SELECT
        ))
        .bind(match_id)
        .fetch_all(executor)
        .await
    }

    /// A player's stats for matches played between two dates (inclusive)
    pub async fn for_player_between<'e, E: PgExecutor<'e>>(
        executor: E,
        player_id: Uuid,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<Vec<PlayerStatsRecord>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(RECORD_SELECT);
        query
            .push(" JOIN matches m ON m.id = s.match_id WHERE s.player_id = ")
            .push_bind(player_id)
            .push(" AND m.date::date >= ")
            .push_bind(from)
            .push(" AND m.date::date <= ")
            .push_bind(to)
            .push(" ORDER BY m.date ASC");

        query
            .build_query_as::<PlayerStatsRecord>()
            .fetch_all(executor)
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_stats(goals: i32, assists: i32) -> PlayerStats {
        let now = Utc::now();
        PlayerStats {
            id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            match_id: Uuid::new_v4(),
            minutes_played: 90,
            started: true,
            substituted_in: None,
            substituted_out: None,
            goals,
            assists,
            yellow_cards: 1,
            red_cards: 0,
            shots: 4,
            shots_on_target: 3,
            passes_completed: 41,
            passes_attempted: 50,
            tackles: 2,
            interceptions: 1,
            fouls_committed: 1,
            fouls_suffered: 3,
            performance_rating: Some(7.5),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_accuracies() {
        let stats = sample_stats(1, 0);
        assert_eq!(stats.shot_accuracy(), 75.0);
        assert_eq!(stats.pass_accuracy(), 82.0);
    }

    #[test]
    fn test_team_stats() {
        let rows = [sample_stats(2, 0), sample_stats(0, 1), sample_stats(1, 1)];
        let team = TeamStats::from_stats(rows.iter());

        assert_eq!(team.total_goals, 3);
        assert_eq!(team.total_assists, 2);
        assert_eq!(team.total_yellow_cards, 3);
        assert_eq!(team.players_used, 3);
        assert_eq!(TeamStats::from_stats(std::iter::empty()), TeamStats::default());
    }

    #[test]
    fn test_input_defaults_and_limits() {
        let input: StatsInput = serde_json::from_value(serde_json::json!({
            "player_id": Uuid::new_v4(),
            "goals": 2
        }))
        .unwrap();
        assert_eq!(input.minutes_played, 0);
        assert!(input.validate().is_ok());

        let input: StatsInput = serde_json::from_value(serde_json::json!({
            "player_id": Uuid::new_v4(),
            "yellow_cards": 3,
            "performance_rating": 11.0
        }))
        .unwrap();
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("yellow_cards"));
        assert!(fields.contains_key("performance_rating"));
    }

    #[test]
    fn test_input_cross_field_checks() {
        let input: StatsInput = serde_json::from_value(serde_json::json!({
            "player_id": Uuid::new_v4(),
            "shots": 1,
            "shots_on_target": 2
        }))
        .unwrap();
        assert!(input.validate().is_err());
    }
}
