/// Club fixtures and results
///
/// # Schema
///
/// ```sql
/// CREATE TABLE matches (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     opponent VARCHAR(100) NOT NULL,
///     date TIMESTAMPTZ NOT NULL,
///     location VARCHAR(200) NOT NULL,
///     is_home BOOLEAN NOT NULL DEFAULT TRUE,
///     competition competition_type NOT NULL DEFAULT 'league',
///     goals_for INTEGER CHECK (goals_for >= 0),
///     goals_against INTEGER CHECK (goals_against >= 0),
///     result match_result NOT NULL DEFAULT 'pending',
///     ...
/// );
/// ```
///
/// The result is never written directly: it is derived from the score each
/// time the match is saved with both goal counts known.
///
/// # Example
///
/// ```
/// use clubhouse_shared::models::matches::MatchResult;
///
/// assert_eq!(MatchResult::from_score(Some(2), Some(1)), MatchResult::Win);
/// assert_eq!(MatchResult::from_score(Some(0), None), MatchResult::Pending);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::pagination::PageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "competition_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Competition {
    League,
    Cup,
    Friendly,
    Playoff,
}

impl Default for Competition {
    fn default() -> Self {
        Competition::League
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_result", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Draw,
    Loss,
    Pending,
}

impl MatchResult {
    /// Result for a score; pending until both sides are known
    pub fn from_score(goals_for: Option<i32>, goals_against: Option<i32>) -> Self {
        match (goals_for, goals_against) {
            (Some(ours), Some(theirs)) => match ours.cmp(&theirs) {
                std::cmp::Ordering::Greater => MatchResult::Win,
                std::cmp::Ordering::Less => MatchResult::Loss,
                std::cmp::Ordering::Equal => MatchResult::Draw,
            },
            _ => MatchResult::Pending,
        }
    }
}

/// `status` list filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Kick-off in the future and no result yet
    Upcoming,
    /// Result recorded
    Finished,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Match {
    pub id: Uuid,
    pub opponent: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub is_home: bool,
    pub competition: Competition,
    pub goals_for: Option<i32>,
    pub goals_against: Option<i32>,
    pub result: MatchResult,
    pub attendance: Option<i32>,
    pub referee: Option<String>,
    pub weather: Option<String>,
    pub temperature: Option<f64>,
    pub match_report: Option<String>,
    pub highlights: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    pub id: Uuid,
    pub opponent: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub is_home: bool,
    pub home_away: &'static str,
    pub competition: Competition,
    pub goals_for: Option<i32>,
    pub goals_against: Option<i32>,
    pub score: String,
    pub result: MatchResult,
    pub is_finished: bool,
    pub is_upcoming: bool,
    pub attendance: Option<i32>,
    pub referee: Option<String>,
    pub weather: Option<String>,
    pub temperature: Option<f64>,
    pub match_report: Option<String>,
    pub highlights: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMatch {
    #[validate(length(min = 1, max = 100))]
    pub opponent: String,
    pub date: DateTime<Utc>,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    #[serde(default = "default_true")]
    pub is_home: bool,
    #[serde(default)]
    pub competition: Competition,
    #[validate(length(max = 100))]
    pub referee: Option<String>,
    #[validate(length(max = 50))]
    pub weather: Option<String>,
    pub temperature: Option<f64>,
}

fn default_true() -> bool {
    true
}

/// Partial update of a match; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MatchPatch {
    #[validate(length(min = 1, max = 100))]
    pub opponent: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    pub is_home: Option<bool>,
    pub competition: Option<Competition>,
    #[validate(range(min = 0, message = "Goals cannot be negative"))]
    pub goals_for: Option<i32>,
    #[validate(range(min = 0, message = "Goals cannot be negative"))]
    pub goals_against: Option<i32>,
    #[validate(range(min = 0))]
    pub attendance: Option<i32>,
    #[validate(length(max = 100))]
    pub referee: Option<String>,
    #[validate(length(max = 50))]
    pub weather: Option<String>,
    pub temperature: Option<f64>,
    pub match_report: Option<String>,
    pub highlights: Option<String>,
}

/// Final score posted to `/matches/{id}/result`
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct ScoreInput {
    #[validate(range(min = 0, message = "Goals cannot be negative"))]
    pub goals_for: i32,
    #[validate(range(min = 0, message = "Goals cannot be negative"))]
    pub goals_against: i32,
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub competition: Option<Competition>,
    pub status: Option<MatchStatus>,
    pub year: Option<i32>,
}

impl Match {
    /// "2-1" once both goal counts are known, otherwise "vs"
    pub fn score(&self) -> String {
        match (self.goals_for, self.goals_against) {
            (Some(ours), Some(theirs)) => format!("{}-{}", ours, theirs),
            _ => "vs".to_string(),
        }
    }

    pub fn home_away(&self) -> &'static str {
        if self.is_home {
            "Home"
        } else {
            "Away"
        }
    }

    pub fn is_finished(&self) -> bool {
        self.result != MatchResult::Pending
    }

    pub fn is_upcoming_at(&self, now: DateTime<Utc>) -> bool {
        self.date > now && !self.is_finished()
    }

    /// Records the final score and derives the result
    pub fn set_score(&mut self, goals_for: i32, goals_against: i32) {
        self.goals_for = Some(goals_for);
        self.goals_against = Some(goals_against);
        self.result = MatchResult::from_score(self.goals_for, self.goals_against);
    }

    pub fn apply(&mut self, patch: MatchPatch) {
        if let Some(opponent) = patch.opponent {
            self.opponent = opponent;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(is_home) = patch.is_home {
            self.is_home = is_home;
        }
        if let Some(competition) = patch.competition {
            self.competition = competition;
        }
        if patch.goals_for.is_some() {
            self.goals_for = patch.goals_for;
        }
        if patch.goals_against.is_some() {
            self.goals_against = patch.goals_against;
        }
        if patch.attendance.is_some() {
            self.attendance = patch.attendance;
        }
        if patch.referee.is_some() {
            self.referee = patch.referee;
        }
        if patch.weather.is_some() {
            self.weather = patch.weather;
        }
        if patch.temperature.is_some() {
            self.temperature = patch.temperature;
        }
        if patch.match_report.is_some() {
            self.match_report = patch.match_report;
        }
        if patch.highlights.is_some() {
            self.highlights = patch.highlights;
        }

        self.result = MatchResult::from_score(self.goals_for, self.goals_against);
    }

    pub fn view_at(&self, now: DateTime<Utc>) -> MatchView {
        MatchView {
            id: self.id,
            opponent: self.opponent.clone(),
            date: self.date,
            location: self.location.clone(),
            is_home: self.is_home,
            home_away: self.home_away(),
            competition: self.competition,
            goals_for: self.goals_for,
            goals_against: self.goals_against,
            score: self.score(),
            result: self.result,
            is_finished: self.is_finished(),
            is_upcoming: self.is_upcoming_at(now),
            attendance: self.attendance,
            referee: self.referee.clone(),
            weather: self.weather.clone(),
            temperature: self.temperature,
            match_report: self.match_report.clone(),
            highlights: self.highlights.clone(),
            created_at: self.created_at,
        }
    }

    pub fn view(&self) -> MatchView {
        self.view_at(Utc::now())
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: NewMatch,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Match>(
            r#"
            INSERT INTO matches (opponent, date, location, is_home, competition, referee, weather, temperature)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(data.opponent)
        .bind(data.date)
        .bind(data.location)
        .bind(data.is_home)
        .bind(data.competition)
        .bind(data.referee)
        .bind(data.weather)
        .bind(data.temperature)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn save<'e, E: PgExecutor<'e>>(&self, executor: E) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Match>(
            r#"
            UPDATE matches
            SET opponent = $2, date = $3, location = $4, is_home = $5, competition = $6,
                goals_for = $7, goals_against = $8, result = $9, attendance = $10,
                referee = $11, weather = $12, temperature = $13, match_report = $14,
                highlights = $15, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.opponent)
        .bind(self.date)
        .bind(&self.location)
        .bind(self.is_home)
        .bind(self.competition)
        .bind(self.goals_for)
        .bind(self.goals_against)
        .bind(self.result)
        .bind(self.attendance)
        .bind(&self.referee)
        .bind(&self.weather)
        .bind(self.temperature)
        .bind(&self.match_report)
        .bind(&self.highlights)
        .fetch_one(executor)
        .await
    }

    /// Deletes a match; its player stats cascade
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Next fixtures, soonest first
    pub async fn upcoming<'e, E: PgExecutor<'e>>(
        executor: E,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Match>(
            "SELECT * FROM matches WHERE date > NOW() AND result = 'pending' ORDER BY date ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    /// Latest results, newest first
    pub async fn recent_results<'e, E: PgExecutor<'e>>(
        executor: E,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Match>(
            "SELECT * FROM matches WHERE result <> 'pending' ORDER BY date DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    /// Lists matches newest first
    pub async fn list(
        pool: &PgPool,
        filter: &MatchFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM matches WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM matches WHERE TRUE");
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY date DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let matches = select.build_query_as::<Match>().fetch_all(pool).await?;
        Ok((matches, total))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &MatchFilter) {
    if let Some(competition) = filter.competition {
        builder.push(" AND competition = ").push_bind(competition);
    }

    match filter.status {
        Some(MatchStatus::Upcoming) => {
            builder.push(" AND date > NOW() AND result = 'pending'");
        }
        Some(MatchStatus::Finished) => {
            builder.push(" AND result <> 'pending'");
        }
        None => {}
    }

    if let Some(year) = filter.year {
        builder
            .push(" AND EXTRACT(YEAR FROM date)::INTEGER = ")
            .push_bind(year);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn sample_match() -> Match {
        let now = Utc::now();
        Match {
            id: Uuid::new_v4(),
            opponent: "Espérance de Tunis".to_string(),
            date: now + Duration::days(7),
            location: "Stade Olympique de Sousse".to_string(),
            is_home: true,
            competition: Competition::League,
            goals_for: None,
            goals_against: None,
            result: MatchResult::Pending,
            attendance: None,
            referee: None,
            weather: None,
            temperature: None,
            match_report: None,
            highlights: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_result_from_score() {
        assert_eq!(MatchResult::from_score(Some(2), Some(1)), MatchResult::Win);
        assert_eq!(MatchResult::from_score(Some(1), Some(1)), MatchResult::Draw);
        assert_eq!(MatchResult::from_score(Some(0), Some(3)), MatchResult::Loss);
        assert_eq!(MatchResult::from_score(None, Some(3)), MatchResult::Pending);
        assert_eq!(MatchResult::from_score(None, None), MatchResult::Pending);
    }

    #[test]
    fn test_score_and_labels() {
        let mut game = sample_match();
        assert_eq!(game.score(), "vs");
        assert_eq!(game.home_away(), "Home");
        assert!(game.is_upcoming_at(Utc::now()));

        game.set_score(2, 1);
        assert_eq!(game.score(), "2-1");
        assert_eq!(game.result, MatchResult::Win);
        assert!(game.is_finished());
        assert!(!game.is_upcoming_at(Utc::now()));

        game.is_home = false;
        assert_eq!(game.home_away(), "Away");
    }

    #[test]
    fn test_patch_recomputes_result() {
        let mut game = sample_match();
        game.apply(MatchPatch {
            goals_for: Some(2),
            ..Default::default()
        });
        assert_eq!(game.result, MatchResult::Pending);

        game.apply(MatchPatch {
            goals_against: Some(2),
            ..Default::default()
        });
        assert_eq!(game.result, MatchResult::Draw);

        game.apply(MatchPatch {
            goals_against: Some(4),
            referee: Some("H. Ben Salah".to_string()),
            ..Default::default()
        });
        assert_eq!(game.result, MatchResult::Loss);
        assert_eq!(game.score(), "2-4");
        assert_eq!(game.referee.as_deref(), Some("H. Ben Salah"));
    }

    #[test]
    fn test_view_json() {
        let mut game = sample_match();
        game.set_score(3, 0);
        let json = serde_json::to_value(game.view()).unwrap();

        assert_eq!(json["score"], "3-0");
        assert_eq!(json["result"], "win");
        assert_eq!(json["home_away"], "Home");
        assert_eq!(json["competition"], "league");
        assert_eq!(json["is_finished"], true);
    }

    #[test]
    fn test_new_match_defaults() {
        let input: NewMatch = serde_json::from_value(serde_json::json!({
            "opponent": "CA Bizertin",
            "date": "2025-03-01T15:00:00Z",
            "location": "Bizerte"
        }))
        .unwrap();

        assert!(input.is_home);
        assert_eq!(input.competition, Competition::League);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_negative_goals_rejected() {
        let patch = MatchPatch {
            goals_for: Some(-1),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }
}
