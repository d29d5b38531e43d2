/// Player profiles
///
/// A player profile belongs to exactly one user account (`players.user_id`
/// is unique). Creating a profile turns the account's role into `player`;
/// deleting it turns the role back into `supporter` (the route layer does
/// both inside one transaction).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE players (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     jersey_number INTEGER CHECK (jersey_number BETWEEN 1 AND 99),
///     position player_position NOT NULL,
///     birth_date DATE NOT NULL,
///     nationality VARCHAR(50) NOT NULL,
///     ...
///     CONSTRAINT players_user_id_key UNIQUE (user_id),
///     CONSTRAINT players_jersey_number_key UNIQUE (jersey_number)
/// );
/// ```
///
/// # Example
///
/// ```
/// use clubhouse_shared::models::player::{season_bounds, PlayerPosition};
/// use chrono::NaiveDate;
///
/// let (start, end) = season_bounds(2024).unwrap();
/// assert_eq!(start, NaiveDate::from_ymd_opt(2024, 8, 1).unwrap());
/// assert_eq!(end, NaiveDate::from_ymd_opt(2025, 7, 31).unwrap());
///
/// assert_eq!(PlayerPosition::Cdm.label(), "Defensive Midfielder");
/// ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::user::join_name;
use crate::pagination::PageRequest;

/// Number of most recent rated appearances that make up a player's rating
pub const RATING_WINDOW: i64 = 10;

/// Playing position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "player_position", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerPosition {
    Gk,
    Cb,
    Lb,
    Rb,
    Cdm,
    Cm,
    Cam,
    Lm,
    Rm,
    Lw,
    Rw,
    Cf,
    St,
}

impl PlayerPosition {
    pub const ALL: [PlayerPosition; 13] = [
        PlayerPosition::Gk,
        PlayerPosition::Cb,
        PlayerPosition::Lb,
        PlayerPosition::Rb,
        PlayerPosition::Cdm,
        PlayerPosition::Cm,
        PlayerPosition::Cam,
        PlayerPosition::Lm,
        PlayerPosition::Rm,
        PlayerPosition::Lw,
        PlayerPosition::Rw,
        PlayerPosition::Cf,
        PlayerPosition::St,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PlayerPosition::Gk => "GK",
            PlayerPosition::Cb => "CB",
            PlayerPosition::Lb => "LB",
            PlayerPosition::Rb => "RB",
            PlayerPosition::Cdm => "CDM",
            PlayerPosition::Cm => "CM",
            PlayerPosition::Cam => "CAM",
            PlayerPosition::Lm => "LM",
            PlayerPosition::Rm => "RM",
            PlayerPosition::Lw => "LW",
            PlayerPosition::Rw => "RW",
            PlayerPosition::Cf => "CF",
            PlayerPosition::St => "ST",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlayerPosition::Gk => "Goalkeeper",
            PlayerPosition::Cb => "Centre Back",
            PlayerPosition::Lb => "Left Back",
            PlayerPosition::Rb => "Right Back",
            PlayerPosition::Cdm => "Defensive Midfielder",
            PlayerPosition::Cm => "Central Midfielder",
            PlayerPosition::Cam => "Attacking Midfielder",
            PlayerPosition::Lm => "Left Midfielder",
            PlayerPosition::Rm => "Right Midfielder",
            PlayerPosition::Lw => "Left Winger",
            PlayerPosition::Rw => "Right Winger",
            PlayerPosition::Cf => "Centre Forward",
            PlayerPosition::St => "Striker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "preferred_foot", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PreferredFoot {
    Left,
    Right,
    Both,
}

impl Default for PreferredFoot {
    fn default() -> Self {
        PreferredFoot::Right
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "player_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Active,
    Injured,
    Suspended,
    Loaned,
    Retired,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        PlayerStatus::Active
    }
}

/// Player row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Player {
    pub id: Uuid,
    pub user_id: Uuid,
    pub jersey_number: Option<i32>,
    pub position: PlayerPosition,
    pub birth_date: NaiveDate,
    pub nationality: String,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub preferred_foot: PreferredFoot,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub salary: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub status: PlayerStatus,
    pub rating: f64,
    pub blood_type: Option<String>,
    pub medical_notes: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub address: Option<String>,
    pub joined_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Player joined with the owning account's name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerRecord {
    #[sqlx(flatten)]
    pub player: Player,
    pub first_name: String,
    pub last_name: String,
}

impl PlayerRecord {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }

    pub fn view(&self, sensitive: bool, today: NaiveDate) -> PlayerView {
        let p = &self.player;

        PlayerView {
            id: p.id,
            user_id: p.user_id,
            full_name: self.full_name(),
            jersey_number: p.jersey_number,
            position: p.position,
            age: p.age_on(today),
            birth_date: p.birth_date,
            nationality: p.nationality.clone(),
            height: p.height,
            weight: p.weight,
            preferred_foot: p.preferred_foot,
            status: p.status,
            rating: p.rating,
            joined_date: p.joined_date,
            contract_active: p.contract_active_on(today),
            is_available: p.is_available(),
            private: sensitive.then(|| PlayerPrivate {
                salary: p.salary,
                market_value: p.market_value,
                contract_start: p.contract_start,
                contract_end: p.contract_end,
                blood_type: p.blood_type.clone(),
                medical_notes: p.medical_notes.clone(),
                emergency_contact_name: p.emergency_contact_name.clone(),
                emergency_contact_phone: p.emergency_contact_phone.clone(),
                address: p.address.clone(),
            }),
        }
    }
}

/// JSON representation of a player
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub jersey_number: Option<i32>,
    pub position: PlayerPosition,
    pub age: i32,
    pub birth_date: NaiveDate,
    pub nationality: String,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub preferred_foot: PreferredFoot,
    pub status: PlayerStatus,
    pub rating: f64,
    pub joined_date: NaiveDate,
    pub contract_active: bool,
    pub is_available: bool,
    #[serde(flatten)]
    pub private: Option<PlayerPrivate>,
}

/// Contract, medical and contact details
#[derive(Debug, Clone, Serialize)]
pub struct PlayerPrivate {
    pub salary: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub blood_type: Option<String>,
    pub medical_notes: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub address: Option<String>,
}

/// Payload for creating a player profile
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPlayer {
    pub user_id: Uuid,
    pub position: PlayerPosition,
    pub birth_date: NaiveDate,
    #[validate(length(min = 1, max = 50))]
    pub nationality: String,
    #[validate(range(min = 1, max = 99, message = "Jersey number must be between 1 and 99"))]
    pub jersey_number: Option<i32>,
    #[validate(range(min = 0.0, max = 250.0))]
    pub height: Option<f64>,
    #[validate(range(min = 0.0, max = 200.0))]
    pub weight: Option<f64>,
    #[serde(default)]
    pub preferred_foot: PreferredFoot,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub salary: Option<Decimal>,
    pub market_value: Option<Decimal>,
    #[validate(length(max = 5))]
    pub blood_type: Option<String>,
    pub medical_notes: Option<String>,
    #[validate(length(max = 100))]
    pub emergency_contact_name: Option<String>,
    #[validate(length(max = 20))]
    pub emergency_contact_phone: Option<String>,
    pub address: Option<String>,
}

/// Partial update of a player profile; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PlayerPatch {
    pub position: Option<PlayerPosition>,
    #[validate(range(min = 1, max = 99, message = "Jersey number must be between 1 and 99"))]
    pub jersey_number: Option<i32>,
    #[validate(range(min = 0.0, max = 250.0))]
    pub height: Option<f64>,
    #[validate(range(min = 0.0, max = 200.0))]
    pub weight: Option<f64>,
    pub preferred_foot: Option<PreferredFoot>,
    pub status: Option<PlayerStatus>,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub salary: Option<Decimal>,
    pub market_value: Option<Decimal>,
    #[validate(length(max = 5))]
    pub blood_type: Option<String>,
    pub medical_notes: Option<String>,
    #[validate(length(max = 100))]
    pub emergency_contact_name: Option<String>,
    #[validate(length(max = 20))]
    pub emergency_contact_phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub position: Option<PlayerPosition>,
    /// `None` lists every status
    pub status: Option<PlayerStatus>,
    pub search: Option<String>,
}

/// Career totals across every recorded appearance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CareerTotals {
    pub matches_played: i64,
    pub goals: i64,
    pub assists: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
    pub minutes_played: i64,
}

/// First and last day of the season starting in `season_year` (Aug 1 to Jul 31)
///
/// `None` when either day falls outside the supported calendar range.
pub fn season_bounds(season_year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(season_year, 8, 1)?;
    let end = NaiveDate::from_ymd_opt(season_year.checked_add(1)?, 7, 31)?;
    Some((start, end))
}

/// Season containing `day`
pub fn season_year_of(day: NaiveDate) -> i32 {
    if day.month() >= 8 {
        day.year()
    } else {
        day.year() - 1
    }
}

/// Average over the most recent appearances
///
/// Unrated appearances count in the denominator. Returns `None` when no
/// appearance in the window was rated, leaving the stored rating as is.
pub fn recent_rating(ratings: &[Option<f64>]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }

    let total: f64 = ratings.iter().flatten().sum();
    if total > 0.0 {
        Some(total / ratings.len() as f64)
    } else {
        None
    }
}

const RECORD_SELECT: &str =
    "SELECT p.*, u.first_name, u.last_name FROM players p JOIN users u ON u.id = p.user_id";

impl Player {
    /// Whole years at `today`
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        let birthday_passed =
            (today.month(), today.day()) >= (self.birth_date.month(), self.birth_date.day());
        today.year() - self.birth_date.year() - if birthday_passed { 0 } else { 1 }
    }

    /// False unless both contract bounds are set and `today` lies within them
    pub fn contract_active_on(&self, today: NaiveDate) -> bool {
        match (self.contract_start, self.contract_end) {
            (Some(start), Some(end)) => start <= today && today <= end,
            _ => false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    pub fn apply(&mut self, patch: PlayerPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(jersey_number) = patch.jersey_number {
            self.jersey_number = Some(jersey_number);
        }
        if let Some(height) = patch.height {
            self.height = Some(height);
        }
        if let Some(weight) = patch.weight {
            self.weight = Some(weight);
        }
        if let Some(foot) = patch.preferred_foot {
            self.preferred_foot = foot;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(start) = patch.contract_start {
            self.contract_start = Some(start);
        }
        if let Some(end) = patch.contract_end {
            self.contract_end = Some(end);
        }
        if let Some(salary) = patch.salary {
            self.salary = Some(salary);
        }
        if let Some(value) = patch.market_value {
            self.market_value = Some(value);
        }
        if patch.blood_type.is_some() {
            self.blood_type = patch.blood_type;
        }
        if patch.medical_notes.is_some() {
            self.medical_notes = patch.medical_notes;
        }
        if patch.emergency_contact_name.is_some() {
            self.emergency_contact_name = patch.emergency_contact_name;
        }
        if patch.emergency_contact_phone.is_some() {
            self.emergency_contact_phone = patch.emergency_contact_phone;
        }
        if patch.address.is_some() {
            self.address = patch.address;
        }
    }

    /// Inserts a player profile
    ///
    /// # Errors
    ///
    /// Violations of `players_user_id_key` or `players_jersey_number_key`
    /// surface as `sqlx::Error::Database`.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: NewPlayer,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Player>(
            r#"
            INSERT INTO players (
                user_id, position, birth_date, nationality, jersey_number, height, weight,
                preferred_foot, contract_start, contract_end, salary, market_value, blood_type,
                medical_notes, emergency_contact_name, emergency_contact_phone, address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.position)
        .bind(data.birth_date)
        .bind(data.nationality)
        .bind(data.jersey_number)
        .bind(data.height)
        .bind(data.weight)
        .bind(data.preferred_foot)
        .bind(data.contract_start)
        .bind(data.contract_end)
        .bind(data.salary)
        .bind(data.market_value)
        .bind(data.blood_type)
        .bind(data.medical_notes)
        .bind(data.emergency_contact_name)
        .bind(data.emergency_contact_phone)
        .bind(data.address)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Loads and locks a player for the rest of the transaction
    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Player>("SELECT * FROM players WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_record<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<PlayerRecord>, sqlx::Error> {
        sqlx::query_as::<_, PlayerRecord>(&format!("{} WHERE p.id = $1", RECORD_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_record_by_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<PlayerRecord>, sqlx::Error> {
        sqlx::query_as::<_, PlayerRecord>(&format!("{} WHERE p.user_id = $1", RECORD_SELECT))
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Writes every editable column back
    pub async fn save<'e, E: PgExecutor<'e>>(&self, executor: E) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Player>(
            r#"
            UPDATE players
            SET position = $2, jersey_number = $3, height = $4, weight = $5,
                preferred_foot = $6, status = $7, contract_start = $8, contract_end = $9,
                salary = $10, market_value = $11, blood_type = $12, medical_notes = $13,
                emergency_contact_name = $14, emergency_contact_phone = $15, address = $16,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.position)
        .bind(self.jersey_number)
        .bind(self.height)
        .bind(self.weight)
        .bind(self.preferred_foot)
        .bind(self.status)
        .bind(self.contract_start)
        .bind(self.contract_end)
        .bind(self.salary)
        .bind(self.market_value)
        .bind(&self.blood_type)
        .bind(&self.medical_notes)
        .bind(&self.emergency_contact_name)
        .bind(&self.emergency_contact_phone)
        .bind(&self.address)
        .fetch_one(executor)
        .await
    }

    /// Deletes a player; stats and attendance rows cascade
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM players WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn career_totals<'e, E: PgExecutor<'e>>(
        executor: E,
        player_id: Uuid,
    ) -> Result<CareerTotals, sqlx::Error> {
        sqlx::query_as::<_, CareerTotals>(
            r#"
            SELECT
                COUNT(*) AS matches_played,
                COALESCE(SUM(goals), 0)::BIGINT AS goals,
                COALESCE(SUM(assists), 0)::BIGINT AS assists,
                COALESCE(SUM(yellow_cards), 0)::BIGINT AS yellow_cards,
                COALESCE(SUM(red_cards), 0)::BIGINT AS red_cards,
                COALESCE(SUM(minutes_played), 0)::BIGINT AS minutes_played
            FROM player_stats
            WHERE player_id = $1
            "#,
        )
        .bind(player_id)
        .fetch_one(executor)
        .await
    }

    /// Recomputes the rating from the latest appearances
    ///
    /// Returns the new rating, or `None` when nothing in the window was rated.
    pub async fn refresh_rating(
        conn: &mut PgConnection,
        player_id: Uuid,
    ) -> Result<Option<f64>, sqlx::Error> {
        let ratings: Vec<Option<f64>> = sqlx::query_scalar(
            r#"
            SELECT s.performance_rating
            FROM player_stats s
            JOIN matches m ON m.id = s.match_id
            WHERE s.player_id = $1
            ORDER BY m.date DESC
            LIMIT $2
            "#,
        )
        .bind(player_id)
        .bind(RATING_WINDOW)
        .fetch_all(&mut *conn)
        .await?;

        let Some(rating) = recent_rating(&ratings) else {
            return Ok(None);
        };

        sqlx::query("UPDATE players SET rating = $2, updated_at = NOW() WHERE id = $1")
            .bind(player_id)
            .bind(rating)
            .execute(&mut *conn)
            .await?;

        Ok(Some(rating))
    }

    /// Lists players ordered by jersey number (unnumbered last)
    pub async fn list(
        pool: &PgPool,
        filter: &PlayerFilter,
        page: &PageRequest,
    ) -> Result<(Vec<PlayerRecord>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM players p JOIN users u ON u.id = p.user_id WHERE TRUE",
        );
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(RECORD_SELECT);
        select.push(" WHERE TRUE");
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY p.jersey_number ASC NULLS LAST, u.last_name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let players = select.build_query_as::<PlayerRecord>().fetch_all(pool).await?;
        Ok((players, total))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &PlayerFilter) {
    if let Some(position) = filter.position {
        builder.push(" AND p.position = ").push_bind(position);
    }

    if let Some(status) = filter.status {
        builder.push(" AND p.status = ").push_bind(status);
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        builder
            .push(" AND (u.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.nationality ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
