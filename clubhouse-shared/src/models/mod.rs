/// Database models for Clubhouse
///
/// Each module holds one entity: its row type, the JSON view handed to
/// clients, payload types with their validation rules, pure domain logic
/// (computed properties, patch application, state transitions) and the
/// queries that persist it. Queries take any `PgExecutor`, so they run
/// equally against the pool or inside a transaction.
///
/// # Models
///
/// - `user`: Accounts and roles
/// - `player`: Player profiles linked 1:1 to users
/// - `matches`: Fixtures and results
/// - `player_stats`: Per-match statistics of a player
/// - `training`: Training sessions
/// - `attendance`: Who attended a training session
/// - `finance`: Income and expense transactions
/// - `news`: Club news articles
///
/// # Example
///
/// ```no_run
/// use clubhouse_shared::models::matches::{Match, MatchFilter};
/// use clubhouse_shared::pagination::PageRequest;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let (matches, total) =
///     Match::list(&pool, &MatchFilter::default(), &PageRequest::new(None, None, 10)).await?;
/// println!("{} of {} matches", matches.len(), total);
/// # Ok(())
/// # }
/// ```

pub mod attendance;
pub mod finance;
pub mod matches;
pub mod news;
pub mod player;
pub mod player_stats;
pub mod training;
pub mod user;

/// `100 * part / whole` rounded to one decimal, 0 when `whole` is 0
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / whole as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(3, 4), 75.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(percentage(0, 7), 0.0);
    }
}
