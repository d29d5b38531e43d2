/// News articles
///
/// Articles are written as drafts by admins, coaches and staff and become
/// visible to the public once an admin publishes them. Every article has a
/// URL slug derived from its title and kept unique with a numeric suffix
/// (`derby-day`, `derby-day-1`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;
use validator::Validate;

use super::player::PlayerPosition;
use super::user::join_name;
use crate::error::DomainError;
use crate::pagination::PageRequest;

pub const ALREADY_PUBLISHED: &str = "Article is already published";
pub const NOT_PUBLISHED: &str = "Article is not published";

const EXCERPT_CHARS: usize = 200;
const WORDS_PER_MINUTE: f64 = 200.0;
const FALLBACK_SLUG: &str = "article";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "news_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    MatchReport,
    Transfer,
    Training,
    Announcement,
    Interview,
    InjuryUpdate,
    #[default]
    ClubNews,
    Community,
    Achievement,
    Other,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 10] = [
        NewsCategory::MatchReport,
        NewsCategory::Transfer,
        NewsCategory::Training,
        NewsCategory::Announcement,
        NewsCategory::Interview,
        NewsCategory::InjuryUpdate,
        NewsCategory::ClubNews,
        NewsCategory::Community,
        NewsCategory::Achievement,
        NewsCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NewsCategory::MatchReport => "Match Report",
            NewsCategory::Transfer => "Transfer",
            NewsCategory::Training => "Training",
            NewsCategory::Announcement => "Announcement",
            NewsCategory::Interview => "Interview",
            NewsCategory::InjuryUpdate => "Injury Update",
            NewsCategory::ClubNews => "Club News",
            NewsCategory::Community => "Community",
            NewsCategory::Achievement => "Achievement",
            NewsCategory::Other => "Other",
        }
    }
}

/// URL-friendly form of a title
///
/// The title is NFKD-decomposed and reduced to ASCII, so accented letters
/// keep their base letter. Punctuation is dropped and runs of spaces and
/// hyphens collapse into one hyphen. Falls back to `article` when nothing
/// is left.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .nfkd()
        .filter(char::is_ascii)
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut in_separator = false;
    for c in kept.trim().to_lowercase().chars() {
        if c == '-' || c.is_whitespace() {
            if !in_separator {
                slug.push('-');
                in_separator = true;
            }
        } else {
            slug.push(c);
            in_separator = false;
        }
    }

    if slug.trim_matches('-').is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// First free slug among `base`, `base-1`, `base-2`, ...
pub fn dedupe_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Summary shown in lists: the first 200 characters, with "..." when cut
pub fn excerpt_of(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Estimated minutes to read, at least 1
pub fn reading_time(content: &str) -> i32 {
    let words = content.split_whitespace().count() as f64;
    ((words / WORDS_PER_MINUTE).round_ties_even() as i32).max(1)
}

/// Splits comma separated tags, dropping blanks
pub fn tag_list(tags: Option<&str>) -> Vec<String> {
    tags.map(|tags| {
        tags.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct News {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: Uuid,
    pub category: NewsCategory,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub featured_image: Option<String>,
    pub video_url: Option<String>,
    pub views_count: i32,
    pub likes_count: i32,
    pub comments_enabled: bool,
    pub is_featured: bool,
    pub is_breaking: bool,
    pub priority: i32,
    pub related_match_id: Option<Uuid>,
    pub related_player_id: Option<Uuid>,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl News {
    /// Published with a publication time not in the future
    pub fn is_published_at(&self, now: DateTime<Utc>) -> bool {
        self.published && self.published_at.is_some_and(|at| at <= now)
    }

    pub fn publish(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.is_published_at(now) {
            return Err(DomainError::state(ALREADY_PUBLISHED));
        }
        self.published = true;
        self.published_at = Some(now);
        Ok(())
    }

    pub fn unpublish(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_published_at(now) {
            return Err(DomainError::state(NOT_PUBLISHED));
        }
        self.published = false;
        self.published_at = None;
        Ok(())
    }

    pub fn set_tags(&mut self, tags: &[String]) {
        self.tags = if tags.is_empty() {
            None
        } else {
            Some(tags.join(", "))
        };
    }

    /// Applies a patch. Returns true when a title was supplied, in which case
    /// the caller regenerates the slug.
    pub fn apply(&mut self, patch: NewsPatch) -> bool {
        let retitled = patch.title.is_some();

        if let Some(title) = patch.title {
            self.title = title;
        }
        match (patch.content, patch.excerpt) {
            (Some(content), None) => {
                self.excerpt = Some(excerpt_of(&content));
                self.content = content;
            }
            (content, excerpt) => {
                if let Some(content) = content {
                    self.content = content;
                }
                if excerpt.is_some() {
                    self.excerpt = excerpt;
                }
            }
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if patch.meta_description.is_some() {
            self.meta_description = patch.meta_description;
        }
        if patch.meta_keywords.is_some() {
            self.meta_keywords = patch.meta_keywords;
        }
        if patch.featured_image.is_some() {
            self.featured_image = patch.featured_image;
        }
        if patch.video_url.is_some() {
            self.video_url = patch.video_url;
        }
        if let Some(enabled) = patch.comments_enabled {
            self.comments_enabled = enabled;
        }
        if let Some(featured) = patch.is_featured {
            self.is_featured = featured;
        }
        if let Some(breaking) = patch.is_breaking {
            self.is_breaking = breaking;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if patch.related_match_id.is_some() {
            self.related_match_id = patch.related_match_id;
        }
        if patch.related_player_id.is_some() {
            self.related_player_id = patch.related_player_id;
        }
        if patch.tags.is_some() {
            self.tags = patch.tags;
        }

        retitled
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewNews {
    #[validate(length(min = 5, max = 200, message = "Title must be between 5 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 50, message = "Content must be at least 50 characters"))]
    pub content: String,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub category: NewsCategory,
    #[validate(length(max = 160))]
    pub meta_description: Option<String>,
    #[validate(length(max = 255))]
    pub meta_keywords: Option<String>,
    #[validate(length(max = 255))]
    pub featured_image: Option<String>,
    #[validate(length(max = 255))]
    pub video_url: Option<String>,
    #[serde(default = "default_true")]
    pub comments_enabled: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_breaking: bool,
    #[serde(default)]
    pub priority: i32,
    pub related_match_id: Option<Uuid>,
    pub related_player_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub tags: Option<String>,
    /// Honoured only for admins
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewsPatch {
    #[validate(length(min = 5, max = 200, message = "Title must be between 5 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 50, message = "Content must be at least 50 characters"))]
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<NewsCategory>,
    #[validate(length(max = 160))]
    pub meta_description: Option<String>,
    #[validate(length(max = 255))]
    pub meta_keywords: Option<String>,
    #[validate(length(max = 255))]
    pub featured_image: Option<String>,
    #[validate(length(max = 255))]
    pub video_url: Option<String>,
    pub comments_enabled: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_breaking: Option<bool>,
    pub priority: Option<i32>,
    pub related_match_id: Option<Uuid>,
    pub related_player_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewsFilter {
    pub category: Option<NewsCategory>,
    pub featured: bool,
    pub breaking: bool,
    pub search: Option<String>,
}

/// Article with author name and linked match/player
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NewsRecord {
    #[sqlx(flatten)]
    pub news: News,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
    pub match_opponent: Option<String>,
    pub match_date: Option<DateTime<Utc>>,
    pub player_first_name: Option<String>,
    pub player_last_name: Option<String>,
    pub player_position: Option<PlayerPosition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedMatch {
    pub id: Uuid,
    pub opponent: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedPlayer {
    pub id: Uuid,
    pub name: String,
    pub position: PlayerPosition,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub category: NewsCategory,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub published: bool,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub featured_image: Option<String>,
    pub video_url: Option<String>,
    pub views_count: i32,
    pub likes_count: i32,
    pub reading_time: i32,
    pub comments_enabled: bool,
    pub is_featured: bool,
    pub is_breaking: bool,
    pub priority: i32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_match: Option<RelatedMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_player: Option<RelatedPlayer>,
}

impl NewsRecord {
    pub fn view_at(&self, with_content: bool, now: DateTime<Utc>) -> NewsView {
        let n = &self.news;

        let author_name = match (&self.author_first_name, &self.author_last_name) {
            (Some(first), Some(last)) => Some(join_name(first, last)),
            _ => None,
        };
        let related_match = match (n.related_match_id, &self.match_opponent, self.match_date) {
            (Some(id), Some(opponent), Some(date)) => Some(RelatedMatch {
                id,
                opponent: opponent.clone(),
                date,
            }),
            _ => None,
        };
        let related_player = match (n.related_player_id, self.player_position) {
            (Some(id), Some(position)) => Some(RelatedPlayer {
                id,
                name: join_name(
                    self.player_first_name.as_deref().unwrap_or_default(),
                    self.player_last_name.as_deref().unwrap_or_default(),
                ),
                position,
            }),
            _ => None,
        };

        NewsView {
            id: n.id,
            title: n.title.clone(),
            slug: n.slug.clone(),
            excerpt: n.excerpt.clone(),
            category: n.category,
            author_id: n.author_id,
            author_name,
            published: n.published,
            is_published: n.is_published_at(now),
            published_at: n.published_at,
            meta_description: n.meta_description.clone(),
            meta_keywords: n.meta_keywords.clone(),
            featured_image: n.featured_image.clone(),
            video_url: n.video_url.clone(),
            views_count: n.views_count,
            likes_count: n.likes_count,
            reading_time: reading_time(&n.content),
            comments_enabled: n.comments_enabled,
            is_featured: n.is_featured,
            is_breaking: n.is_breaking,
            priority: n.priority,
            tags: tag_list(n.tags.as_deref()),
            created_at: n.created_at,
            updated_at: n.updated_at,
            content: with_content.then(|| n.content.clone()),
            related_match,
            related_player,
        }
    }

    pub fn view(&self, with_content: bool) -> NewsView {
        self.view_at(with_content, Utc::now())
    }
}

const RECORD_SELECT: &str = r#"
    SELECT n.*,
        au.first_name AS author_first_name, au.last_name AS author_last_name,
        m.opponent AS match_opponent, m.date AS match_date,
        pu.first_name AS player_first_name, pu.last_name AS player_last_name,
        p.position AS player_position
    FROM news n
    LEFT JOIN users au ON au.id = n.author_id
    LEFT JOIN matches m ON m.id = n.related_match_id
    LEFT JOIN players p ON p.id = n.related_player_id
    LEFT JOIN users pu ON pu.id = p.user_id
"#;

const PUBLISHED: &str = " WHERE n.published AND n.published_at <= NOW()";

impl News {
    /// Slug for `title` that no other article uses
    pub async fn unique_slug<'e, E: PgExecutor<'e>>(
        executor: E,
        title: &str,
        exclude: Option<Uuid>,
    ) -> Result<String, sqlx::Error> {
        let base = slugify(title);

        let taken: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT slug FROM news
            WHERE (slug = $1 OR slug LIKE $1 || '-%')
              AND ($2::UUID IS NULL OR id <> $2)
            "#,
        )
        .bind(&base)
        .bind(exclude)
        .fetch_all(executor)
        .await?;

        Ok(dedupe_slug(&base, &taken.into_iter().collect()))
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: NewNews,
        author_id: Uuid,
        slug: String,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<Self, sqlx::Error> {
        let excerpt = data.excerpt.or_else(|| Some(excerpt_of(&data.content)));

        sqlx::query_as::<_, News>(
            r#"
            INSERT INTO news (
                title, slug, content, excerpt, published, published_at, author_id, category,
                meta_description, meta_keywords, featured_image, video_url, comments_enabled,
                is_featured, is_breaking, priority, related_match_id, related_player_id, tags
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(data.title)
        .bind(slug)
        .bind(data.content)
        .bind(excerpt)
        .bind(published_at.is_some())
        .bind(published_at)
        .bind(author_id)
        .bind(data.category)
        .bind(data.meta_description)
        .bind(data.meta_keywords)
        .bind(data.featured_image)
        .bind(data.video_url)
        .bind(data.comments_enabled)
        .bind(data.is_featured)
        .bind(data.is_breaking)
        .bind(data.priority)
        .bind(data.related_match_id)
        .bind(data.related_player_id)
        .bind(data.tags)
        .fetch_one(executor)
        .await
    }

    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, News>("SELECT * FROM news WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_record<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<NewsRecord>, sqlx::Error> {
        sqlx::query_as::<_, NewsRecord>(&format!("{} WHERE n.id = $1", RECORD_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_record_by_slug<'e, E: PgExecutor<'e>>(
        executor: E,
        slug: &str,
    ) -> Result<Option<NewsRecord>, sqlx::Error> {
        sqlx::query_as::<_, NewsRecord>(&format!("{} WHERE n.slug = $1", RECORD_SELECT))
            .bind(slug)
            .fetch_optional(executor)
            .await
    }

    pub async fn save<'e, E: PgExecutor<'e>>(&self, executor: E) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE news
            SET title = $2, slug = $3, content = $4, excerpt = $5, published = $6,
                published_at = $7, category = $8, meta_description = $9, meta_keywords = $10,
                featured_image = $11, video_url = $12, comments_enabled = $13,
                is_featured = $14, is_breaking = $15, priority = $16,
                related_match_id = $17, related_player_id = $18, tags = $19,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(&self.title)
        .bind(&self.slug)
        .bind(&self.content)
        .bind(&self.excerpt)
        .bind(self.published)
        .bind(self.published_at)
        .bind(self.category)
        .bind(&self.meta_description)
        .bind(&self.meta_keywords)
        .bind(&self.featured_image)
        .bind(&self.video_url)
        .bind(self.comments_enabled)
        .bind(self.is_featured)
        .bind(self.is_breaking)
        .bind(self.priority)
        .bind(self.related_match_id)
        .bind(self.related_player_id)
        .bind(&self.tags)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Counts one view and returns the new total
    pub async fn increment_views<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE news SET views_count = views_count + 1 WHERE id = $1 RETURNING views_count",
        )
        .bind(id)
        .fetch_one(executor)
        .await
    }

    pub async fn add_like<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE news SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count",
        )
        .bind(id)
        .fetch_one(executor)
        .await
    }

    /// Removes one like; the counter never drops below zero
    pub async fn remove_like<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE news SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1 RETURNING likes_count",
        )
        .bind(id)
        .fetch_one(executor)
        .await
    }

    pub async fn featured<'e, E: PgExecutor<'e>>(
        executor: E,
        limit: i64,
    ) -> Result<Vec<NewsRecord>, sqlx::Error> {
        sqlx::query_as::<_, NewsRecord>(&format!(
            "{}{} AND n.is_featured ORDER BY n.priority DESC, n.published_at DESC LIMIT $1",
            RECORD_SELECT, PUBLISHED
        ))
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    pub async fn breaking<'e, E: PgExecutor<'e>>(
        executor: E,
        limit: i64,
    ) -> Result<Vec<NewsRecord>, sqlx::Error> {
        sqlx::query_as::<_, NewsRecord>(&format!(
            "{}{} AND n.is_breaking ORDER BY n.published_at DESC LIMIT $1",
            RECORD_SELECT, PUBLISHED
        ))
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    pub async fn recent<'e, E: PgExecutor<'e>>(
        executor: E,
        limit: i64,
        category: Option<NewsCategory>,
    ) -> Result<Vec<NewsRecord>, sqlx::Error> {
        sqlx::query_as::<_, NewsRecord>(&format!(
            "{}{} AND ($2::news_category IS NULL OR n.category = $2) ORDER BY n.published_at DESC LIMIT $1",
            RECORD_SELECT, PUBLISHED
        ))
        .bind(limit)
        .bind(category)
        .fetch_all(executor)
        .await
    }

    /// Published articles whose title, content or tags contain `text`
    pub async fn search<'e, E: PgExecutor<'e>>(
        executor: E,
        text: &str,
        limit: i64,
    ) -> Result<Vec<NewsRecord>, sqlx::Error> {
        sqlx::query_as::<_, NewsRecord>(&format!(
            "{}{} AND (n.title ILIKE $1 OR n.content ILIKE $1 OR n.tags ILIKE $1) \
             ORDER BY n.published_at DESC LIMIT $2",
            RECORD_SELECT, PUBLISHED
        ))
        .bind(format!("%{}%", text))
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    /// Published articles, highest priority then newest first
    pub async fn list(
        pool: &PgPool,
        filter: &NewsFilter,
        page: &PageRequest,
    ) -> Result<(Vec<NewsRecord>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM news n");
        count.push(PUBLISHED);
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(RECORD_SELECT);
        select.push(PUBLISHED);
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY n.priority DESC, n.published_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let records = select.build_query_as::<NewsRecord>().fetch_all(pool).await?;
        Ok((records, total))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &NewsFilter) {
    if let Some(category) = filter.category {
        builder.push(" AND n.category = ").push_bind(category);
    }
    if filter.featured {
        builder.push(" AND n.is_featured");
    }
    if filter.breaking {
        builder.push(" AND n.is_breaking");
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (n.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR n.content ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR n.tags ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_news() -> News {
        let now = Utc::now();
        News {
            id: Uuid::new_v4(),
            title: "Derby day preview".to_string(),
            slug: "derby-day-preview".to_string(),
            content: "word ".repeat(450),
            excerpt: None,
            published: false,
            published_at: None,
            author_id: Uuid::new_v4(),
            category: NewsCategory::ClubNews,
            meta_description: None,
            meta_keywords: None,
            featured_image: None,
            video_url: None,
            views_count: 0,
            likes_count: 0,
            comments_enabled: true,
            is_featured: false,
            is_breaking: false,
            priority: 0,
            related_match_id: None,
            related_player_id: None,
            tags: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Derby Day: Preview!"), "derby-day-preview");
        assert_eq!(slugify("  Victoire à Sfax  "), "victoire-a-sfax");
        assert_eq!(slugify("U-19   -- squad"), "u-19-squad");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
        assert_eq!(slugify("!!!"), "article");
    }

    #[test]
    fn test_slugify_folds_composed_letters() {
        assert_eq!(slugify("Beşiktaş beaten"), "besiktas-beaten");
        assert_eq!(slugify("Ğuzel Țara"), "guzel-tara");
        assert_eq!(slugify("Gdańsk Őrség"), "gdansk-orseg");
        assert_eq!(slugify("Ｆｕｌｌwidth ½ time"), "fullwidth-12-time");
    }

    #[test]
    fn test_dedupe_slug() {
        let mut taken = HashSet::new();
        assert_eq!(dedupe_slug("derby", &taken), "derby");

        taken.insert("derby".to_string());
        assert_eq!(dedupe_slug("derby", &taken), "derby-1");

        taken.insert("derby-1".to_string());
        taken.insert("derby-3".to_string());
        assert_eq!(dedupe_slug("derby", &taken), "derby-2");
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt_of("short"), "short");

        let long = "é".repeat(250);
        let excerpt = excerpt_of(&long);
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), 203);

        let exact = "a".repeat(200);
        assert_eq!(excerpt_of(&exact), exact);
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(""), 1);
        assert_eq!(reading_time(&"word ".repeat(99)), 1);
        assert_eq!(reading_time(&"word ".repeat(450)), 2);
        assert_eq!(reading_time(&"word ".repeat(700)), 4);
    }

    #[test]
    fn test_tags() {
        assert_eq!(tag_list(Some("derby, home ,, cup")), vec!["derby", "home", "cup"]);
        assert!(tag_list(None).is_empty());

        let mut news = sample_news();
        news.set_tags(&["derby".to_string(), "cup".to_string()]);
        assert_eq!(news.tags.as_deref(), Some("derby, cup"));
        news.set_tags(&[]);
        assert!(news.tags.is_none());
    }

    #[test]
    fn test_publish_cycle() {
        let now = Utc::now();
        let mut news = sample_news();

        assert_eq!(news.unpublish(now), Err(DomainError::state(NOT_PUBLISHED)));
        news.publish(now).unwrap();
        assert!(news.is_published_at(now));
        assert_eq!(news.publish(now), Err(DomainError::state(ALREADY_PUBLISHED)));

        news.unpublish(now).unwrap();
        assert!(!news.published);
        assert!(news.published_at.is_none());
    }

    #[test]
    fn test_scheduled_article_is_not_published_yet() {
        let now = Utc::now();
        let mut news = sample_news();
        news.published = true;
        news.published_at = Some(now + Duration::hours(1));

        assert!(!news.is_published_at(now));
        assert!(news.is_published_at(now + Duration::hours(2)));
    }

    #[test]
    fn test_patch_regenerates_excerpt() {
        let mut news = sample_news();
        let content = "fresh ".repeat(60);

        let retitled = news.apply(NewsPatch {
            content: Some(content.clone()),
            priority: Some(3),
            ..Default::default()
        });
        assert!(!retitled);
        assert_eq!(news.excerpt, Some(excerpt_of(&content)));
        assert_eq!(news.priority, 3);

        let retitled = news.apply(NewsPatch {
            title: Some("Cup final report".to_string()),
            content: Some(content),
            excerpt: Some("Custom".to_string()),
            ..Default::default()
        });
        assert!(retitled);
        assert_eq!(news.excerpt.as_deref(), Some("Custom"));
    }

    #[test]
    fn test_payload_validation() {
        let short: NewNews = serde_json::from_value(serde_json::json!({
            "title": "Hey",
            "content": "too short"
        }))
        .unwrap();
        let errors = short.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(errors.field_errors().contains_key("content"));
        assert_eq!(short.category, NewsCategory::ClubNews);
        assert!(short.comments_enabled);
    }

    #[test]
    fn test_view() {
        let now = Utc::now();
        let mut news = sample_news();
        news.tags = Some("derby, preview".to_string());
        news.related_player_id = Some(Uuid::new_v4());

        let record = NewsRecord {
            news,
            author_first_name: Some("Sami".to_string()),
            author_last_name: Some("Trabelsi".to_string()),
            match_opponent: None,
            match_date: None,
            player_first_name: Some("Youssef".to_string()),
            player_last_name: Some("Msakni".to_string()),
            player_position: Some(PlayerPosition::Lw),
        };

        let summary = serde_json::to_value(record.view_at(false, now)).unwrap();
        assert!(summary.get("content").is_none());
        assert!(summary.get("related_match").is_none());
        assert_eq!(summary["author_name"], "Sami Trabelsi");
        assert_eq!(summary["tags"], serde_json::json!(["derby", "preview"]));
        assert_eq!(summary["reading_time"], 2);
        assert_eq!(summary["related_player"]["name"], "Youssef Msakni");
        assert_eq!(summary["related_player"]["position"], "LW");

        let full = serde_json::to_value(record.view_at(true, now)).unwrap();
        assert!(full["content"].is_string());
    }
}
