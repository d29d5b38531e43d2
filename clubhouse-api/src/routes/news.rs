/// News endpoints
///
/// Listing and reading published articles is public. Admins, coaches and
/// staff write drafts; authors may edit and delete their own articles, and
/// only admins publish.
///
/// # Endpoints
///
/// - `GET /api/news` - Published articles (filters: category, featured, breaking, search)
/// - `GET /api/news/featured|breaking|recent` - Short lists for the front page
/// - `GET /api/news/search?q=derby`
/// - `GET /api/news/categories`
/// - `GET /api/news/slug/:slug` - Published article by slug
/// - `GET /api/news/:id` - Article; drafts only for those allowed to edit them
/// - `POST /api/news` - Create (admin, coach, staff)
/// - `PUT /api/news/:id` - Partial update; a new title regenerates the slug
/// - `DELETE /api/news/:id`
/// - `POST /api/news/:id/publish|unpublish` (admin)
/// - `POST /api/news/:id/like|unlike`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::message,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use clubhouse_shared::{
    auth::{
        context::AuthContext,
        policy::{Action, Resource},
    },
    models::news::{
        News, NewsCategory, NewsFilter, NewsPatch, NewsRecord, NewsView, NewNews,
    },
    pagination::{clamp_limit, PageRequest, Pagination},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

const ARTICLE_NOT_FOUND: &str = "Article not found";

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub category: Option<NewsCategory>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub breaking: bool,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub articles: Vec<NewsView>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
    pub category: Option<NewsCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub search_results: Vec<NewsView>,
    pub query: String,
    pub total_results: usize,
}

fn summaries(records: &[NewsRecord]) -> Vec<NewsView> {
    records.iter().map(|r| r.view(false)).collect()
}

/// Counters are updated with `RETURNING`; no row means the article is gone
fn article_missing(err: sqlx::Error) -> ApiError {
    match err {
        sqlx::Error::RowNotFound => ApiError::not_found(ARTICLE_NOT_FOUND),
        other => other.into(),
    }
}

pub async fn list_news(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NewsQuery>,
) -> ApiResult<Json<NewsResponse>> {
    let page = PageRequest::new(query.page, query.per_page, 10);
    let filter = NewsFilter {
        category: query.category,
        featured: query.featured,
        breaking: query.breaking,
        search: query.search,
    };

    let (records, total) = News::list(&state.db, &filter, &page).await?;

    Ok(Json(NewsResponse {
        articles: summaries(&records),
        pagination: Pagination::new(&page, total),
    }))
}

pub async fn featured_news(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Value>> {
    let records = News::featured(&state.db, clamp_limit(query.limit, 5)).await?;
    Ok(Json(json!({ "featured_articles": summaries(&records) })))
}

pub async fn breaking_news(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Value>> {
    let records = News::breaking(&state.db, clamp_limit(query.limit, 3)).await?;
    Ok(Json(json!({ "breaking_news": summaries(&records) })))
}

pub async fn recent_news(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> ApiResult<Json<Value>> {
    let records = News::recent(&state.db, clamp_limit(query.limit, 10), query.category).await?;
    Ok(Json(json!({ "recent_articles": summaries(&records) })))
}

/// # Errors
///
/// - `400 Bad Request`: Empty `q`
pub async fn search_news(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let text = query.q.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("Search query is required"));
    }

    let records = News::search(&state.db, text, clamp_limit(query.limit, 20)).await?;

    Ok(Json(SearchResponse {
        total_results: records.len(),
        search_results: summaries(&records),
        query: text.to_string(),
    }))
}

pub async fn list_categories() -> Json<BTreeMap<NewsCategory, &'static str>> {
    Json(
        NewsCategory::ALL
            .iter()
            .map(|category| (*category, category.label()))
            .collect(),
    )
}

/// Counts a view and returns the full article
async fn read_published(state: &AppState, mut record: NewsRecord) -> ApiResult<Json<NewsView>> {
    record.news.views_count = News::increment_views(&state.db, record.news.id)
        .await
        .map_err(article_missing)?;
    Ok(Json(record.view(true)))
}

pub async fn get_news_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<NewsView>> {
    let record = News::find_record_by_slug(&state.db, &slug)
        .await?
        .filter(|r| r.news.is_published_at(Utc::now()))
        .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))?;

    read_published(&state, record).await
}

/// Drafts are reported as missing unless the caller may edit them
pub async fn get_news(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<NewsView>> {
    let record = News::find_record(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))?;

    if record.news.is_published_at(Utc::now()) {
        return read_published(&state, record).await;
    }

    let may_edit = auth.is_some_and(|auth| {
        auth.can(
            Resource::News,
            Action::Update,
            record.news.author_id == auth.user_id(),
        )
    });
    if !may_edit {
        return Err(ApiError::not_found(ARTICLE_NOT_FOUND));
    }

    Ok(Json(record.view(true)))
}

/// Create an article
///
/// `published: true` publishes immediately when the author is an admin and
/// is ignored otherwise.
pub async fn create_news(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(data): ValidatedJson<NewNews>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    auth.authorize(Resource::News, Action::Create, false)?;

    let published_at = (data.published && auth.is_admin()).then(Utc::now);

    let mut tx = state.db.begin().await?;

    let slug = News::unique_slug(&mut *tx, &data.title, None).await?;
    let news = News::create(&mut *tx, data, auth.user_id(), slug, published_at).await?;
    let record = News::find_record(&mut *tx, news.id)
        .await?
        .ok_or_else(|| ApiError::internal("Created article not readable"))?;

    tx.commit().await?;

    tracing::info!(
        news_id = %news.id,
        slug = %news.slug,
        published = news.published,
        author_id = %auth.user_id(),
        "Article created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Article created successfully",
            "article": record.view(true),
        })),
    ))
}

pub async fn update_news(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<NewsPatch>,
) -> ApiResult<Json<Value>> {
    let mut tx = state.db.begin().await?;

    let mut news = News::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))?;

    auth.authorize(Resource::News, Action::Update, news.author_id == auth.user_id())?;

    if news.apply(patch) {
        news.slug = News::unique_slug(&mut *tx, &news.title, Some(id)).await?;
    }
    news.save(&mut *tx).await?;

    let record = News::find_record(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))?;

    tx.commit().await?;

    tracing::info!(news_id = %id, slug = %news.slug, updated_by = %auth.user_id(), "Article updated");

    Ok(Json(json!({
        "message": "Article updated successfully",
        "article": record.view(true),
    })))
}

pub async fn delete_news(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let mut tx = state.db.begin().await?;

    let news = News::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))?;

    auth.authorize(Resource::News, Action::Delete, news.author_id == auth.user_id())?;

    News::delete(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!(news_id = %id, deleted_by = %auth.user_id(), "Article deleted");
    Ok(message("Article deleted successfully"))
}

async fn set_published(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    publish: bool,
) -> ApiResult<NewsRecord> {
    auth.authorize(Resource::News, Action::Publish, false)?;

    let mut tx = state.db.begin().await?;

    let mut news = News::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))?;

    let now = Utc::now();
    if publish {
        news.publish(now)?;
    } else {
        news.unpublish(now)?;
    }
    news.save(&mut *tx).await?;

    let record = News::find_record(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))?;

    tx.commit().await?;

    tracing::info!(news_id = %id, published = publish, admin_id = %auth.user_id(), "Article publication changed");
    Ok(record)
}

pub async fn publish_news(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let record = set_published(&state, &auth, id, true).await?;

    Ok(Json(json!({
        "message": "Article published successfully",
        "article": record.view(true),
    })))
}

pub async fn unpublish_news(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let record = set_published(&state, &auth, id, false).await?;

    Ok(Json(json!({
        "message": "Article unpublished successfully",
        "article": record.view(true),
    })))
}

pub async fn like_news(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::News, Action::Read, false)?;

    let likes_count = News::add_like(&state.db, id).await.map_err(article_missing)?;

    tracing::debug!(news_id = %id, likes_count, "Article liked");
    Ok(Json(json!({ "likes_count": likes_count })))
}

pub async fn unlike_news(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::News, Action::Read, false)?;

    let likes_count = News::remove_like(&state.db, id)
        .await
        .map_err(article_missing)?;

    Ok(Json(json!({ "likes_count": likes_count })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_missing_article() {
        let err = article_missing(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg == ARTICLE_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_categories_are_keyed_by_code() {
        let Json(categories) = list_categories().await;
        let body = serde_json::to_value(&categories).unwrap();

        assert_eq!(categories.len(), NewsCategory::ALL.len());
        assert_eq!(body["match_report"], "Match Report");
        assert_eq!(body["club_news"], "Club News");
    }
}
