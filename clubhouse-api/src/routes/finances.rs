/// Finance endpoints
///
/// Readable by admins, coaches and staff. Staff may record transactions and
/// edit them while pending; approval, rejection, completion and deletion are
/// admin only. Reference numbers, bank details and the linked people are only
/// serialized for admins.
///
/// # Endpoints
///
/// - `GET /api/finances` - Paginated (filters: type, category, status, year, month)
/// - `GET /api/finances/summary?year=2024&month=3` - Totals and category breakdown
/// - `GET /api/finances/categories` - Category codes and labels by type
/// - `GET /api/finances/:id`
/// - `POST /api/finances` - Record a transaction (admin, staff)
/// - `PUT /api/finances/:id` - Partial update
/// - `DELETE /api/finances/:id` - Delete (admin)
/// - `POST /api/finances/:id/approve|reject|complete` - Status changes (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::{message, today},
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{Datelike, Utc};
use clubhouse_shared::{
    auth::{
        context::AuthContext,
        policy::{self, Action, Resource},
    },
    error::DomainError,
    models::finance::{
        Finance, FinanceCategory, FinanceFilter, FinancePatch, FinanceRecord, FinanceView,
        FinancialReport, NewFinance, ReportPeriod, TransactionStatus, TransactionType,
    },
    pagination::{PageRequest, Pagination},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

const TRANSACTION_NOT_FOUND: &str = "Transaction not found";

#[derive(Debug, Deserialize)]
pub struct FinancesQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub category: Option<FinanceCategory>,
    pub status: Option<TransactionStatus>,
    pub year: Option<i32>,
    /// Ignored without `year`
    pub month: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FinancesResponse {
    pub finances: Vec<FinanceView>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub income: BTreeMap<FinanceCategory, &'static str>,
    pub expense: BTreeMap<FinanceCategory, &'static str>,
}

fn labels(transaction_type: TransactionType) -> BTreeMap<FinanceCategory, &'static str> {
    FinanceCategory::of_type(transaction_type)
        .map(|category| (category, category.label()))
        .collect()
}

fn view_for(auth: &AuthContext, record: &FinanceRecord) -> FinanceView {
    record.view(auth.sees_sensitive(Resource::Finances, false), today())
}

pub async fn list_finances(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<FinancesQuery>,
) -> ApiResult<Json<FinancesResponse>> {
    auth.authorize(Resource::Finances, Action::Read, false)?;

    let page = PageRequest::new(query.page, query.per_page, 20);
    let filter = FinanceFilter {
        transaction_type: query.transaction_type,
        category: query.category,
        status: query.status,
        year: query.year,
        month: query.month,
    };

    let (records, total) = Finance::list(&state.db, &filter, &page).await?;

    Ok(Json(FinancesResponse {
        finances: records.iter().map(|r| view_for(&auth, r)).collect(),
        pagination: Pagination::new(&page, total),
    }))
}

/// Income, expense and net over approved and completed transactions
///
/// # Errors
///
/// - `400 Bad Request`: Month outside 1-12
pub async fn financial_summary(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<Json<FinancialReport>> {
    auth.authorize(Resource::Finances, Action::Read, false)?;

    let year = query.year.unwrap_or_else(|| today().year());
    let period = ReportPeriod::new(year, query.month)?;

    let report = Finance::report(&state.db, &period).await?;

    tracing::debug!(
        period = %report.period,
        transactions = report.summary.transaction_count,
        "Financial summary computed"
    );

    Ok(Json(report))
}

pub async fn list_categories(auth: AuthContext) -> ApiResult<Json<CategoriesResponse>> {
    auth.authorize(Resource::Finances, Action::Read, false)?;

    Ok(Json(CategoriesResponse {
        income: labels(TransactionType::Income),
        expense: labels(TransactionType::Expense),
    }))
}

pub async fn get_finance(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<FinanceView>> {
    auth.authorize(Resource::Finances, Action::Read, false)?;

    let record = Finance::find_record(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(TRANSACTION_NOT_FOUND))?;

    Ok(Json(view_for(&auth, &record)))
}

/// Record a transaction; it starts pending
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or category not of the transaction type
/// - `409 Conflict`: Unknown player or match
pub async fn create_finance(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(data): ValidatedJson<NewFinance>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    auth.authorize(Resource::Finances, Action::Create, false)?;
    data.check()?;

    let mut tx = state.db.begin().await?;

    let finance = Finance::create(&mut *tx, data, auth.user_id()).await?;
    let record = Finance::find_record(&mut *tx, finance.id)
        .await?
        .ok_or_else(|| ApiError::internal("Created transaction not readable"))?;

    tx.commit().await?;

    tracing::info!(
        finance_id = %finance.id,
        transaction_type = finance.transaction_type.as_str(),
        amount = %finance.amount,
        created_by = %auth.user_id(),
        "Transaction created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Transaction created successfully",
            "finance": view_for(&auth, &record),
        })),
    ))
}

/// Partial update; only admins may edit a transaction once it left pending
pub async fn update_finance(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<FinancePatch>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Finances, Action::Update, false)?;

    let mut tx = state.db.begin().await?;

    let mut finance = Finance::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(TRANSACTION_NOT_FOUND))?;

    policy::authorize_finance_edit(auth.role(), finance.is_pending())?;

    finance.apply(patch)?;
    finance.save(&mut *tx).await?;

    let record = Finance::find_record(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(TRANSACTION_NOT_FOUND))?;

    tx.commit().await?;

    tracing::info!(finance_id = %id, updated_by = %auth.user_id(), "Transaction updated");

    Ok(Json(json!({
        "message": "Transaction updated successfully",
        "finance": view_for(&auth, &record),
    })))
}

pub async fn delete_finance(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    auth.authorize(Resource::Finances, Action::Delete, false)?;

    if !Finance::delete(&state.db, id).await? {
        return Err(ApiError::not_found(TRANSACTION_NOT_FOUND));
    }

    tracing::info!(finance_id = %id, deleted_by = %auth.user_id(), "Transaction deleted");
    Ok(message("Transaction deleted successfully"))
}

/// Loads a transaction for update, applies a status change and saves it
async fn transition<F>(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    change: F,
) -> ApiResult<FinanceRecord>
where
    F: FnOnce(&mut Finance) -> Result<(), DomainError>,
{
    auth.authorize(Resource::Finances, Action::Approve, false)?;

    let mut tx = state.db.begin().await?;

    let mut finance = Finance::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(TRANSACTION_NOT_FOUND))?;

    change(&mut finance)?;
    finance.save(&mut *tx).await?;

    let record = Finance::find_record(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found(TRANSACTION_NOT_FOUND))?;

    tx.commit().await?;

    tracing::info!(
        finance_id = %id,
        status = ?record.finance.status,
        admin_id = %auth.user_id(),
        "Transaction status changed"
    );
    Ok(record)
}

pub async fn approve_finance(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let approver = auth.user_id();
    let record = transition(&state, &auth, id, |finance| {
        finance.approve(approver, Utc::now())
    })
    .await?;

    Ok(Json(json!({
        "message": "Transaction approved successfully",
        "finance": view_for(&auth, &record),
    })))
}

pub async fn reject_finance(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let record = transition(&state, &auth, id, Finance::reject).await?;

    Ok(Json(json!({
        "message": "Transaction rejected successfully",
        "finance": view_for(&auth, &record),
    })))
}

pub async fn complete_finance(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    let record = transition(&state, &auth, id, Finance::complete).await?;

    Ok(Json(json!({
        "message": "Transaction completed successfully",
        "finance": view_for(&auth, &record),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_split_by_type() {
        let income = labels(TransactionType::Income);
        let expense = labels(TransactionType::Expense);

        assert_eq!(income.len() + expense.len(), FinanceCategory::ALL.len());
        assert_eq!(income.get(&FinanceCategory::Sponsorship), Some(&"Sponsorship"));
        assert_eq!(
            expense.get(&FinanceCategory::TransferFeeOut),
            Some(&"Transfer Fee (Outgoing)")
        );
        assert!(!income.contains_key(&FinanceCategory::TransferFeeOut));
    }

    #[test]
    fn test_categories_serialize_as_codes() {
        let body = serde_json::to_value(CategoriesResponse {
            income: labels(TransactionType::Income),
            expense: labels(TransactionType::Expense),
        })
        .unwrap();

        assert_eq!(body["income"]["ticket_sales"], "Ticket Sales");
        assert_eq!(body["expense"]["salary"], "Salary");
    }
}
