/// Income and expense transactions
///
/// Every transaction is either income or expense, and its category must
/// belong to that type's set. New transactions start `pending`; an admin moves
/// them along:
///
/// ```text
/// pending ──approve──▶ approved ──complete──▶ completed
///    │
///    └─────reject────▶ rejected
/// ```
///
/// Only approved and completed transactions count towards the financial
/// summary.
///
/// # Example
///
/// ```
/// use clubhouse_shared::models::finance::{FinanceCategory, TransactionType};
///
/// assert_eq!(FinanceCategory::Sponsorship.transaction_type(), TransactionType::Income);
/// assert_eq!(FinanceCategory::TransferFeeOut.label(), "Transfer Fee (Outgoing)");
/// ```

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::user::join_name;
use crate::error::DomainError;
use crate::pagination::PageRequest;

pub const NOT_PENDING: &str = "Transaction is not pending approval";
pub const NOT_APPROVED: &str = "Only approved transactions can be completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "finance_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FinanceCategory {
    // income
    Sponsorship,
    TicketSales,
    Merchandise,
    TransferFee,
    PrizeMoney,
    Donation,
    MembershipFee,
    OtherIncome,
    // expense
    Salary,
    Equipment,
    Travel,
    Facility,
    Medical,
    Training,
    TransferFeeOut,
    Utilities,
    Insurance,
    OtherExpense,
}

impl FinanceCategory {
    pub const ALL: [FinanceCategory; 18] = [
        FinanceCategory::Sponsorship,
        FinanceCategory::TicketSales,
        FinanceCategory::Merchandise,
        FinanceCategory::TransferFee,
        FinanceCategory::PrizeMoney,
        FinanceCategory::Donation,
        FinanceCategory::MembershipFee,
        FinanceCategory::OtherIncome,
        FinanceCategory::Salary,
        FinanceCategory::Equipment,
        FinanceCategory::Travel,
        FinanceCategory::Facility,
        FinanceCategory::Medical,
        FinanceCategory::Training,
        FinanceCategory::TransferFeeOut,
        FinanceCategory::Utilities,
        FinanceCategory::Insurance,
        FinanceCategory::OtherExpense,
    ];

    /// The transaction type this category belongs to
    pub fn transaction_type(&self) -> TransactionType {
        use FinanceCategory::*;
        match self {
            Sponsorship | TicketSales | Merchandise | TransferFee | PrizeMoney | Donation
            | MembershipFee | OtherIncome => TransactionType::Income,
            Salary | Equipment | Travel | Facility | Medical | Training | TransferFeeOut
            | Utilities | Insurance | OtherExpense => TransactionType::Expense,
        }
    }

    pub fn label(&self) -> &'static str {
        use FinanceCategory::*;
        match self {
            Sponsorship => "Sponsorship",
            TicketSales => "Ticket Sales",
            Merchandise => "Merchandise",
            TransferFee => "Transfer Fee (Incoming)",
            PrizeMoney => "Prize Money",
            Donation => "Donation",
            MembershipFee => "Membership Fee",
            OtherIncome => "Other Income",
            Salary => "Salary",
            Equipment => "Equipment",
            Travel => "Travel",
            Facility => "Facility",
            Medical => "Medical",
            Training => "Training",
            TransferFeeOut => "Transfer Fee (Outgoing)",
            Utilities => "Utilities",
            Insurance => "Insurance",
            OtherExpense => "Other Expense",
        }
    }

    pub fn of_type(transaction_type: TransactionType) -> impl Iterator<Item = FinanceCategory> {
        Self::ALL
            .into_iter()
            .filter(move |c| c.transaction_type() == transaction_type)
    }
}

/// Rejects a category outside the transaction type's set
pub fn check_category(
    transaction_type: TransactionType,
    category: FinanceCategory,
) -> Result<(), DomainError> {
    if category.transaction_type() == transaction_type {
        Ok(())
    } else {
        Err(DomainError::state(format!(
            "Invalid category for {} transaction",
            transaction_type.as_str()
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Check,
    Card,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recurring_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecurringFrequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl RecurringFrequency {
    /// Date of the occurrence following `from`
    pub fn next_after(&self, from: NaiveDate) -> Option<NaiveDate> {
        match self {
            RecurringFrequency::Weekly => from.checked_add_days(Days::new(7)),
            RecurringFrequency::Monthly => from.checked_add_months(Months::new(1)),
            RecurringFrequency::Quarterly => from.checked_add_months(Months::new(3)),
            RecurringFrequency::Yearly => from.checked_add_months(Months::new(12)),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Finance {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub category: FinanceCategory,
    pub amount: Decimal,
    pub currency: String,
    pub title: String,
    pub description: Option<String>,
    pub reference_number: Option<String>,
    pub transaction_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: TransactionStatus,
    pub approved_by: Option<Uuid>,
    pub approval_date: Option<DateTime<Utc>>,
    pub player_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    pub bank_account: Option<String>,
    pub receipt_number: Option<String>,
    pub is_recurring: bool,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub next_occurrence: Option<NaiveDate>,
    pub attachments: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Finance {
    pub fn is_income(&self) -> bool {
        self.transaction_type == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    /// Approved or completed
    pub fn is_approved(&self) -> bool {
        matches!(
            self.status,
            TransactionStatus::Approved | TransactionStatus::Completed
        )
    }

    /// Pending with a due date before `today`
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        self.is_pending() && self.due_date.is_some_and(|due| due < today)
    }

    /// Positive for income, negative for expense
    pub fn signed_amount(&self) -> Decimal {
        if self.is_income() {
            self.amount
        } else {
            -self.amount
        }
    }

    pub fn approve(&mut self, approver: Uuid, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::state(NOT_PENDING));
        }
        self.status = TransactionStatus::Approved;
        self.approved_by = Some(approver);
        self.approval_date = Some(now);
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::state(NOT_PENDING));
        }
        self.status = TransactionStatus::Rejected;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), DomainError> {
        if self.status != TransactionStatus::Approved {
            return Err(DomainError::state(NOT_APPROVED));
        }
        self.status = TransactionStatus::Completed;
        Ok(())
    }

    fn schedule_next(&mut self) {
        self.next_occurrence = match (self.is_recurring, self.recurring_frequency) {
            (true, Some(frequency)) => frequency.next_after(self.transaction_date),
            _ => None,
        };
    }

    /// Applies a patch, then re-checks the category against the (possibly new) type
    pub fn apply(&mut self, patch: FinancePatch) -> Result<(), DomainError> {
        if let Some(kind) = patch.transaction_type {
            self.transaction_type = kind;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if let Some(date) = patch.transaction_date {
            self.transaction_date = date;
            self.schedule_next();
        }
        if patch.due_date.is_some() {
            self.due_date = patch.due_date;
        }
        if patch.payment_method.is_some() {
            self.payment_method = patch.payment_method;
        }
        if patch.reference_number.is_some() {
            self.reference_number = patch.reference_number;
        }
        if patch.receipt_number.is_some() {
            self.receipt_number = patch.receipt_number;
        }
        if patch.notes.is_some() {
            self.notes = patch.notes;
        }

        check_category(self.transaction_type, self.category)
    }
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() || amount.is_zero() {
        let mut err = ValidationError::new("amount");
        err.message = Some("Amount must be greater than 0".into());
        return Err(err);
    }
    if amount.scale() > 2 && amount.normalize().scale() > 2 {
        let mut err = ValidationError::new("amount");
        err.message = Some("Amount must have at most 2 decimal places".into());
        return Err(err);
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("currency");
        err.message = Some("Currency must be a 3-letter code".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewFinance {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: FinanceCategory,
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
    #[validate(custom(function = "validate_currency"))]
    pub currency: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub player_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 50))]
    pub reference_number: Option<String>,
    #[validate(length(max = 50))]
    pub bank_account: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub notes: Option<String>,
}

impl NewFinance {
    pub fn check(&self) -> Result<(), DomainError> {
        check_category(self.transaction_type, self.category)
    }

    pub fn next_occurrence(&self) -> Option<NaiveDate> {
        match (self.is_recurring, self.recurring_frequency) {
            (true, Some(frequency)) => frequency.next_after(self.transaction_date),
            _ => None,
        }
    }
}

/// Partial update of a transaction; the status only moves through the
/// approve, reject and complete actions
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FinancePatch {
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub category: Option<FinanceCategory>,
    #[validate(custom(function = "validate_amount"))]
    pub amount: Option<Decimal>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 50))]
    pub reference_number: Option<String>,
    #[validate(length(max = 50))]
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FinanceFilter {
    pub transaction_type: Option<TransactionType>,
    pub category: Option<FinanceCategory>,
    pub status: Option<TransactionStatus>,
    pub year: Option<i32>,
    /// Only applied together with `year`
    pub month: Option<u32>,
}

/// Transaction with the names of linked users, player and match
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FinanceRecord {
    #[sqlx(flatten)]
    pub finance: Finance,
    pub creator_first_name: Option<String>,
    pub creator_last_name: Option<String>,
    pub approver_first_name: Option<String>,
    pub approver_last_name: Option<String>,
    pub player_first_name: Option<String>,
    pub player_last_name: Option<String>,
    pub match_opponent: Option<String>,
}

fn optional_name(first: &Option<String>, last: &Option<String>) -> Option<String> {
    match (first, last) {
        (None, None) => None,
        (first, last) => Some(join_name(
            first.as_deref().unwrap_or_default(),
            last.as_deref().unwrap_or_default(),
        )),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinanceView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: FinanceCategory,
    pub amount: Decimal,
    pub signed_amount: Decimal,
    pub currency: String,
    pub title: String,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: TransactionStatus,
    pub is_pending: bool,
    pub is_approved: bool,
    pub is_overdue: bool,
    pub approval_date: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub next_occurrence: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub private: Option<FinancePrivate>,
}

/// Admin-only details
#[derive(Debug, Clone, Serialize)]
pub struct FinancePrivate {
    pub reference_number: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub bank_account: Option<String>,
    pub receipt_number: Option<String>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub creator_name: Option<String>,
    pub approver_name: Option<String>,
    pub player_name: Option<String>,
    pub match_info: Option<String>,
}

impl FinanceRecord {
    pub fn view(&self, sensitive: bool, today: NaiveDate) -> FinanceView {
        let f = &self.finance;
        FinanceView {
            id: f.id,
            transaction_type: f.transaction_type,
            category: f.category,
            amount: f.amount,
            signed_amount: f.signed_amount(),
            currency: f.currency.clone(),
            title: f.title.clone(),
            description: f.description.clone(),
            transaction_date: f.transaction_date,
            due_date: f.due_date,
            status: f.status,
            is_pending: f.is_pending(),
            is_approved: f.is_approved(),
            is_overdue: f.is_overdue_on(today),
            approval_date: f.approval_date,
            is_recurring: f.is_recurring,
            recurring_frequency: f.recurring_frequency,
            next_occurrence: f.next_occurrence,
            notes: f.notes.clone(),
            created_at: f.created_at,
            private: sensitive.then(|| FinancePrivate {
                reference_number: f.reference_number.clone(),
                payment_method: f.payment_method,
                bank_account: f.bank_account.clone(),
                receipt_number: f.receipt_number.clone(),
                created_by: f.created_by,
                approved_by: f.approved_by,
                creator_name: optional_name(&self.creator_first_name, &self.creator_last_name),
                approver_name: optional_name(&self.approver_first_name, &self.approver_last_name),
                player_name: optional_name(&self.player_first_name, &self.player_last_name),
                match_info: self.match_opponent.as_ref().map(|o| format!("vs {}", o)),
            }),
        }
    }
}

/// Calendar period covered by a financial report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub year: i32,
    pub month: Option<u32>,
}

impl ReportPeriod {
    pub fn new(year: i32, month: Option<u32>) -> Result<Self, DomainError> {
        if let Some(month) = month {
            if !(1..=12).contains(&month) {
                return Err(DomainError::invalid("month", "Month must be between 1 and 12"));
            }
        }
        if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
            return Err(DomainError::invalid("year", "Invalid year"));
        }
        Ok(Self { year, month })
    }

    /// Half-open date range `[start, end)`
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        let start = NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), 1)
            .unwrap_or(NaiveDate::MIN);
        let span = if self.month.is_some() { 1 } else { 12 };
        let end = start
            .checked_add_months(Months::new(span))
            .unwrap_or(NaiveDate::MAX);
        (start, end)
    }

    /// "2024" or "2024-03"
    pub fn label(&self) -> String {
        match self.month {
            Some(month) => format!("{}-{:02}", self.year, month),
            None => self.year.to_string(),
        }
    }

    pub fn current(today: NaiveDate) -> Self {
        Self {
            year: today.year(),
            month: None,
        }
    }
}

/// One grouped row of the report query
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryTotal {
    pub transaction_type: TransactionType,
    pub category: FinanceCategory,
    pub total: Decimal,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryTotals {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_amount: Decimal,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub income_by_category: BTreeMap<FinanceCategory, Decimal>,
    pub expense_by_category: BTreeMap<FinanceCategory, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialReport {
    pub period: String,
    pub summary: SummaryTotals,
    pub breakdown: CategoryBreakdown,
}

impl FinancialReport {
    pub fn from_rows(period: &ReportPeriod, rows: &[CategoryTotal]) -> Self {
        let mut summary = SummaryTotals::default();
        let mut breakdown = CategoryBreakdown::default();

        for row in rows {
            summary.transaction_count += row.count;
            let bucket = match row.transaction_type {
                TransactionType::Income => {
                    summary.total_income += row.total;
                    &mut breakdown.income_by_category
                }
                TransactionType::Expense => {
                    summary.total_expense += row.total;
                    &mut breakdown.expense_by_category
                }
            };
            *bucket.entry(row.category).or_default() += row.total;
        }
        summary.net_amount = summary.total_income - summary.total_expense;

        Self {
            period: period.label(),
            summary,
            breakdown,
        }
    }
}

const RECORD_SELECT: &str = r#"
    SELECT f.*,
        c.first_name AS creator_first_name, c.last_name AS creator_last_name,
        a.first_name AS approver_first_name, a.last_name AS approver_last_name,
        pu.first_name AS player_first_name, pu.last_name AS player_last_name,
        m.opponent AS match_opponent
    FROM finances f
    LEFT JOIN users c ON c.id = f.created_by
    LEFT JOIN users a ON a.id = f.approved_by
    LEFT JOIN players p ON p.id = f.player_id
    LEFT JOIN users pu ON pu.id = p.user_id
    LEFT JOIN matches m ON m.id = f.match_id
"#;

impl Finance {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: NewFinance,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let next_occurrence = data.next_occurrence();

        sqlx::query_as::<_, Finance>(
            r#"
            INSERT INTO finances (
                transaction_type, category, amount, currency, title, description,
                transaction_date, due_date, player_id, match_id, payment_method,
                reference_number, bank_account, is_recurring, recurring_frequency,
                next_occurrence, notes, created_by
            )
            VALUES ($1, $2, $3, COALESCE($4, 'TND'), $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(data.transaction_type)
        .bind(data.category)
        .bind(data.amount)
        .bind(data.currency)
        .bind(data.title)
        .bind(data.description)
        .bind(data.transaction_date)
        .bind(data.due_date)
        .bind(data.player_id)
        .bind(data.match_id)
        .bind(data.payment_method)
        .bind(data.reference_number)
        .bind(data.bank_account)
        .bind(data.is_recurring)
        .bind(data.recurring_frequency)
        .bind(next_occurrence)
        .bind(data.notes)
        .bind(created_by)
        .fetch_one(executor)
        .await
    }

    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Finance>("SELECT * FROM finances WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_record<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<FinanceRecord>, sqlx::Error> {
        sqlx::query_as::<_, FinanceRecord>(&format!("{} WHERE f.id = $1", RECORD_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Writes every mutable column back, status and approval included
    pub async fn save<'e, E: PgExecutor<'e>>(&self, executor: E) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE finances
            SET transaction_type = $2, category = $3, amount = $4, title = $5,
                description = $6, transaction_date = $7, due_date = $8, status = $9,
                approved_by = $10, approval_date = $11, payment_method = $12,
                reference_number = $13, receipt_number = $14, next_occurrence = $15,
                notes = $16, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(self.transaction_type)
        .bind(self.category)
        .bind(self.amount)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.transaction_date)
        .bind(self.due_date)
        .bind(self.status)
        .bind(self.approved_by)
        .bind(self.approval_date)
        .bind(self.payment_method)
        .bind(&self.reference_number)
        .bind(&self.receipt_number)
        .bind(self.next_occurrence)
        .bind(&self.notes)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM finances WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Approved and completed totals per (type, category) within a period
    pub async fn report<'e, E: PgExecutor<'e>>(
        executor: E,
        period: &ReportPeriod,
    ) -> Result<FinancialReport, sqlx::Error> {
        let (start, end) = period.bounds();

        let rows = sqlx::query_as::<_, CategoryTotal>(
            r#"
            SELECT transaction_type, category, SUM(amount) AS total, COUNT(*) AS count
            FROM finances
            WHERE status IN ('approved', 'completed')
              AND transaction_date >= $1
              AND transaction_date < $2
            GROUP BY transaction_type, category
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(executor)
        .await?;

        Ok(FinancialReport::from_rows(period, &rows))
    }

    /// Lists transactions, latest transaction date first
    pub async fn list(
        pool: &PgPool,
        filter: &FinanceFilter,
        page: &PageRequest,
    ) -> Result<(Vec<FinanceRecord>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM finances f WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(RECORD_SELECT);
        select.push(" WHERE TRUE");
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY f.transaction_date DESC, f.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let records = select.build_query_as::<FinanceRecord>().fetch_all(pool).await?;
        Ok((records, total))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &FinanceFilter) {
    if let Some(kind) = filter.transaction_type {
        builder.push(" AND f.transaction_type = ").push_bind(kind);
    }
    if let Some(category) = filter.category {
        builder.push(" AND f.category = ").push_bind(category);
    }
    if let Some(status) = filter.status {
        builder.push(" AND f.status = ").push_bind(status);
    }
    if let Some(year) = filter.year {
        builder
            .push(" AND EXTRACT(YEAR FROM f.transaction_date)::INTEGER = ")
            .push_bind(year);

        if let Some(month) = filter.month {
            builder
                .push(" AND EXTRACT(MONTH FROM f.transaction_date)::INTEGER = ")
                .push_bind(month as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample(kind: TransactionType, category: FinanceCategory, amount: i64) -> Finance {
        let now = Utc::now();
        Finance {
            id: Uuid::new_v4(),
            transaction_type: kind,
            category,
            amount: Decimal::from(amount),
            currency: "TND".to_string(),
            title: "Shirt sponsor".to_string(),
            description: None,
            reference_number: None,
            transaction_date: date(2024, 3, 15),
            due_date: None,
            status: TransactionStatus::Pending,
            approved_by: None,
            approval_date: None,
            player_id: None,
            match_id: None,
            payment_method: None,
            bank_account: None,
            receipt_number: None,
            is_recurring: false,
            recurring_frequency: None,
            next_occurrence: None,
            attachments: None,
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_categories_partition_types() {
        assert_eq!(FinanceCategory::of_type(TransactionType::Income).count(), 8);
        assert_eq!(FinanceCategory::of_type(TransactionType::Expense).count(), 10);
        assert_eq!(
            serde_json::to_value(FinanceCategory::TransferFeeOut).unwrap(),
            "transfer_fee_out"
        );
    }

    #[test]
    fn test_check_category() {
        assert!(check_category(TransactionType::Income, FinanceCategory::Donation).is_ok());
        assert_eq!(
            check_category(TransactionType::Income, FinanceCategory::Salary),
            Err(DomainError::state("Invalid category for income transaction"))
        );
        assert_eq!(
            check_category(TransactionType::Expense, FinanceCategory::Sponsorship),
            Err(DomainError::state("Invalid category for expense transaction"))
        );
    }

    #[test]
    fn test_signed_amount() {
        let income = sample(TransactionType::Income, FinanceCategory::Sponsorship, 500);
        let expense = sample(TransactionType::Expense, FinanceCategory::Travel, 120);
        assert_eq!(income.signed_amount(), Decimal::from(500));
        assert_eq!(expense.signed_amount(), Decimal::from(-120));
    }

    #[test]
    fn test_state_machine() {
        let admin = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = sample(TransactionType::Expense, FinanceCategory::Equipment, 90);
        assert_eq!(tx.complete(), Err(DomainError::state(NOT_APPROVED)));

        tx.approve(admin, now).unwrap();
        assert_eq!(tx.status, TransactionStatus::Approved);
        assert_eq!(tx.approved_by, Some(admin));
        assert_eq!(tx.approval_date, Some(now));
        assert!(tx.is_approved());
        assert_eq!(tx.approve(admin, now), Err(DomainError::state(NOT_PENDING)));
        assert_eq!(tx.reject(), Err(DomainError::state(NOT_PENDING)));

        tx.complete().unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert!(tx.is_approved());

        let mut rejected = sample(TransactionType::Income, FinanceCategory::Donation, 10);
        rejected.reject().unwrap();
        assert_eq!(rejected.status, TransactionStatus::Rejected);
        assert!(rejected.approve(admin, now).is_err());
    }

    #[test]
    fn test_overdue() {
        let mut tx = sample(TransactionType::Expense, FinanceCategory::Utilities, 75);
        assert!(!tx.is_overdue_on(date(2024, 4, 1)));

        tx.due_date = Some(date(2024, 3, 31));
        assert!(tx.is_overdue_on(date(2024, 4, 1)));
        assert!(!tx.is_overdue_on(date(2024, 3, 31)));

        tx.status = TransactionStatus::Approved;
        assert!(!tx.is_overdue_on(date(2024, 4, 1)));
    }

    #[test]
    fn test_next_occurrence() {
        let from = date(2024, 1, 31);
        assert_eq!(RecurringFrequency::Weekly.next_after(from), Some(date(2024, 2, 7)));
        assert_eq!(RecurringFrequency::Monthly.next_after(from), Some(date(2024, 2, 29)));
        assert_eq!(RecurringFrequency::Quarterly.next_after(from), Some(date(2024, 4, 30)));
        assert_eq!(RecurringFrequency::Yearly.next_after(from), Some(date(2025, 1, 31)));
    }

    #[test]
    fn test_patch_revalidates_category() {
        let mut tx = sample(TransactionType::Income, FinanceCategory::Sponsorship, 500);
        let result = tx.apply(FinancePatch {
            transaction_type: Some(TransactionType::Expense),
            ..Default::default()
        });
        assert!(result.is_err());

        let mut tx = sample(TransactionType::Income, FinanceCategory::Sponsorship, 500);
        tx.apply(FinancePatch {
            transaction_type: Some(TransactionType::Expense),
            category: Some(FinanceCategory::Travel),
            title: Some("Away trip".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(tx.is_expense());
        assert_eq!(tx.title, "Away trip");
    }

    #[test]
    fn test_patch_reschedules_recurring() {
        let mut tx = sample(TransactionType::Expense, FinanceCategory::Salary, 3000);
        tx.is_recurring = true;
        tx.recurring_frequency = Some(RecurringFrequency::Monthly);

        tx.apply(FinancePatch {
            transaction_date: Some(date(2024, 5, 1)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(tx.next_occurrence, Some(date(2024, 6, 1)));
    }

    #[test]
    fn test_amount_validation() {
        let payload = |amount: &str| {
            serde_json::from_value::<NewFinance>(serde_json::json!({
                "type": "income",
                "category": "donation",
                "amount": amount.parse::<f64>().unwrap(),
                "title": "Gift",
                "transaction_date": "2024-03-01"
            }))
            .unwrap()
        };

        assert!(payload("150.50").validate().is_ok());
        assert!(payload("0").validate().is_err());
        assert!(payload("-20").validate().is_err());
        assert!(payload("1.234").validate().is_err());
    }

    #[test]
    fn test_report_period() {
        let month = ReportPeriod::new(2024, Some(12)).unwrap();
        assert_eq!(month.bounds(), (date(2024, 12, 1), date(2025, 1, 1)));
        assert_eq!(month.label(), "2024-12");

        let year = ReportPeriod::new(2024, None).unwrap();
        assert_eq!(year.bounds(), (date(2024, 1, 1), date(2025, 1, 1)));
        assert_eq!(year.label(), "2024");

        assert!(ReportPeriod::new(2024, Some(13)).is_err());
        assert!(ReportPeriod::new(2024, Some(0)).is_err());
    }

    #[test]
    fn test_report_folding() {
        let rows = vec![
            CategoryTotal {
                transaction_type: TransactionType::Income,
                category: FinanceCategory::Sponsorship,
                total: Decimal::from(1000),
                count: 2,
            },
            CategoryTotal {
                transaction_type: TransactionType::Income,
                category: FinanceCategory::TicketSales,
                total: Decimal::from_f64(250.5).unwrap(),
                count: 3,
            },
            CategoryTotal {
                transaction_type: TransactionType::Expense,
                category: FinanceCategory::Salary,
                total: Decimal::from(800),
                count: 1,
            },
        ];

        let report = FinancialReport::from_rows(&ReportPeriod::new(2024, Some(3)).unwrap(), &rows);
        assert_eq!(report.period, "2024-03");
        assert_eq!(report.summary.total_income, Decimal::from_f64(1250.5).unwrap());
        assert_eq!(report.summary.total_expense, Decimal::from(800));
        assert_eq!(report.summary.net_amount, Decimal::from_f64(450.5).unwrap());
        assert_eq!(report.summary.transaction_count, 6);
        assert_eq!(report.breakdown.income_by_category.len(), 2);
        assert_eq!(
            report.breakdown.expense_by_category[&FinanceCategory::Salary],
            Decimal::from(800)
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["breakdown"]["income_by_category"]["sponsorship"], 1000.0);

        let empty = FinancialReport::from_rows(&ReportPeriod::new(2024, None).unwrap(), &[]);
        assert_eq!(empty.summary, SummaryTotals::default());
    }

    #[test]
    fn test_private_view() {
        let record = FinanceRecord {
            finance: sample(TransactionType::Income, FinanceCategory::Sponsorship, 500),
            creator_first_name: Some("Sami".to_string()),
            creator_last_name: Some("Trabelsi".to_string()),
            approver_first_name: None,
            approver_last_name: None,
            player_first_name: None,
            player_last_name: None,
            match_opponent: Some("CS Sfaxien".to_string()),
        };

        let public = serde_json::to_value(record.view(false, date(2024, 4, 1))).unwrap();
        assert_eq!(public["type"], "income");
        assert_eq!(public["signed_amount"], 500.0);
        assert!(public.get("creator_name").is_none());

        let private = serde_json::to_value(record.view(true, date(2024, 4, 1))).unwrap();
        assert_eq!(private["creator_name"], "Sami Trabelsi");
        assert_eq!(private["approver_name"], serde_json::Value::Null);
        assert_eq!(private["match_info"], "vs CS Sfaxien");
    }
}
