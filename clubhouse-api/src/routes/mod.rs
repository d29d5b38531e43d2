/// API route handlers
///
/// One module per resource group. Handlers that take an `AuthContext`
/// argument require a bearer token; write handlers run inside a single
/// database transaction that is committed on success.

pub mod auth;
pub mod finances;
pub mod health;
pub mod matches;
pub mod news;
pub mod players;
pub mod trainings;

use axum::Json;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};

/// `{"message": ...}` body for writes without a payload
pub(crate) fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
