//! Domain and wire types for the record resource

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiError;

/// Status value subject to the title-uniqueness rule.
pub const STATUS_ACTIVE: &str = "active";

pub const TITLE_MAX_LEN: usize = 255;
pub const STATUS_MAX_LEN: usize = 50;

/// A persisted record, as stored and as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated, normalized input for creating a record.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub title: String,
    pub description: Option<String>,
    pub status: String,
}

/// Partial update. `None` means the field was omitted and must be left
/// untouched; a description can therefore never be cleared back to null.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Trim a title and enforce its length bounds.
pub fn normalize_title(raw: &str) -> Result<String, ApiError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(ApiError::Validation(format!(
            "title must be at most {} characters",
            TITLE_MAX_LEN
        )));
    }
    Ok(title.to_string())
}

/// Trim a status and enforce its length bounds.
pub fn normalize_status(raw: &str) -> Result<String, ApiError> {
    let status = raw.trim();
    if status.is_empty() {
        return Err(ApiError::Validation("status must not be empty".to_string()));
    }
    if status.chars().count() > STATUS_MAX_LEN {
        return Err(ApiError::Validation(format!(
            "status must be at most {} characters",
            STATUS_MAX_LEN
        )));
    }
    Ok(status.to_string())
}
