//! Record handlers

use crate::error::{ApiError, ApiResult};
use crate::models::{normalize_status, normalize_title, NewRecord, Record, RecordPatch, STATUS_ACTIVE};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl CreateRecordRequest {
    fn validate(self) -> Result<NewRecord, ApiError> {
        let title = normalize_title(&self.title)?;
        let status = match self.status {
            Some(status) => normalize_status(&status)?,
            None => STATUS_ACTIVE.to_string(),
        };

        Ok(NewRecord {
            title,
            description: self.description,
            status,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRecordRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl UpdateRecordRequest {
    fn validate(self) -> Result<RecordPatch, ApiError> {
        let title = self.title.as_deref().map(normalize_title).transpose()?;
        let status = self.status.as_deref().map(normalize_status).transpose()?;

        Ok(RecordPatch {
            title,
            description: self.description,
            status,
        })
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Record>>> {
    let records = state.records.list(params.status.as_deref()).await?;
    Ok(Json(records))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRecordRequest>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    let input = body.validate()?;
    let record = state.records.create(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Record>> {
    let record = state.records.get(id).await?;
    Ok(Json(record))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRecordRequest>,
) -> ApiResult<Json<Record>> {
    let changes = body.validate()?;
    let record = state.records.update(id, changes).await?;
    Ok(Json(record))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.records.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
