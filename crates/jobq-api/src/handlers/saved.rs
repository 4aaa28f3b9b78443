use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use jobq_core::{Page, SavedSearch};

use crate::error::ApiError;
use crate::session::session_engine;
use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct SaveSearchRequest {
    pub name: String,
}

pub async fn save_search(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(request): Json<SaveSearchRequest>,
) -> Result<Json<SavedSearch>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    let saved = engine.save_current_search(&request.name)?;
    Ok(Json(saved))
}

pub async fn list_saved(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<SavedSearch>>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let engine = engine.lock().await;

    Ok(Json(engine.saved_searches()))
}

pub async fn load_saved(
    State(state): State<SharedState>,
    Path((session_id, id)): Path<(String, u64)>,
) -> Result<Json<Page>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    let page = engine.load_saved_search(id).await?;
    Ok(Json(page))
}

pub async fn delete_saved(
    State(state): State<SharedState>,
    Path((session_id, id)): Path<(String, u64)>,
) -> Result<StatusCode, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    engine.delete_saved_search(id)?;
    Ok(StatusCode::NO_CONTENT)
}
