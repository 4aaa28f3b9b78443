use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use jobq_core::{ActiveFilter, FilterField, FilterValue, Page, RecentSearch, SortField, SortOrder};

use crate::error::ApiError;
use crate::session::session_engine;
use crate::SharedState;

fn parse_field(raw: &str) -> Result<FilterField, ApiError> {
    raw.parse::<FilterField>()
        .map_err(|_| ApiError::BadRequest(format!("unknown filter field: {raw}")))
}

#[derive(Debug, Deserialize)]
pub struct SetFilterRequest {
    pub field: String,
    pub value: FilterValue,
}

pub async fn set_filter(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(request): Json<SetFilterRequest>,
) -> Result<Json<Vec<ActiveFilter>>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    engine.set_filter(parse_field(&request.field)?, request.value)?;
    Ok(Json(engine.active_filters()))
}

#[derive(Debug, Deserialize)]
pub struct RemoveFilterRequest {
    pub field: String,
    pub member: Option<String>,
}

pub async fn remove_filter(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(request): Json<RemoveFilterRequest>,
) -> Result<Json<Vec<ActiveFilter>>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    engine.remove_filter(parse_field(&request.field)?, request.member.as_deref())?;
    Ok(Json(engine.active_filters()))
}

#[derive(Debug, Deserialize)]
pub struct ToggleSkillRequest {
    pub skill: String,
}

pub async fn toggle_skill(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(request): Json<ToggleSkillRequest>,
) -> Result<Json<Vec<ActiveFilter>>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    engine.toggle_skill(&request.skill)?;
    Ok(Json(engine.active_filters()))
}

pub async fn clear_filters(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ActiveFilter>>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    engine.clear_all();
    Ok(Json(engine.active_filters()))
}

pub async fn active_filters(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ActiveFilter>>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let engine = engine.lock().await;

    Ok(Json(engine.active_filters()))
}

#[derive(Debug, Deserialize)]
pub struct SortRequest {
    pub field: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

pub async fn set_sort(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(request): Json<SortRequest>,
) -> Result<Json<Vec<ActiveFilter>>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    engine.set_sort(request.field, request.order);
    Ok(Json(engine.active_filters()))
}

#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub page: u32,
}

pub async fn set_page(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(request): Json<PageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    engine.goto_page(request.page);
    Ok(Json(serde_json::json!({ "page": engine.page() })))
}

pub async fn execute(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<Page>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let mut engine = engine.lock().await;

    let page = engine.execute().await?;
    Ok(Json(page))
}

pub async fn recent_searches(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<RecentSearch>>, ApiError> {
    let engine = session_engine(&state, &session_id).await?;
    let engine = engine.lock().await;

    Ok(Json(engine.recent_searches()))
}
