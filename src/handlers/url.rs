use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;

use super::LIST_LIMIT;
use crate::error::ApiError;
use crate::metrics::TRACKED_URLS;
use crate::models::{ListQuery, SortOrder, SubmitUrl, UrlEntry, UrlQuery};
use crate::state::AppState;

// POST /api/v1/url
pub async fn submit_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitUrl>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitUrl>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if payload.url.trim().is_empty() {
        return Err(ApiError::BadRequest("URL is required".to_string()));
    }

    let entry = state.registry.upsert(&payload.url);
    TRACKED_URLS.set(state.registry.len() as f64);
    tracing::debug!(url = %entry.url, count = entry.count, "url submitted");

    Ok((StatusCode::ACCEPTED, Json(payload)))
}

// GET /api/v1/url?url=
pub async fn get_url(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<UrlEntry>, ApiError> {
    let url = query
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("URL is required".to_string()))?;

    let entry = state
        .registry
        .get(&url)
        .ok_or_else(|| ApiError::NotFound("URL not found".to_string()))?;

    if state.refresh_on_lookup {
        let fetcher = state.fetcher.clone();
        tokio::spawn(async move {
            fetcher.fetch(&url).await;
        });
    }

    Ok(Json(entry))
}

// GET /api/v1/urls?sort=
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<UrlEntry>> {
    let mut entries = state.registry.list_all();
    SortOrder::from_param(query.sort.as_deref()).sort(&mut entries);
    entries.truncate(LIST_LIMIT);
    Json(entries)
}
