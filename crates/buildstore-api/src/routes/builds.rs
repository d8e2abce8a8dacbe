//! Build endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use buildstore_core::{Resource, Selector};
use buildstore_storage::{AsyncResult, QueryParams};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_builds).post(create_build))
        .route(
            "/{id}",
            get(get_build).put(update_build).delete(delete_build),
        )
}

#[derive(Debug, Deserialize)]
struct ListBuildsQuery {
    labels: Option<String>,
}

async fn list_builds(
    State(state): State<AppState>,
    Query(query): Query<ListBuildsQuery>,
) -> Result<Json<Resource>, ApiError> {
    let selector = Selector::parse(query.labels.as_deref().unwrap_or_default())?;
    let builds = state.builds.list(&selector).await?;
    Ok(Json(builds))
}

async fn get_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Resource>, ApiError> {
    let build = state.builds.get(&id).await?;
    Ok(Json(build))
}

async fn create_build(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    let params: QueryParams = params.into_iter().collect();
    let build = state.builds.extract(&body, &params).await?;
    let pending = state.builds.create(build)?;
    let created = wait(&state, pending).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Json<Resource>, ApiError> {
    let params: QueryParams = params.into_iter().collect();
    let mut build = state.builds.extract(&body, &params).await?.into_build()?;
    build.id = id;
    let pending = state.builds.update(build.into())?;
    let updated = wait(&state, pending).await?;
    Ok(Json(updated))
}

async fn delete_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Resource>, ApiError> {
    let pending = state.builds.delete(&id)?;
    let status = wait(&state, pending).await?;
    Ok(Json(status))
}

/// Wait for a pending result, giving up after the configured request timeout.
async fn wait(state: &AppState, pending: AsyncResult) -> Result<Resource, ApiError> {
    let resource = tokio::time::timeout(state.request_timeout, pending)
        .await
        .map_err(|_| {
            ApiError::Timeout(format!(
                "no result within {}s",
                state.request_timeout.as_secs()
            ))
        })??;
    Ok(resource)
}
