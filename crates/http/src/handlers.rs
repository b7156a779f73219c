//! Route handlers (spec §6). Every handler hands its work off to
//! `spawn_blocking` — the orchestrator's backends are synchronous, and this
//! is the one place in the core that talks to tokio at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value as Json_;
use vkv_engine::Orchestrator;

use vkv_core::contract::{CreateDatasetArgs, CreateVersionArgs};
use vkv_core::types::VersionId;
use vkv_core::{Error, Result as CoreResult};

use crate::dto::{
    entry_to_json, rows_from_wire, rows_from_wire_table, DatasetQuery, DiscardRequest, EntriesResponse,
    HealthResponse, VersionIdQuery, WireKey, WireKeyValue, WireRow,
};
use crate::error::ApiError;

pub type AppState = Arc<Orchestrator>;

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError),
        Err(join_err) => Err(ApiError(Error::internal(format!(
            "orchestrator task panicked: {join_err}"
        )))),
    }
}

pub async fn create_dataset(
    State(orch): State<AppState>,
    Json(args): Json<CreateDatasetArgs>,
) -> Result<Response, ApiError> {
    let dataset = run_blocking(move || orch.create_dataset(args)).await?;
    let location = format!("/v1/datasets/{}", dataset.name);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(dataset)).into_response())
}

pub async fn list_datasets(State(orch): State<AppState>) -> Result<Response, ApiError> {
    let datasets = run_blocking(move || orch.list_datasets()).await?;
    Ok(Json(datasets).into_response())
}

pub async fn get_dataset(State(orch): State<AppState>, Path(name): Path<String>) -> Result<Response, ApiError> {
    let dataset = run_blocking(move || orch.get_dataset(&name)).await?;
    match dataset {
        Some(dataset) => Ok(Json(dataset).into_response()),
        None => Err(ApiError(Error::not_found("unknown-dataset", "no such dataset"))),
    }
}

pub async fn create_version(
    State(orch): State<AppState>,
    Json(args): Json<CreateVersionArgs>,
) -> Result<Response, ApiError> {
    let version = run_blocking(move || orch.create_version(args)).await?;
    Ok((StatusCode::CREATED, Json(version)).into_response())
}

pub async fn list_versions(
    State(orch): State<AppState>,
    Query(query): Query<DatasetQuery>,
) -> Result<Response, ApiError> {
    let versions = run_blocking(move || match query.dataset {
        Some(dataset) => orch.list_versions_by_dataset(&dataset),
        None => orch.list_all_versions(),
    })
    .await?;
    Ok(Json(versions).into_response())
}

pub async fn get_version(State(orch): State<AppState>, Path(id): Path<VersionId>) -> Result<Response, ApiError> {
    let version = run_blocking(move || orch.get_version(id)).await?;
    match version {
        Some(version) => Ok(Json(version).into_response()),
        None => Err(ApiError(Error::not_found("unknown-version", "no such version"))),
    }
}

pub async fn save_version(State(orch): State<AppState>, Path(id): Path<VersionId>) -> Result<Response, ApiError> {
    let version = run_blocking(move || orch.save(id, None)).await?;
    Ok((StatusCode::ACCEPTED, Json(version)).into_response())
}

pub async fn publish_version(State(orch): State<AppState>, Path(id): Path<VersionId>) -> Result<Response, ApiError> {
    let version = run_blocking(move || orch.publish(id, None)).await?;
    Ok((StatusCode::ACCEPTED, Json(version)).into_response())
}

pub async fn discard_version(
    State(orch): State<AppState>,
    Path(id): Path<VersionId>,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    let reason = if body.is_empty() {
        None
    } else {
        let parsed: DiscardRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError(Error::validation("invalid-request-body", e.to_string())))?;
        parsed.reason
    };
    let audit = reason.map(|reason| {
        let mut m = BTreeMap::new();
        m.insert("reason".to_string(), Json_::from(reason));
        m
    });
    let version = run_blocking(move || orch.discard(id, audit)).await?;
    Ok((StatusCode::OK, Json(version)).into_response())
}

pub async fn load_entries_rows(
    State(orch): State<AppState>,
    Path(dataset): Path<String>,
    Query(query): Query<VersionIdQuery>,
    Json(wire_rows): Json<Vec<WireRow>>,
) -> Result<Response, ApiError> {
    let version_id = query
        .version_id
        .ok_or_else(|| ApiError(Error::validation("missing-version-id", "?version-id= is required")))?;
    let count = run_blocking(move || {
        let rows = rows_from_wire(wire_rows)?;
        let request = vkv_engine::LoadEntriesRequest::Rows {
            version_id,
            dataset,
            rows,
        };
        orch.load_entries(request)
    })
    .await?;
    Ok((StatusCode::OK, Json(serde_json::json!({"status": "ok", "rows-written": count}))).into_response())
}

pub async fn load_entries_table(
    State(orch): State<AppState>,
    Path((dataset, table)): Path<(String, String)>,
    Query(query): Query<VersionIdQuery>,
    Json(wire_rows): Json<Vec<WireKeyValue>>,
) -> Result<Response, ApiError> {
    let version_id = query
        .version_id
        .ok_or_else(|| ApiError(Error::validation("missing-version-id", "?version-id= is required")))?;
    let count = run_blocking(move || {
        let rows = rows_from_wire_table(&table, wire_rows)?;
        let request = vkv_engine::LoadEntriesRequest::Rows {
            version_id,
            dataset,
            rows,
        };
        orch.load_entries(request)
    })
    .await?;
    Ok((StatusCode::OK, Json(serde_json::json!({"status": "ok", "rows-written": count}))).into_response())
}

pub async fn get_entry(
    State(orch): State<AppState>,
    Path((dataset, table, key)): Path<(String, String, String)>,
    Query(query): Query<VersionIdQuery>,
) -> Result<Response, ApiError> {
    let version_id = query.version_id;
    let read = run_blocking(move || orch.get_entry(&dataset, &table, &key, version_id)).await?;
    let data = read
        .data
        .ok_or_else(|| ApiError(Error::not_found("unknown-key", "no such entry")))?;
    let value = entry_to_json(&data).map_err(ApiError)?;
    let mut response = Json(value).into_response();
    insert_version_headers(&mut response, read.active_version_id, read.version_id);
    Ok(response)
}

pub async fn get_entries(
    State(orch): State<AppState>,
    Path((dataset, table)): Path<(String, String)>,
    Query(query): Query<VersionIdQuery>,
    Json(wire_keys): Json<Vec<WireKey>>,
) -> Result<Response, ApiError> {
    let version_id = query.version_id;
    let requested: Vec<String> = wire_keys.into_iter().map(|k| k.key).collect();
    let read = run_blocking(move || orch.get_entries(&dataset, &table, version_id)).await?;

    let mut keys_found = Vec::new();
    let mut keys_missing = Vec::new();
    let mut data = BTreeMap::new();
    for key in requested {
        match read.data.get(&key) {
            Some(bytes) => {
                let value = entry_to_json(bytes).map_err(ApiError)?;
                keys_found.push(key.clone());
                data.insert(key, value);
            }
            None => keys_missing.push(key),
        }
    }

    let body = EntriesResponse {
        status: "ok",
        keys_found,
        keys_missing,
        data,
    };
    let mut response = Json(body).into_response();
    insert_version_headers(&mut response, read.active_version_id, read.version_id);
    Ok(response)
}

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "healthy".to_string(),
    })
}

pub async fn not_found() -> ApiError {
    ApiError(Error::not_found("route-not-found", "no such route"))
}

fn insert_version_headers(response: &mut Response, active_version_id: Option<VersionId>, version_id: VersionId) {
    let headers = response.headers_mut();
    if let Some(active) = active_version_id {
        if let Ok(value) = active.to_string().parse() {
            headers.insert("X-Active-Version-Id", value);
        }
    }
    if let Ok(value) = version_id.to_string().parse() {
        headers.insert("X-Version-Id", value);
    }
}
