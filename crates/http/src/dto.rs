//! Request and response shapes for the JSON wire boundary.
//!
//! Entry values round-trip as plain JSON (spec §3: the dataset's only
//! recognized `content-type` is `application/json`) — the HTTP layer
//! serializes them to bytes on write and deserializes them back on read, so
//! `vkv-core`/`vkv-storage` only ever see opaque `Vec<u8>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use vkv_core::contract::LoadRow;
use vkv_core::types::VersionId;
use vkv_core::{Error, Result};

/// One row of the `(dataset, [{table,key,value}])` load shape.
#[derive(Debug, Deserialize)]
pub struct WireRow {
    pub table: String,
    pub key: String,
    pub value: Json,
}

/// One row of the `(dataset, table, [{key,value}])` load shape.
#[derive(Debug, Deserialize)]
pub struct WireKeyValue {
    pub key: String,
    pub value: Json,
}

/// One element of a batch `get-entries` request body.
#[derive(Debug, Deserialize)]
pub struct WireKey {
    pub key: String,
}

/// Optional body accepted by `POST /v1/versions/:id/discard`.
#[derive(Debug, Deserialize, Default)]
pub struct DiscardRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// `GET /v1/versions?dataset=…` query parameters.
#[derive(Debug, Deserialize)]
pub struct DatasetQuery {
    pub dataset: Option<String>,
}

/// The `?version-id=…` query parameter shared by every read/write route
/// that can target an explicit version.
#[derive(Debug, Deserialize)]
pub struct VersionIdQuery {
    #[serde(rename = "version-id")]
    pub version_id: Option<VersionId>,
}

/// Batch `get-entries` response body (spec §6): missing keys are omitted
/// from `data`, not nulled out.
#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub status: &'static str,
    #[serde(rename = "keys-found")]
    pub keys_found: Vec<String>,
    #[serde(rename = "keys-missing")]
    pub keys_missing: Vec<String>,
    pub data: BTreeMap<String, Json>,
}

/// `GET /healthcheck` response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: String,
}

fn encode_value(value: &Json) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::internal(format!("failed to encode entry value: {e}")))
}

fn decode_value(bytes: &[u8]) -> Result<Json> {
    serde_json::from_slice(bytes).map_err(|e| Error::internal(format!("failed to decode stored entry: {e}")))
}

/// Normalize the `[{table, key, value}…]` request body into `LoadRow`s.
pub fn rows_from_wire(rows: Vec<WireRow>) -> Result<Vec<LoadRow>> {
    rows.into_iter()
        .map(|row| {
            Ok(LoadRow {
                table: row.table,
                key: row.key,
                value: encode_value(&row.value)?,
            })
        })
        .collect()
}

/// Normalize the `[{key, value}…]` request body (one table implied by the
/// path) into `LoadRow`s.
pub fn rows_from_wire_table(table: &str, rows: Vec<WireKeyValue>) -> Result<Vec<LoadRow>> {
    rows.into_iter()
        .map(|row| {
            Ok(LoadRow {
                table: table.to_string(),
                key: row.key,
                value: encode_value(&row.value)?,
            })
        })
        .collect()
}

/// Decode a stored entry's bytes back into the JSON value the caller wrote.
pub fn entry_to_json(bytes: &[u8]) -> Result<Json> {
    decode_value(bytes)
}
