//! A thin blocking HTTP client over a generic document-store REST API.
//!
//! This is the one concrete "remote" backend the system ships (spec's
//! Non-goal list: "Concrete backend implementations beyond their contract...
//! an in-memory reference and a remote document-store impl both suffice").
//! The wire format is a minimal document-store convention: `GET
//! /{collection}/{id}` returns the document or `404`; `PUT` writes it,
//! optionally guarded by an `If-Match: <cas>` header for optimistic
//! concurrency; `GET /{collection}?prefix=...` range-scans by secondary key.
//!
//! Uses `reqwest::blocking` rather than the async client: every caller of
//! this crate runs on a synchronous worker or orchestrator thread, and the
//! system's only async boundary is the HTTP adapter (`vkv-http`).

use serde::Deserialize;
use serde_json::Value as Json;
use std::time::Duration;
use vkv_core::{Error, Result};

/// One row of a prefix-query response: the document's id plus its body.
#[derive(Debug, Deserialize)]
struct QueryRow {
    id: String,
    doc: Json,
}

/// Connection details for a remote document-store backend.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the document-store API, e.g. `https://docs.example.internal`.
    pub endpoint: String,
    /// Logical region/partition identifier, sent as a header. Advisory only;
    /// an unreachable or unrecognized endpoint surfaces as `Internal`.
    pub region: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            endpoint: "http://localhost:8089".to_string(),
            region: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// A blocking client over the document-store wire protocol.
pub struct RemoteDocStoreClient {
    http: reqwest::blocking::Client,
    config: RemoteConfig,
}

impl RemoteDocStoreClient {
    /// Build a client. Construction never touches the network; connection
    /// failures surface lazily from the first request as `Internal`.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(RemoteDocStoreClient { http, config })
    }

    fn url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.config.endpoint, collection, id)
    }

    fn with_region(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.config.region {
            Some(region) => builder.header("X-Region", region.clone()),
            None => builder,
        }
    }

    /// Fetch one document. `Ok(None)` on a `404`.
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Json>> {
        let response = self
            .with_region(self.http.get(self.url(collection, id)))
            .send()
            .map_err(map_transport_error)?;
        match response.status().as_u16() {
            200 => {
                let body: Json = response
                    .json()
                    .map_err(|e| Error::internal(format!("malformed document body: {e}")))?;
                Ok(Some(body))
            }
            404 => Ok(None),
            429 => Err(Error::too_many_requests("document store is rate-limiting")),
            status => Err(Error::internal(format!(
                "document store returned unexpected status {status}"
            ))),
        }
    }

    /// Create `id` with `doc` if it does not already exist; `Conflict` if it does.
    pub fn create(&self, collection: &str, id: &str, doc: &Json) -> Result<()> {
        let response = self
            .with_region(self.http.put(self.url(collection, id)))
            .header("If-None-Match", "*")
            .json(doc)
            .send()
            .map_err(map_transport_error)?;
        match response.status().as_u16() {
            200 | 201 => Ok(()),
            409 => Err(Error::conflict(format!("{collection}/{id} already exists"))),
            429 => Err(Error::too_many_requests("document store is rate-limiting")),
            status => Err(Error::internal(format!(
                "document store returned unexpected status {status}"
            ))),
        }
    }

    /// Write `doc` to `id`, conditional on the document's current `cas`
    /// field equalling `expected_cas`. `Conflict` on mismatch.
    pub fn put_if_match(
        &self,
        collection: &str,
        id: &str,
        doc: &Json,
        expected_cas: u64,
    ) -> Result<()> {
        let response = self
            .with_region(self.http.put(self.url(collection, id)))
            .header("If-Match", expected_cas.to_string())
            .json(doc)
            .send()
            .map_err(map_transport_error)?;
        match response.status().as_u16() {
            200 | 204 => Ok(()),
            409 | 412 => Err(Error::conflict(format!(
                "cas mismatch writing {collection}/{id}"
            ))),
            429 => Err(Error::too_many_requests("document store is rate-limiting")),
            status => Err(Error::internal(format!(
                "document store returned unexpected status {status}"
            ))),
        }
    }

    /// Unconditional overwrite, used only where the caller already holds
    /// exclusive ownership (e.g. the KV store, which has no CAS semantics).
    pub fn put(&self, collection: &str, id: &str, doc: &Json) -> Result<()> {
        let response = self
            .with_region(self.http.put(self.url(collection, id)))
            .json(doc)
            .send()
            .map_err(map_transport_error)?;
        match response.status().as_u16() {
            200 | 201 | 204 => Ok(()),
            429 => Err(Error::too_many_requests("document store is rate-limiting")),
            status => Err(Error::internal(format!(
                "document store returned unexpected status {status}"
            ))),
        }
    }

    /// Range-scan a collection by secondary-key prefix (spec §4.3 "Storage
    /// hint for remote backend"), returning each matched document alongside
    /// the id it was stored under.
    pub fn query_prefix(&self, collection: &str, prefix: &str) -> Result<Vec<(String, Json)>> {
        let url = format!("{}/{}", self.config.endpoint, collection);
        let response = self
            .with_region(self.http.get(url))
            .query(&[("prefix", prefix)])
            .send()
            .map_err(map_transport_error)?;
        match response.status().as_u16() {
            200 => {
                let rows: Vec<QueryRow> = response
                    .json()
                    .map_err(|e| Error::internal(format!("malformed query body: {e}")))?;
                Ok(rows.into_iter().map(|row| (row.id, row.doc)).collect())
            }
            429 => Err(Error::too_many_requests("document store is rate-limiting")),
            status => Err(Error::internal(format!(
                "document store returned unexpected status {status}"
            ))),
        }
    }

    /// Delete every document in `collection` whose id starts with `prefix`.
    pub fn delete_prefix(&self, collection: &str, prefix: &str) -> Result<()> {
        let url = format!("{}/{}", self.config.endpoint, collection);
        let response = self
            .with_region(self.http.delete(url))
            .query(&[("prefix", prefix)])
            .send()
            .map_err(map_transport_error)?;
        match response.status().as_u16() {
            200 | 204 => Ok(()),
            429 => Err(Error::too_many_requests("document store is rate-limiting")),
            status => Err(Error::internal(format!(
                "document store returned unexpected status {status}"
            ))),
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> Error {
    // connection refused, DNS failure, TLS failure, unknown region/endpoint
    // all surface the same way: an uncategorized backend failure.
    Error::internal(format!("document store request failed: {e}"))
}
