//! Maps [`vkv_core::Error`] onto the wire error body (spec §7): `{status:
//! "error", message, ...context}`, with `error`/`missing-tables` context keys.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value as Json_;

/// Wraps a core error so it can be returned directly from an axum handler.
pub struct ApiError(pub vkv_core::Error);

impl From<vkv_core::Error> for ApiError {
    fn from(err: vkv_core::Error) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(flatten)]
    context: BTreeMap<String, Json_>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.kind().http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let detail = self.0.detail();
        let mut context = BTreeMap::new();
        if let Some(tag) = detail.tag {
            context.insert("error".to_string(), Json_::from(tag));
        }
        if !detail.missing_tables.is_empty() {
            let pairs: Vec<Json_> = detail
                .missing_tables
                .iter()
                .map(|(dataset, table)| serde_json::json!({"dataset": dataset, "table": table}))
                .collect();
            context.insert("missing-tables".to_string(), Json_::from(pairs));
        }
        let body = ErrorBody {
            status: "error",
            message: self.0.to_string(),
            context,
        };
        (status, Json(body)).into_response()
    }
}
