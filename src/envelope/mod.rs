//! The uniform response envelope returned for every request

pub mod reply;
pub mod transform;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::errors::codes::INTERNAL_ERROR_CODE;

pub use reply::{ApiResult, HandlerOutput, Paginated, Reply};
pub use transform::ResponseEnvelopeTransformer;

/// Message used when even the failure envelope cannot be produced
pub const RENDER_FAILED_MESSAGE: &str =
    "An unexpected error occurred while processing the error details";

/// Page position of a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// Error body of a failed envelope
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code
    pub code: u32,
    /// Human-readable message
    pub message: String,
    /// Refinement of `code`, scoped to the error key
    #[serde(rename = "subCode", skip_serializing_if = "Option::is_none")]
    pub sub_code: Option<u16>,
    /// Additional context, withheld in production unless user-friendly
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            sub_code: None,
            details: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ResponseMeta {
    /// Epoch milliseconds
    pub timestamp: i64,
    /// API version
    pub version: String,
    /// Request path, omitted in production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Pagination)]
    pub pagination: Option<Value>,
}

impl ResponseMeta {
    pub fn new(version: impl Into<String>, path: Option<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            version: version.into(),
            path,
            pagination: None,
        }
    }

    pub fn with_pagination(mut self, pagination: Option<Value>) -> Self {
        self.pagination = pagination;
        self
    }
}

/// `data` and `error` are mutually exclusive; the constructors are the only way in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    meta: ResponseMeta,
}

impl ResponseEnvelope {
    pub fn success(data: Option<Value>, meta: ResponseMeta) -> Self {
        Self {
            success: true,
            data,
            error: None,
            meta,
        }
    }

    pub fn failure(error: ErrorBody, meta: ResponseMeta) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            meta,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        self.error.as_ref()
    }

    pub fn meta(&self) -> &ResponseMeta {
        &self.meta
    }

    /// Serialize into an HTTP response.
    ///
    /// A serialization failure degrades to a fixed internal-error envelope.
    pub fn into_http(self, status: StatusCode) -> Response {
        match serde_json::to_vec(&self) {
            Ok(bytes) => json_response(status, bytes),
            Err(err) => {
                tracing::error!(error = %err, "Failed to serialize response envelope");
                fallback_response(&self.meta.version)
            }
        }
    }
}

fn json_response(status: StatusCode, bytes: Vec<u8>) -> Response {
    let mut response = (status, bytes).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Fixed internal-error envelope built without any fallible step
pub fn fallback_response(version: &str) -> Response {
    let body = json!({
        "success": false,
        "error": {
            "code": INTERNAL_ERROR_CODE,
            "message": RENDER_FAILED_MESSAGE,
        },
        "meta": {
            "timestamp": chrono::Utc::now().timestamp_millis(),
            "version": version,
        },
    });
    json_response(StatusCode::INTERNAL_SERVER_ERROR, body.to_string().into_bytes())
}
