use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use super::Pagination;
use crate::errors::{Failure, UnexpectedFailure};

/// Result type returned by every handler
pub type ApiResult<T> = Result<Reply<T>, Failure>;

/// Response extension holding a successful handler value for the envelope stage
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput(pub Value);

/// A successful handler value and the status to send it with
#[derive(Debug, Clone)]
pub struct Reply<T> {
    status: StatusCode,
    value: T,
}

impl<T> Reply<T> {
    pub fn ok(value: T) -> Self {
        Self::with_status(StatusCode::OK, value)
    }

    pub fn created(value: T) -> Self {
        Self::with_status(StatusCode::CREATED, value)
    }

    pub fn with_status(status: StatusCode, value: T) -> Self {
        Self { status, value }
    }
}

impl Reply<()> {
    /// Success without a payload; the envelope omits `data`
    pub fn empty() -> Self {
        Self::ok(())
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.value) {
            Ok(value) => {
                let mut response = self.status.into_response();
                response.extensions_mut().insert(HandlerOutput(value));
                response
            }
            Err(err) => Failure::Unexpected(UnexpectedFailure::new(
                "Failed to serialize handler result",
                err.to_string(),
            ))
            .into_response(),
        }
    }
}

/// A page of items; the envelope moves `pagination` into `meta`
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: T,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(data: T, pagination: Pagination) -> Self {
        Self { data, pagination }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureMarker;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_reply_stashes_value() {
        let response = Reply::created(json!({"id": 7})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.extensions().get::<HandlerOutput>(),
            Some(&HandlerOutput(json!({"id": 7})))
        );
    }

    #[test]
    fn test_empty_reply_is_null() {
        let response = Reply::empty().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.extensions().get::<HandlerOutput>(),
            Some(&HandlerOutput(Value::Null))
        );
    }

    #[test]
    fn test_unserializable_value_becomes_failure() {
        // Non-string map keys cannot become JSON object keys
        let mut value = HashMap::new();
        value.insert(vec![1u8], 1);

        let response = Reply::ok(value).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<FailureMarker>().is_some());
        assert!(response.extensions().get::<HandlerOutput>().is_none());
    }
}
