use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::codes::{ErrorDefinition, ErrorKey};
use super::registry::{ErrorRegistry, RegistryError};

/// Field name to validation messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Structured payload attached to a domain failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Details {
    /// Per-field validation messages
    Fields(FieldErrors),
    /// Any other serializable payload
    Json(Value),
}

impl From<FieldErrors> for Details {
    fn from(fields: FieldErrors) -> Self {
        Self::Fields(fields)
    }
}

impl From<Value> for Details {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// An anticipated failure raised by handler code.
///
/// Code and status are copied from the key's definition when the value is built.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainFailure {
    key: ErrorKey,
    code: u32,
    status: u16,
    sub_code: Option<u16>,
    message: String,
    details: Option<Details>,
    user_friendly: bool,
}

impl DomainFailure {
    pub fn new(key: ErrorKey) -> Self {
        let def: &ErrorDefinition = key.definition();
        Self {
            key,
            code: def.code,
            status: def.http_status,
            sub_code: None,
            message: def.message.to_string(),
            details: None,
            user_friendly: def.user_friendly,
        }
    }

    /// Build from a textual key, failing when the registry does not know it
    pub fn from_name(registry: &ErrorRegistry, name: &str) -> Result<Self, RegistryError> {
        registry.lookup(name).map(Self::new)
    }

    /// Replace the default message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach a sub-code by name. Names unknown to this key are dropped.
    pub fn with_sub_code(mut self, name: &str) -> Self {
        self.sub_code = self.key.definition().sub_code(name);
        self
    }

    pub fn with_details(mut self, details: impl Into<Details>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn key(&self) -> ErrorKey {
        self.key
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn sub_code(&self) -> Option<u16> {
        self.sub_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    pub fn is_user_friendly(&self) -> bool {
        self.user_friendly
    }
}

impl From<ErrorKey> for DomainFailure {
    fn from(key: ErrorKey) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for DomainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_code {
            Some(sub_code) => write!(f, "[{}:{}] {}", self.key, sub_code, self.message),
            None => write!(f, "[{}] {}", self.key, self.message),
        }
    }
}

impl std::error::Error for DomainFailure {}

/// A failure nobody anticipated
#[derive(Debug, Clone, PartialEq)]
pub struct UnexpectedFailure {
    /// Top-level message, shown to callers outside production
    pub message: String,
    /// Full cause chain, kept for logs only
    pub diagnostic: String,
}

impl UnexpectedFailure {
    pub fn new(message: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diagnostic: diagnostic.into(),
        }
    }
}

/// Anything a handler can fail with
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    Domain(DomainFailure),
    Unexpected(UnexpectedFailure),
}

impl Failure {
    /// HTTP status the failure maps to
    pub fn status(&self) -> u16 {
        match self {
            Self::Domain(failure) => failure.status(),
            Self::Unexpected(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Domain(failure) => failure.message(),
            Self::Unexpected(failure) => &failure.message,
        }
    }

    /// Short type name used in log summaries
    pub fn name(&self) -> &'static str {
        match self {
            Self::Domain(_) => "DomainFailure",
            Self::Unexpected(_) => "UnexpectedFailure",
        }
    }
}

impl From<DomainFailure> for Failure {
    fn from(failure: DomainFailure) -> Self {
        Self::Domain(failure)
    }
}

impl From<ErrorKey> for Failure {
    fn from(key: ErrorKey) -> Self {
        Self::Domain(DomainFailure::new(key))
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Self::Unexpected(UnexpectedFailure::new(err.to_string(), format!("{err:?}")))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(failure) => failure.fmt(f),
            Self::Unexpected(failure) => f.write_str(&failure.message),
        }
    }
}

/// Response extension marking a failed handler outcome for the envelope stage
#[derive(Debug, Clone)]
pub struct FailureMarker(pub Arc<Failure>);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = status.into_response();
        response.extensions_mut().insert(FailureMarker(Arc::new(self)));
        response
    }
}

impl IntoResponse for DomainFailure {
    fn into_response(self) -> Response {
        Failure::from(self).into_response()
    }
}
