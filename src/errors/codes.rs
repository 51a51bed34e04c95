use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Error categories. Each owns a 1000-wide band of numeric codes starting at its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    General,
    Auth,
    Validation,
    Resource,
    Business,
    External,
    Internal,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 7] = [
        Self::General,
        Self::Auth,
        Self::Validation,
        Self::Resource,
        Self::Business,
        Self::External,
        Self::Internal,
    ];

    /// First code of the category band
    pub const fn base(self) -> u32 {
        match self {
            Self::General => 1000,
            Self::Auth => 2000,
            Self::Validation => 3000,
            Self::Resource => 4000,
            Self::Business => 5000,
            Self::External => 6000,
            Self::Internal => 9000,
        }
    }

    /// Inclusive code range reserved for this category
    pub const fn band(self) -> (u32, u32) {
        (self.base(), self.base() + 999)
    }
}

/// Code reported for failures that carry no registry definition.
///
/// It is the internal category base, which no key is ever assigned.
pub const INTERNAL_ERROR_CODE: u32 = ErrorCategory::Internal.base();

/// Error keys for structured API responses.
///
/// Published codes are stable: never renumber an existing key, only append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKey {
    /// Authentication required
    Unauthorized,
    /// Authentication expired
    TokenExpired,
    /// Caller lacks permission
    Forbidden,

    /// Request body failed validation
    InvalidInput,
    /// Path or query parameter failed validation
    InvalidParam,

    /// Requested resource does not exist
    ResourceNotFound,
    /// Resource already exists
    DuplicateEntry,

    InsufficientFunds,
    PaymentFailed,
    OrderAlreadyProcessed,

    /// Upstream API failure
    ExternalApiError,
    /// Database failure
    DatabaseError,

    ServerError,
    ServiceUnavailable,
}

/// Registry entry for one [`ErrorKey`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDefinition {
    pub category: ErrorCategory,
    pub code: u32,
    pub http_status: u16,
    pub message: &'static str,
    /// Whether the failure translator logs occurrences of this key
    pub logging: bool,
    /// Whether failure details may be shown to callers in production
    pub user_friendly: bool,
    pub sub_codes: &'static [(&'static str, u16)],
}

impl ErrorDefinition {
    const fn new(category: ErrorCategory, ordinal: u32, http_status: u16, message: &'static str) -> Self {
        Self {
            category,
            code: category.base() + ordinal,
            http_status,
            message,
            logging: true,
            user_friendly: false,
            sub_codes: &[],
        }
    }

    const fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    const fn user_friendly(mut self) -> Self {
        self.user_friendly = true;
        self
    }

    const fn sub_codes(mut self, sub_codes: &'static [(&'static str, u16)]) -> Self {
        self.sub_codes = sub_codes;
        self
    }

    /// Resolve a sub-code name scoped to this definition
    pub fn sub_code(&self, name: &str) -> Option<u16> {
        self.sub_codes
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| *value)
    }
}

use ErrorCategory::{Auth, Business, External, Internal, Resource, Validation};

const UNAUTHORIZED: ErrorDefinition =
    ErrorDefinition::new(Auth, 1, 401, "Authentication is required")
        .logging(false)
        .user_friendly();
const TOKEN_EXPIRED: ErrorDefinition =
    ErrorDefinition::new(Auth, 2, 401, "Authentication has expired").user_friendly();
const FORBIDDEN: ErrorDefinition =
    ErrorDefinition::new(Auth, 3, 403, "Access is not permitted").user_friendly();

const INVALID_INPUT: ErrorDefinition =
    ErrorDefinition::new(Validation, 1, 400, "The input is not valid")
        .logging(false)
        .user_friendly();
const INVALID_PARAM: ErrorDefinition =
    ErrorDefinition::new(Validation, 2, 400, "The parameter is not valid")
        .logging(false)
        .user_friendly();

const RESOURCE_NOT_FOUND: ErrorDefinition =
    ErrorDefinition::new(Resource, 1, 404, "The requested resource was not found")
        .logging(false)
        .user_friendly();
const DUPLICATE_ENTRY: ErrorDefinition =
    ErrorDefinition::new(Resource, 2, 409, "The entry already exists").user_friendly();

const INSUFFICIENT_FUNDS: ErrorDefinition =
    ErrorDefinition::new(Business, 1, 400, "The balance is insufficient")
        .user_friendly()
        .sub_codes(&[
            ("BALANCE_ZERO", 1),
            ("BELOW_MINIMUM", 2),
            ("DAILY_LIMIT_EXCEEDED", 3),
            ("PENDING_TRANSACTIONS", 4),
        ]);
const PAYMENT_FAILED: ErrorDefinition =
    ErrorDefinition::new(Business, 2, 400, "The payment failed")
        .user_friendly()
        .sub_codes(&[
            ("CARD_DECLINED", 1),
            ("INVALID_CARD", 2),
            ("EXPIRED_CARD", 3),
            ("INSUFFICIENT_CARD_BALANCE", 4),
            ("PAYMENT_GATEWAY_ERROR", 5),
        ]);
const ORDER_ALREADY_PROCESSED: ErrorDefinition =
    ErrorDefinition::new(Business, 3, 400, "The order has already been processed")
        .logging(false)
        .user_friendly()
        .sub_codes(&[
            ("ALREADY_PAID", 1),
            ("ALREADY_SHIPPED", 2),
            ("ALREADY_CANCELLED", 3),
            ("ALREADY_REFUNDED", 4),
        ]);

const EXTERNAL_API_ERROR: ErrorDefinition = ErrorDefinition::new(
    External,
    1,
    502,
    "An error occurred while calling an external service",
);
const DATABASE_ERROR: ErrorDefinition =
    ErrorDefinition::new(External, 2, 500, "A database error occurred");

const SERVER_ERROR: ErrorDefinition =
    ErrorDefinition::new(Internal, 1, 500, "A server error occurred").user_friendly();
const SERVICE_UNAVAILABLE: ErrorDefinition =
    ErrorDefinition::new(Internal, 2, 503, "The service is temporarily unavailable")
        .user_friendly();

impl ErrorKey {
    pub const ALL: [ErrorKey; 14] = [
        Self::Unauthorized,
        Self::TokenExpired,
        Self::Forbidden,
        Self::InvalidInput,
        Self::InvalidParam,
        Self::ResourceNotFound,
        Self::DuplicateEntry,
        Self::InsufficientFunds,
        Self::PaymentFailed,
        Self::OrderAlreadyProcessed,
        Self::ExternalApiError,
        Self::DatabaseError,
        Self::ServerError,
        Self::ServiceUnavailable,
    ];

    /// Static definition for this key
    pub const fn definition(self) -> &'static ErrorDefinition {
        match self {
            Self::Unauthorized => &UNAUTHORIZED,
            Self::TokenExpired => &TOKEN_EXPIRED,
            Self::Forbidden => &FORBIDDEN,
            Self::InvalidInput => &INVALID_INPUT,
            Self::InvalidParam => &INVALID_PARAM,
            Self::ResourceNotFound => &RESOURCE_NOT_FOUND,
            Self::DuplicateEntry => &DUPLICATE_ENTRY,
            Self::InsufficientFunds => &INSUFFICIENT_FUNDS,
            Self::PaymentFailed => &PAYMENT_FAILED,
            Self::OrderAlreadyProcessed => &ORDER_ALREADY_PROCESSED,
            Self::ExternalApiError => &EXTERNAL_API_ERROR,
            Self::DatabaseError => &DATABASE_ERROR,
            Self::ServerError => &SERVER_ERROR,
            Self::ServiceUnavailable => &SERVICE_UNAVAILABLE,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidParam => "INVALID_PARAM",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::DuplicateEntry => "DUPLICATE_ENTRY",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::OrderAlreadyProcessed => "ORDER_ALREADY_PROCESSED",
            Self::ExternalApiError => "EXTERNAL_API_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ServerError => "SERVER_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or(())
    }
}
