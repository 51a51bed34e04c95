use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

use super::extract::{ValidJson, ValidPath, ValidQuery};
use crate::config::Config;
use crate::envelope::{ApiResult, ErrorBody, Paginated, Reply, ResponseEnvelopeTransformer, ResponseMeta};
use crate::errors::{DomainFailure, ErrorKey, ErrorRegistry, Failure, FailureTranslator, RegistryError};
use crate::logger::StructuredLogger;
use crate::models::user::{CreateUserRequest, User, UserDirectory};

pub type AppState = Arc<AppStateInner>;

/// Process-wide collaborators, built once at startup
pub struct AppStateInner {
    pub config: Config,
    pub registry: ErrorRegistry,
    pub logger: StructuredLogger,
    pub users: UserDirectory,
    pub started_at: Instant,
}

impl AppStateInner {
    /// Validates the error registry; a bad table stops startup
    pub fn new(config: Config, logger: StructuredLogger) -> Result<Self, RegistryError> {
        Ok(Self {
            registry: ErrorRegistry::load()?,
            config,
            logger,
            users: UserDirectory::new(),
            started_at: Instant::now(),
        })
    }

    pub fn failure_translator(&self) -> FailureTranslator<'_> {
        FailureTranslator::new(
            &self.registry,
            &self.logger,
            self.config.app.environment,
            &self.config.app.api_version,
        )
    }

    pub fn envelope_transformer(&self) -> ResponseEnvelopeTransformer<'_> {
        ResponseEnvelopeTransformer::new(self.config.app.environment, &self.config.app.api_version)
    }
}

// Concrete envelope types for OpenAPI generation
/// User response
#[derive(Debug, Serialize, ToSchema)]
pub struct UserEnvelope {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present if success is true)
    pub data: Option<User>,
    /// Error details (present if success is false)
    pub error: Option<ErrorBody>,
    pub meta: ResponseMeta,
}

/// Paginated user list response; pagination is in `meta`
#[derive(Debug, Serialize, ToSchema)]
pub struct UserListEnvelope {
    pub success: bool,
    pub data: Option<Vec<User>>,
    pub error: Option<ErrorBody>,
    pub meta: ResponseMeta,
}

/// Health response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthEnvelope {
    pub success: bool,
    #[schema(value_type = Object)]
    pub data: Option<Value>,
    pub meta: ResponseMeta,
}

/// User list query parameters
#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ListUsersParams {
    /// Page number (starts at 1)
    pub page: Option<u64>,
    /// Users per page (default: 10, max: 100)
    pub limit: Option<u64>,
}

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

/// Health check, also the load balancer probe target
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthEnvelope)
    )
)]
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(Reply::ok(json!({
        "status": "healthy",
        "service": state.config.app.name,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.app.environment,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    })))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserEnvelope),
        (status = 400, description = "Invalid input", body = UserEnvelope),
        (status = 409, description = "Name already taken", body = UserEnvelope)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateUserRequest>,
) -> ApiResult<User> {
    let user = state.users.create(request).await?;
    Ok(Reply::created(user))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "User UUID")
    ),
    responses(
        (status = 200, description = "User found", body = UserEnvelope),
        (status = 400, description = "Malformed id", body = UserEnvelope),
        (status = 404, description = "User not found", body = UserEnvelope)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<User> {
    let user = state.users.get(id).await?;
    Ok(Reply::ok(user))
}

/// List users page by page
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListUsersParams),
    responses(
        (status = 200, description = "One page of users", body = UserListEnvelope),
        (status = 400, description = "Invalid page or limit", body = UserListEnvelope)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<ListUsersParams>,
) -> ApiResult<Paginated<Vec<User>>> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    if page == 0 || limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(DomainFailure::new(ErrorKey::InvalidParam)
            .with_message(format!(
                "page must be at least 1 and limit between 1 and {MAX_PAGE_SIZE}"
            ))
            .with_details(json!({ "page": page, "limit": limit }))
            .into());
    }

    Ok(Reply::ok(state.users.list(page, limit).await))
}

/// Fallback for unknown routes
pub async fn route_not_found() -> Failure {
    ErrorKey::ResourceNotFound.into()
}
