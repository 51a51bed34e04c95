use utoipa::OpenApi;

use crate::api::handlers::{HealthEnvelope, ListUsersParams, UserEnvelope, UserListEnvelope};
use crate::envelope::{ErrorBody, Pagination, ResponseMeta};
use crate::errors::ErrorKey;
use crate::models::user::{CreateUserRequest, User};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Service Skeleton",
        version = "1.0.0",
        description = "Backend service skeleton. Every response uses one envelope: `success`, then `data` or `error`, then `meta`. Error codes are grouped in 1000-wide bands per category, and the correlation id is echoed in the `x-request-id` header.",
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::create_user,
        crate::api::handlers::get_user,
        crate::api::handlers::list_users,
    ),
    components(
        schemas(
            User,
            CreateUserRequest,
            ListUsersParams,
            UserEnvelope,
            UserListEnvelope,
            HealthEnvelope,
            ErrorBody,
            ResponseMeta,
            Pagination,
            ErrorKey,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User endpoints"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/"));
        assert!(paths.iter().any(|p| p.as_str() == "/users"));
        assert!(paths.iter().any(|p| p.as_str() == "/users/{id}"));
    }
}
