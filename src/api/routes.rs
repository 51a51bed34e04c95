use axum::{middleware, routing::get, Router};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{create_user, get_user, health, list_users, route_not_found, AppState};
use super::middleware::{correlation_stage, envelope_stage, lifecycle_stage, panic_to_failure};
use super::openapi::ApiDoc;

pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        // Health check / load balancer probe
        .route("/", get(health))
        // User endpoints
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user));

    let docs = SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi());

    apply_pipeline(routes, state, Some(docs.into()))
}

/// Wrap routes in the request lifecycle pipeline.
///
/// Layer order, outermost first: cors -> correlation -> envelope -> (routes only)
/// lifecycle -> catch-panic -> handler. `extra` is merged after the route
/// layers, so it gets correlation ids but no lifecycle logging.
pub fn apply_pipeline(
    routes: Router<AppState>,
    state: AppState,
    extra: Option<Router<AppState>>,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([state.config.http.correlation_header.clone()]);

    // Unknown paths and unsupported methods both answer RESOURCE_NOT_FOUND
    let mut router = routes
        .method_not_allowed_fallback(route_not_found)
        .fallback(route_not_found)
        .route_layer(CatchPanicLayer::custom(panic_to_failure))
        .route_layer(middleware::from_fn_with_state(state.clone(), lifecycle_stage));

    if let Some(extra) = extra {
        router = router.merge(extra);
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), envelope_stage))
        .layer(middleware::from_fn_with_state(state.clone(), correlation_stage))
        .layer(cors)
        .with_state(state)
}
