pub mod api;
pub mod audit;
pub mod auth;
pub mod authz;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod quota;
pub mod services;
pub mod state;
pub mod tenancy;
pub mod types;

#[cfg(test)]
pub mod testing;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::tenancy::resolve_tenant;

/// Builds the full router. Every route, public ones included, runs behind
/// the tenant resolution pipeline.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health::get))
        .merge(auth_routes())
        .merge(tenant_routes())
        .merge(project_routes())
        .merge(task_routes())
        .route("/api/public/tenant", get(handlers::public::tenant))
        .route("/api/audit-logs", get(handlers::audit::list))
        .layer(axum::middleware::from_fn_with_state(
            state.resolver.clone(),
            resolve_tenant,
        ))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(CatchPanicLayer::new());

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config.security.cors_origins));
    }

    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    CorsLayer::permissive().allow_origin(allowed)
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
}

fn tenant_routes() -> Router<AppState> {
    use handlers::{tenants, users};

    Router::new()
        .route("/api/tenants", get(tenants::list))
        .route("/api/tenants/:id", get(tenants::get).put(tenants::update))
        .route("/api/tenants/:id/plan", put(tenants::change_plan))
        .route(
            "/api/tenants/:id/users",
            get(tenants::list_users).post(tenants::create_user),
        )
        .route("/api/users/:id", put(users::update).delete(users::delete))
}

fn project_routes() -> Router<AppState> {
    use handlers::projects;

    Router::new()
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/:id",
            get(projects::get)
                .put(projects::update)
                .delete(projects::delete),
        )
        .route(
            "/api/projects/:id/tasks",
            get(projects::list_tasks).post(projects::create_task),
        )
}

fn task_routes() -> Router<AppState> {
    use handlers::tasks;

    Router::new()
        .route("/api/tasks", get(tasks::list))
        .route("/api/tasks/:id", put(tasks::update).delete(tasks::delete))
        .route("/api/tasks/:id/status", patch(tasks::update_status))
}
