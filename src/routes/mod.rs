pub mod candidates;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::{
    cors::cors_layer,
    rate_limit::{self, ListBudget},
};
use crate::AppState;

pub fn router(state: AppState, config: &Config) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let list_api = Router::new()
        .route("/api/candidates", get(candidates::list_candidates))
        .layer(axum::middleware::from_fn_with_state(
            ListBudget::per_second(config.list_rps),
            rate_limit::limit_list_requests,
        ));

    let candidate_api = Router::new()
        .route("/api/candidates/:id/profile", get(candidates::get_profile))
        .route(
            "/api/candidates/:id/recordings",
            get(candidates::get_recordings),
        )
        .route(
            "/api/candidates/:id/certificates",
            get(candidates::list_certificates),
        )
        .route(
            "/api/candidates/:id/certificates/activate",
            post(candidates::activate_certificates_tab),
        )
        .route(
            "/api/candidates/:id/certificates/deactivate",
            post(candidates::deactivate_certificates_tab),
        );

    base_routes
        .merge(list_api)
        .merge(candidate_api)
        .with_state(state)
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
