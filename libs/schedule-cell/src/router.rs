use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_templates))
        .route("/disponibles", get(handlers::list_available_slots))
        .route("/por-medico/{medico_id}", get(handlers::list_templates_for_doctor))
        .route("/{id}", get(handlers::get_template));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_template))
        .route("/{id}", put(handlers::update_template).delete(handlers::delete_template))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
