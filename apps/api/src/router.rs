use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use schedule_cell::router::schedule_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Consultorio API is running!" }))
        .nest("/horarios-medicos", schedule_routes(state.clone()))
        .nest("/turnos", appointment_routes(state))
}
