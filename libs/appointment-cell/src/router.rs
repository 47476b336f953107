// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/cliente/{cliente_id}", get(handlers::list_patient_appointments))
        .route("/cliente/{cliente_id}/proximo", get(handlers::get_next_patient_appointment))
        .route("/medico/{medico_id}", get(handlers::list_doctor_appointments));

    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{id}", put(handlers::update_appointment).delete(handlers::delete_appointment))
        .route("/{id}/confirmar", put(handlers::confirm_appointment))
        .route("/{id}/cancelar", put(handlers::cancel_appointment))
        .route("/{id}/completar", put(handlers::complete_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
