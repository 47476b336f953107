// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_schedule_manager;

use crate::models::{AppointmentRequest, AppointmentStatus};
use crate::services::AppointmentService;

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(cliente_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let appointments = AppointmentService::new(&state)
        .list_for_patient(cliente_id, None)
        .await?;
    debug!("Returning {} appointments for patient {}", appointments.len(), cliente_id);

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(medico_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let appointments = AppointmentService::new(&state)
        .list_for_doctor(medico_id, None)
        .await?;
    debug!("Returning {} appointments for doctor {}", appointments.len(), medico_id);

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_next_patient_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(cliente_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentService::new(&state)
        .next_for_patient(cliente_id, None)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::NotFound(_) => AppError::NotFound("No upcoming appointment found".to_string()),
            other => other,
        })?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// BOOKING & UPDATES
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} booking template {}", user.id, request.template_id);

    let appointment = AppointmentService::new(&state)
        .book_appointment(request, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentService::new(&state)
        .update_appointment(appointment_id, request, &user, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

/// Doctors and admins accept pending appointments.
#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_schedule_manager(&user)?;

    let appointment = AppointmentService::new(&state)
        .update_status(appointment_id, AppointmentStatus::Confirmed, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

/// Either side of the appointment may cancel it.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentService::new(&state)
        .update_status(appointment_id, AppointmentStatus::Cancelled, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

/// Doctors and admins close out attended appointments.
#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_schedule_manager(&user)?;

    let appointment = AppointmentService::new(&state)
        .update_status(appointment_id, AppointmentStatus::Completed, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_schedule_manager(&user)?;

    AppointmentService::new(&state)
        .delete_appointment(appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "message": "Appointment deleted",
        "id": appointment_id
    })))
}
