use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_schedule_manager;

use crate::models::TemplateRequest;
use crate::services::{SlotGenerator, SupabaseReservationReader, TemplateService};

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    /// Forward window in days; the configured default applies when absent.
    pub days: Option<i64>,
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let days_in_future = query.days.unwrap_or(state.slot_window_days);

    if days_in_future > state.max_slot_window_days {
        return Err(AppError::ValidationError(format!(
            "days must not exceed {}",
            state.max_slot_window_days
        )));
    }

    let generator = SlotGenerator::new(
        TemplateService::new(&state),
        SupabaseReservationReader::new(&state),
    );

    let slots = generator.generate_available_slots(days_in_future).await?;
    debug!("Returning {} available slots for a {} day window", slots.len(), days_in_future);

    Ok(Json(json!(slots)))
}

#[axum::debug_handler]
pub async fn list_templates(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let templates = TemplateService::new(&state).list_templates().await?;
    Ok(Json(json!(templates)))
}

#[axum::debug_handler]
pub async fn list_templates_for_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(medico_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let templates = TemplateService::new(&state)
        .list_templates_for_doctor(medico_id)
        .await?;
    Ok(Json(json!(templates)))
}

#[axum::debug_handler]
pub async fn get_template(
    State(state): State<Arc<AppConfig>>,
    Path(template_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let template = TemplateService::new(&state).get_template(template_id).await?;
    Ok(Json(json!(template)))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_template(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<TemplateRequest>,
) -> Result<Json<Value>, AppError> {
    require_schedule_manager(&user)?;

    let template = TemplateService::new(&state)
        .create_template(request, auth.token())
        .await?;
    Ok(Json(json!(template)))
}

#[axum::debug_handler]
pub async fn update_template(
    State(state): State<Arc<AppConfig>>,
    Path(template_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<TemplateRequest>,
) -> Result<Json<Value>, AppError> {
    require_schedule_manager(&user)?;

    let template = TemplateService::new(&state)
        .update_template(template_id, request, auth.token())
        .await?;
    Ok(Json(json!(template)))
}

#[axum::debug_handler]
pub async fn delete_template(
    State(state): State<Arc<AppConfig>>,
    Path(template_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_schedule_manager(&user)?;

    TemplateService::new(&state)
        .delete_template(template_id, auth.token())
        .await?;
    Ok(Json(json!({
        "message": "Template deleted",
        "id": template_id
    })))
}
