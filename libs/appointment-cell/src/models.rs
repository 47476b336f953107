// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use schedule_cell::models::{ScheduleError, ACTIVE_RESERVATION_STATUSES};
use schedule_cell::services::store_adapter::{deserialize_lenient_datetime, deserialize_room_number};
use shared_models::error::AppError;

// ==============================================================================
// APPOINTMENT STATUS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "confirmado")]
    Confirmed,
    #[serde(rename = "cancelado")]
    Cancelled,
    #[serde(rename = "completado")]
    Completed,
}

impl AppointmentStatus {
    /// Pending and confirmed appointments hold their slot.
    pub fn is_active(&self) -> bool {
        ACTIVE_RESERVATION_STATUSES.contains(&self.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pendiente",
            AppointmentStatus::Confirmed => "confirmado",
            AppointmentStatus::Cancelled => "cancelado",
            AppointmentStatus::Completed => "completado",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS (turnos)
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    #[serde(rename = "fecha_hora", deserialize_with = "deserialize_lenient_datetime")]
    pub date_time: NaiveDateTime,
    #[serde(rename = "estado")]
    pub status: AppointmentStatus,
    #[serde(rename = "motivo")]
    pub reason: String,
    #[serde(rename = "fecha_creacion", deserialize_with = "deserialize_lenient_datetime")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "clientes_id")]
    pub patient_id: i64,
    #[serde(rename = "horarios_medicos_id")]
    pub template_id: i64,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn pending() -> AppointmentStatus {
    AppointmentStatus::Pending
}

/// Body of booking and full update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRequest {
    #[serde(rename = "fecha_hora", deserialize_with = "deserialize_lenient_datetime")]
    pub date_time: NaiveDateTime,
    /// Ignored on booking: new appointments always start pending.
    #[serde(rename = "estado", default = "pending")]
    pub status: AppointmentStatus,
    #[serde(rename = "motivo")]
    pub reason: String,
    #[serde(rename = "fecha_creacion", default = "local_now", deserialize_with = "deserialize_lenient_datetime")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "clientes_id")]
    pub patient_id: i64,
    #[serde(rename = "horarios_medicos_id")]
    pub template_id: i64,
}

impl AppointmentRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.reason.trim().is_empty() {
            return Err(AppointmentError::ValidationError("Reason must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn into_appointment(self, id: i64) -> Appointment {
        Appointment {
            id,
            date_time: self.date_time,
            status: self.status,
            reason: self.reason,
            created_at: self.created_at,
            patient_id: self.patient_id,
            template_id: self.template_id,
        }
    }
}

// ==============================================================================
// ENRICHED APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorPublic {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    #[serde(rename = "especialidad")]
    pub specialty: String,
    #[serde(rename = "matricula")]
    pub license_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    #[serde(rename = "numero", deserialize_with = "deserialize_room_number")]
    pub number: String,
    #[serde(rename = "ubicacion")]
    pub location: String,
    #[serde(rename = "tipo")]
    pub kind: String,
}

/// Appointment joined with its doctor, room and patient name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(rename = "medico")]
    pub doctor: DoctorPublic,
    #[serde(rename = "consultorio")]
    pub room: Room,
    #[serde(rename = "cliente_nombre_completo")]
    pub patient_full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientName {
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "apellido")]
    pub surname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEmbed {
    pub medicos: DoctorPublic,
    pub consultorios: Room,
}

/// `turnos` row with PostgREST embeds; the patient embed is a left join.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentRow {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(default)]
    pub clientes: Option<PatientName>,
    pub horarios_medicos: ScheduleEmbed,
}

impl From<AppointmentRow> for AppointmentDetails {
    fn from(row: AppointmentRow) -> Self {
        let patient = row.clientes.unwrap_or_default();
        Self {
            appointment: row.appointment,
            doctor: row.horarios_medicos.medicos,
            room: row.horarios_medicos.consultorios,
            patient_full_name: patient_full_name(patient.name.as_deref(), patient.surname.as_deref()),
        }
    }
}

pub fn patient_full_name(name: Option<&str>, surname: Option<&str>) -> String {
    let full = format!("{} {}", name.unwrap_or_default(), surname.unwrap_or_default());
    let full = full.trim();
    if full.is_empty() {
        "N/A".to_string()
    } else {
        full.to_string()
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Schedule template not found: {0}")]
    TemplateNotFound(String),

    #[error("Appointment slot already taken")]
    SlotTaken,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Booking did not return an appointment id")]
    MissingId,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ScheduleError> for AppointmentError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotFound(msg) => AppointmentError::TemplateNotFound(msg),
            ScheduleError::Validation(msg) => AppointmentError::ValidationError(msg),
            ScheduleError::UpstreamUnavailable(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::TemplateNotFound(msg) => AppError::NotFound(msg),
            AppointmentError::SlotTaken => {
                AppError::Conflict("The requested slot is no longer available".to_string())
            }
            AppointmentError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidTime(msg) | AppointmentError::ValidationError(msg) => {
                AppError::ValidationError(msg)
            }
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::MissingId => AppError::BadRequest(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::UpstreamUnavailable(msg),
        }
    }
}
