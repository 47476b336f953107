use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use shared_models::error::AppError;

use crate::services::store_adapter::{
    deserialize_lenient_datetime, deserialize_room_number, deserialize_wall_clock, fallback_time,
};

/// Reservation states that still hold their slot.
pub const ACTIVE_RESERVATION_STATUSES: [&str; 2] = ["pendiente", "confirmado"];

// ==============================================================================
// AVAILABILITY TEMPLATES (horarios_medicos)
// ==============================================================================

/// Weekly recurring availability of a doctor in a clinic room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityTemplate {
    pub id: i64,
    /// 0 = Sunday .. 6 = Saturday, see [`crate::services::calendar::DayOfWeekConvention`].
    #[serde(rename = "dia_semana")]
    pub day_of_week: i16,
    #[serde(rename = "hora_inicio", default = "fallback_time", deserialize_with = "deserialize_wall_clock")]
    pub start_time: NaiveTime,
    #[serde(rename = "hora_fin", default = "fallback_time", deserialize_with = "deserialize_wall_clock")]
    pub end_time: NaiveTime,
    #[serde(rename = "medicos_id")]
    pub doctor_id: i64,
    #[serde(rename = "consultorios_id")]
    pub room_id: i64,
}

/// Body of template create and full update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRequest {
    #[serde(rename = "dia_semana")]
    pub day_of_week: i16,
    #[serde(rename = "hora_inicio")]
    pub start_time: NaiveTime,
    #[serde(rename = "hora_fin")]
    pub end_time: NaiveTime,
    #[serde(rename = "medicos_id")]
    pub doctor_id: i64,
    #[serde(rename = "consultorios_id")]
    pub room_id: i64,
}

impl TemplateRequest {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !(0..=6).contains(&self.day_of_week) {
            return Err(ScheduleError::Validation(
                "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }

        if self.start_time >= self.end_time {
            return Err(ScheduleError::Validation("Start time must be before end time".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorSummary {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    #[serde(rename = "especialidad")]
    pub specialty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSummary {
    #[serde(rename = "numero", deserialize_with = "deserialize_room_number")]
    pub number: String,
}

/// Template row with its doctor and room embedded by PostgREST.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichedTemplateRow {
    pub id: i64,
    pub dia_semana: i16,
    #[serde(default = "fallback_time", deserialize_with = "deserialize_wall_clock")]
    pub hora_inicio: NaiveTime,
    pub medicos: DoctorSummary,
    pub consultorios: RoomSummary,
}

/// Template joined with the display data every generated slot carries.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTemplate {
    pub template_id: i64,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub doctor_name: String,
    pub doctor_surname: String,
    pub specialty: String,
    pub room_number: String,
}

impl From<EnrichedTemplateRow> for EnrichedTemplate {
    fn from(row: EnrichedTemplateRow) -> Self {
        Self {
            template_id: row.id,
            day_of_week: row.dia_semana,
            start_time: row.hora_inicio,
            doctor_name: row.medicos.name,
            doctor_surname: row.medicos.surname,
            specialty: row.medicos.specialty,
            room_number: row.consultorios.number,
        }
    }
}

impl EnrichedTemplate {
    pub fn professional_full_name(&self) -> String {
        format!("{} {}", self.doctor_name, self.doctor_surname).trim().to_string()
    }
}

// ==============================================================================
// RESERVATIONS & SLOTS
// ==============================================================================

/// The part of an active reservation the slot generator needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReservedSlot {
    #[serde(rename = "horarios_medicos_id")]
    pub template_id: i64,
    #[serde(rename = "fecha_hora", deserialize_with = "deserialize_lenient_datetime")]
    pub date_time: NaiveDateTime,
}

/// A bookable, computed slot. Never persisted; `id` is derived from
/// `(template_id, date_time)` and is stable across recomputations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub id: String,
    #[serde(rename = "horarios_medico_id")]
    pub template_id: i64,
    #[serde(rename = "fecha_hora")]
    pub date_time: NaiveDateTime,
    #[serde(rename = "fecha_turno")]
    pub date: NaiveDate,
    /// `HH:MM`
    #[serde(rename = "hora_turno")]
    pub time: String,
    #[serde(rename = "medico_nombre")]
    pub doctor_name: String,
    #[serde(rename = "medico_apellido")]
    pub doctor_surname: String,
    #[serde(rename = "especialidad")]
    pub specialty: String,
    #[serde(rename = "profesional_nombre_completo")]
    pub professional_full_name: String,
    #[serde(rename = "consultorio_numero")]
    pub room_number: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Schedule not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Store read or write failed; generation never returns partial results.
    #[error("Upstream data unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ScheduleError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        ScheduleError::UpstreamUnavailable(err.to_string())
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotFound(msg) => AppError::NotFound(msg),
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleError::UpstreamUnavailable(msg) => AppError::UpstreamUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(day: i16, start: (u32, u32), end: (u32, u32)) -> TemplateRequest {
        TemplateRequest {
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            doctor_id: 1,
            room_id: 2,
        }
    }

    #[test]
    fn test_template_request_validation() {
        assert!(request(1, (9, 0), (12, 0)).validate().is_ok());
        assert!(request(0, (9, 0), (9, 30)).validate().is_ok());
        assert!(matches!(request(7, (9, 0), (12, 0)).validate(), Err(ScheduleError::Validation(_))));
        assert!(matches!(request(-1, (9, 0), (12, 0)).validate(), Err(ScheduleError::Validation(_))));
        assert!(matches!(request(3, (12, 0), (9, 0)).validate(), Err(ScheduleError::Validation(_))));
        assert!(matches!(request(3, (9, 0), (9, 0)).validate(), Err(ScheduleError::Validation(_))));
    }

    #[test]
    fn test_template_request_uses_stored_column_names() {
        let body = serde_json::to_value(request(2, (8, 30), (11, 0))).unwrap();
        assert_eq!(body["dia_semana"], 2);
        assert_eq!(body["hora_inicio"], "08:30:00");
        assert_eq!(body["hora_fin"], "11:00:00");
        assert_eq!(body["medicos_id"], 1);
        assert_eq!(body["consultorios_id"], 2);
    }

    #[test]
    fn test_enriched_row_flattens() {
        let row: EnrichedTemplateRow = serde_json::from_value(json!({
            "id": 4,
            "dia_semana": 1,
            "hora_inicio": "09:00:00",
            "medicos": { "nombre": "Ana", "apellido": "Pérez ", "especialidad": "Clínica" },
            "consultorios": { "numero": 12 }
        }))
        .unwrap();

        let template = EnrichedTemplate::from(row);
        assert_eq!(template.template_id, 4);
        assert_eq!(template.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(template.room_number, "12");
        assert_eq!(template.professional_full_name(), "Ana Pérez");
    }

    #[test]
    fn test_slot_serializes_with_display_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let slot = AvailableSlot {
            id: "1-2024-01-15T09:00:00".to_string(),
            template_id: 1,
            date_time: date.and_hms_opt(9, 0, 0).unwrap(),
            date,
            time: "09:00".to_string(),
            doctor_name: "Ana".to_string(),
            doctor_surname: "Pérez".to_string(),
            specialty: "Clínica".to_string(),
            professional_full_name: "Ana Pérez".to_string(),
            room_number: "101".to_string(),
        };

        let value = serde_json::to_value(&slot).unwrap();
        assert_eq!(value["id"], "1-2024-01-15T09:00:00");
        assert_eq!(value["horarios_medico_id"], 1);
        assert_eq!(value["fecha_hora"], "2024-01-15T09:00:00");
        assert_eq!(value["fecha_turno"], "2024-01-15");
        assert_eq!(value["hora_turno"], "09:00");
        assert_eq!(value["consultorio_numero"], "101");
    }
}
