// libs/appointment-cell/src/services/appointment.rs
use chrono::{Local, NaiveDateTime};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use schedule_cell::models::{AvailabilityTemplate, ACTIVE_RESERVATION_STATUSES};
use schedule_cell::services::calendar::iso_datetime;
use schedule_cell::services::{DayOfWeekConvention, TemplateService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentRequest, AppointmentRow,
    AppointmentStatus,
};
use crate::services::lifecycle::AppointmentLifecycleService;

const APPOINTMENTS_PATH: &str = "/rest/v1/turnos";
const BOOKING_FUNCTION: &str = "crear_turno";
const DETAILS_SELECT: &str = "id,fecha_hora,estado,motivo,fecha_creacion,clientes_id,horarios_medicos_id,\
clientes(nombre,apellido),\
horarios_medicos!inner(medicos!inner(id,nombre,apellido,especialidad,matricula),\
consultorios!inner(id,numero,ubicacion,tipo))";

pub struct AppointmentService {
    supabase: SupabaseClient,
    templates: TemplateService,
    lifecycle: AppointmentLifecycleService,
    convention: DayOfWeekConvention,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            templates: TemplateService::new(config),
            lifecycle: AppointmentLifecycleService::new(),
            convention: DayOfWeekConvention::default(),
        }
    }

    pub fn with_convention(mut self, convention: DayOfWeekConvention) -> Self {
        self.convention = convention;
        self
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    /// A patient's appointments, newest first.
    pub async fn list_for_patient(
        &self,
        patient_id: i64,
        auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        debug!("Fetching appointments for patient: {}", patient_id);

        let path = format!(
            "{}?select={}&clientes_id=eq.{}&order=fecha_hora.desc",
            APPOINTMENTS_PATH, DETAILS_SELECT, patient_id
        );
        self.fetch_details(&path, auth_token).await
    }

    /// A doctor's appointments across all of their templates, newest first.
    pub async fn list_for_doctor(
        &self,
        doctor_id: i64,
        auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        debug!("Fetching appointments for doctor: {}", doctor_id);

        let path = format!(
            "{}?select={}&horarios_medicos.medicos_id=eq.{}&order=fecha_hora.desc",
            APPOINTMENTS_PATH, DETAILS_SELECT, doctor_id
        );
        self.fetch_details(&path, auth_token).await
    }

    pub async fn next_for_patient(
        &self,
        patient_id: i64,
        auth_token: Option<&str>,
    ) -> Result<AppointmentDetails, AppointmentError> {
        self.next_for_patient_at(patient_id, auth_token, Local::now().naive_local()).await
    }

    /// Earliest active appointment strictly after `now`.
    pub async fn next_for_patient_at(
        &self,
        patient_id: i64,
        auth_token: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Fetching next appointment for patient {} after {}", patient_id, now);

        let path = format!(
            "{}?select={}&clientes_id=eq.{}&estado=in.({})&fecha_hora=gt.{}&order=fecha_hora.asc&limit=1",
            APPOINTMENTS_PATH,
            DETAILS_SELECT,
            patient_id,
            ACTIVE_RESERVATION_STATUSES.join(","),
            urlencoding::encode(&iso_datetime(&now)),
        );

        self.fetch_details(&path, auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn get_details(
        &self,
        appointment_id: i64,
        auth_token: Option<&str>,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let path = format!("{}?select={}&id=eq.{}", APPOINTMENTS_PATH, DETAILS_SELECT, appointment_id);

        self.fetch_details(&path, auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    // ==========================================================================
    // WRITES
    // ==========================================================================

    pub async fn book_appointment(
        &self,
        request: AppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.book_appointment_at(request, auth_token, Local::now().naive_local()).await
    }

    /// Books through `crear_turno`, which rejects a slot that is already held.
    pub async fn book_appointment_at(
        &self,
        mut request: AppointmentRequest,
        auth_token: &str,
        now: NaiveDateTime,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment for patient {} on template {} at {}",
            request.patient_id, request.template_id, request.date_time
        );
        request.validate()?;

        let template = self.templates.get_template(request.template_id).await?;
        self.validate_slot(&template, request.date_time, now)?;

        let args = json!({
            "p_cliente_id": request.patient_id,
            "p_horarios_medico_id": request.template_id,
            "p_fecha_hora": iso_datetime(&request.date_time),
            "p_motivo": request.reason,
        });

        let result: Value = self.supabase
            .rpc(BOOKING_FUNCTION, Some(auth_token), args)
            .await
            .map_err(map_write_error)?;

        let appointment_id = returned_id(&result).ok_or_else(|| {
            warn!("{} returned no appointment id: {}", BOOKING_FUNCTION, result);
            AppointmentError::MissingId
        })?;

        request.status = AppointmentStatus::Pending;
        info!("Appointment {} booked", appointment_id);
        Ok(request.into_appointment(appointment_id))
    }

    pub async fn update_appointment(
        &self,
        appointment_id: i64,
        request: AppointmentRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.update_appointment_at(appointment_id, request, actor, auth_token, Local::now().naive_local())
            .await
    }

    /// Full update. A status change follows the lifecycle and needs a schedule
    /// manager; moving to another instant must land on a free template occurrence.
    pub async fn update_appointment_at(
        &self,
        appointment_id: i64,
        request: AppointmentRequest,
        actor: &User,
        auth_token: &str,
        now: NaiveDateTime,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment: {}", appointment_id);
        request.validate()?;

        let current = self.current_appointment(appointment_id, auth_token).await?;

        if request.status != current.status {
            if !actor.can_manage_schedules() {
                warn!("User {} tried to set appointment {} to {}", actor.id, appointment_id, request.status);
                return Err(AppointmentError::Forbidden(
                    "Only doctors or administrators can change an appointment's status".to_string(),
                ));
            }
            self.lifecycle.validate_status_transition(current.status, request.status)?;
        }

        let moved = request.date_time != current.date_time || request.template_id != current.template_id;
        if moved {
            let template = self.templates.get_template(request.template_id).await?;
            self.validate_slot(&template, request.date_time, now)?;

            if request.status.is_active() {
                self.ensure_slot_free(appointment_id, request.template_id, request.date_time, auth_token)
                    .await?;
            }
        }

        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, appointment_id);
        let body = json!({
            "fecha_hora": iso_datetime(&request.date_time),
            "estado": request.status,
            "motivo": request.reason,
            "fecha_creacion": iso_datetime(&request.created_at),
            "clientes_id": request.patient_id,
            "horarios_medicos_id": request.template_id,
        });

        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(map_write_error)?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Moves an appointment to `new_status` and returns it enriched.
    pub async fn update_status(
        &self,
        appointment_id: i64,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Setting appointment {} to {}", appointment_id, new_status);

        let current = self.current_appointment(appointment_id, auth_token).await?.status;
        self.lifecycle.validate_status_transition(current, new_status)?;

        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, appointment_id);
        let updated: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({ "estado": new_status })),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(map_write_error)?;

        if updated.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} moved from {} to {}", appointment_id, current, new_status);
        self.get_details(appointment_id, Some(auth_token)).await
    }

    pub async fn delete_appointment(&self, appointment_id: i64, auth_token: &str) -> Result<(), AppointmentError> {
        debug!("Deleting appointment: {}", appointment_id);

        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, appointment_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(map_write_error)?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        Ok(())
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    /// The requested instant must be a future occurrence of the template's start time.
    fn validate_slot(
        &self,
        template: &AvailabilityTemplate,
        date_time: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<(), AppointmentError> {
        if date_time < now {
            return Err(AppointmentError::InvalidTime("Cannot book appointments in the past".to_string()));
        }

        if self.convention.code_for(date_time.date()) != template.day_of_week {
            return Err(AppointmentError::InvalidTime(format!(
                "Template {} does not run on {}",
                template.id,
                date_time.date()
            )));
        }

        if date_time.time() != template.start_time {
            return Err(AppointmentError::InvalidTime(format!(
                "Template {} starts at {}",
                template.id,
                template.start_time.format("%H:%M")
            )));
        }

        Ok(())
    }

    async fn current_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?select=*&id=eq.{}", APPOINTMENTS_PATH, appointment_id);
        let result: Vec<Appointment> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// No other active appointment may hold `(template_id, date_time)`.
    async fn ensure_slot_free(
        &self,
        appointment_id: i64,
        template_id: i64,
        date_time: NaiveDateTime,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let path = format!(
            "{}?select=id&horarios_medicos_id=eq.{}&fecha_hora=eq.{}&estado=in.({})&id=neq.{}",
            APPOINTMENTS_PATH,
            template_id,
            urlencoding::encode(&iso_datetime(&date_time)),
            ACTIVE_RESERVATION_STATUSES.join(","),
            appointment_id,
        );
        let holders: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if holders.is_empty() {
            Ok(())
        } else {
            Err(AppointmentError::SlotTaken)
        }
    }

    async fn fetch_details(
        &self,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let rows: Vec<AppointmentRow> = self.supabase
            .request(Method::GET, path, auth_token, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(AppointmentDetails::from).collect())
    }
}

/// `crear_turno` answers a bare id, a row, or a one-row array depending on its signature.
fn returned_id(result: &Value) -> Option<i64> {
    match result {
        Value::Number(n) => n.as_i64(),
        Value::Object(row) => row.get("id").and_then(Value::as_i64),
        Value::Array(rows) => rows.first().and_then(returned_id),
        _ => None,
    }
}

fn map_write_error(err: anyhow::Error) -> AppointmentError {
    let message = err.to_string();
    if message.starts_with("Conflict") {
        AppointmentError::SlotTaken
    } else {
        AppointmentError::DatabaseError(message)
    }
}
