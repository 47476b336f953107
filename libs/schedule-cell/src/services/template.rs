use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AvailabilityTemplate, EnrichedTemplate, EnrichedTemplateRow, ScheduleError, TemplateRequest,
};
use crate::services::store::TemplateStore;

const TEMPLATES_PATH: &str = "/rest/v1/horarios_medicos";
const ENRICHED_SELECT: &str =
    "id,dia_semana,hora_inicio,medicos!inner(nombre,apellido,especialidad),consultorios!inner(numero)";

/// CRUD over `horarios_medicos` plus the enriched read used for slot generation.
pub struct TemplateService {
    supabase: SupabaseClient,
}

impl TemplateService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_templates(&self) -> Result<Vec<AvailabilityTemplate>, ScheduleError> {
        debug!("Fetching all availability templates");

        let path = format!("{}?select=*&order=id.asc", TEMPLATES_PATH);
        self.fetch_templates(&path).await
    }

    pub async fn list_templates_for_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<AvailabilityTemplate>, ScheduleError> {
        debug!("Fetching availability templates for doctor: {}", doctor_id);

        let path = format!(
            "{}?medicos_id=eq.{}&order=dia_semana.asc,hora_inicio.asc",
            TEMPLATES_PATH, doctor_id
        );
        let templates = self.fetch_templates(&path).await?;

        if templates.is_empty() {
            return Err(ScheduleError::NotFound(format!("No templates for doctor {}", doctor_id)));
        }

        Ok(templates)
    }

    pub async fn get_template(&self, template_id: i64) -> Result<AvailabilityTemplate, ScheduleError> {
        let path = format!("{}?id=eq.{}", TEMPLATES_PATH, template_id);

        self.fetch_templates(&path)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::NotFound(format!("Template {} not found", template_id)))
    }

    pub async fn create_template(
        &self,
        request: TemplateRequest,
        auth_token: &str,
    ) -> Result<AvailabilityTemplate, ScheduleError> {
        debug!("Creating template for doctor {} on day {}", request.doctor_id, request.day_of_week);
        request.validate()?;

        let body = serde_json::to_value(&request).map_err(ScheduleError::upstream)?;
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            TEMPLATES_PATH,
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(ScheduleError::upstream)?;

        let template = first_template(result)?
            .ok_or_else(|| ScheduleError::upstream("Store returned no row for the created template"))?;

        debug!("Template created with ID: {}", template.id);
        Ok(template)
    }

    pub async fn update_template(
        &self,
        template_id: i64,
        request: TemplateRequest,
        auth_token: &str,
    ) -> Result<AvailabilityTemplate, ScheduleError> {
        debug!("Updating template: {}", template_id);
        request.validate()?;

        let path = format!("{}?id=eq.{}", TEMPLATES_PATH, template_id);
        let body = serde_json::to_value(&request).map_err(ScheduleError::upstream)?;
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(ScheduleError::upstream)?;

        first_template(result)?
            .ok_or_else(|| ScheduleError::NotFound(format!("Template {} not found", template_id)))
    }

    pub async fn delete_template(&self, template_id: i64, auth_token: &str) -> Result<(), ScheduleError> {
        debug!("Deleting template: {}", template_id);

        let path = format!("{}?id=eq.{}", TEMPLATES_PATH, template_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(ScheduleError::upstream)?;

        if result.is_empty() {
            return Err(ScheduleError::NotFound(format!("Template {} not found", template_id)));
        }

        Ok(())
    }

    async fn fetch_templates(&self, path: &str) -> Result<Vec<AvailabilityTemplate>, ScheduleError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            None,
            None,
        ).await.map_err(ScheduleError::upstream)?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityTemplate>, _>>()
            .map_err(ScheduleError::upstream)
    }
}

fn first_template(rows: Vec<Value>) -> Result<Option<AvailabilityTemplate>, ScheduleError> {
    rows.into_iter()
        .next()
        .map(serde_json::from_value)
        .transpose()
        .map_err(ScheduleError::upstream)
}

#[async_trait]
impl TemplateStore for TemplateService {
    async fn list_enriched_templates(&self) -> Result<Vec<EnrichedTemplate>, ScheduleError> {
        let path = format!("{}?select={}&order=id.asc", TEMPLATES_PATH, ENRICHED_SELECT);
        let rows: Vec<EnrichedTemplateRow> = self.supabase.request(
            Method::GET,
            &path,
            None,
            None,
        ).await.map_err(|e| {
            warn!("Failed to read availability templates: {}", e);
            ScheduleError::upstream(e)
        })?;

        Ok(rows.into_iter().map(EnrichedTemplate::from).collect())
    }
}
