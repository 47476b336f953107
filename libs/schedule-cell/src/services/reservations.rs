use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Method;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ReservedSlot, ScheduleError, ACTIVE_RESERVATION_STATUSES};
use crate::services::calendar::iso_datetime;
use crate::services::store::ReservationStore;

/// Read-only view of `turnos` for slot generation.
pub struct SupabaseReservationReader {
    supabase: SupabaseClient,
}

impl SupabaseReservationReader {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl ReservationStore for SupabaseReservationReader {
    async fn list_active_future_reservations(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<ReservedSlot>, ScheduleError> {
        let path = format!(
            "/rest/v1/turnos?select=horarios_medicos_id,fecha_hora&estado=in.({})&fecha_hora=gt.{}",
            ACTIVE_RESERVATION_STATUSES.join(","),
            urlencoding::encode(&iso_datetime(&now)),
        );
        debug!("Fetching active reservations after {}", now);

        self.supabase.request(Method::GET, &path, None, None).await.map_err(|e| {
            warn!("Failed to read active reservations: {}", e);
            ScheduleError::upstream(e)
        })
    }
}
