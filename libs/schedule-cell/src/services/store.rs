use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::models::{EnrichedTemplate, ReservedSlot, ScheduleError};

/// Read side of the availability template store.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Every template joined with its doctor's name, surname, specialty and its room number.
    async fn list_enriched_templates(&self) -> Result<Vec<EnrichedTemplate>, ScheduleError>;
}

/// Read side of the reservation store.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Pending or confirmed reservations strictly after `now`.
    async fn list_active_future_reservations(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<ReservedSlot>, ScheduleError>;
}
