use std::collections::HashSet;

use chrono::{Days, Local, NaiveDateTime};
use tracing::{debug, warn};

use crate::models::{AvailableSlot, EnrichedTemplate, ReservedSlot, ScheduleError};
use crate::services::calendar::{slot_key, DayOfWeekConvention};
use crate::services::store::{ReservationStore, TemplateStore};

/// Longest window a single generation walks; larger requests are clamped to it.
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Expands weekly templates into concrete bookable slots.
///
/// Only a template's start time produces a slot: one slot per template per
/// matching day, whatever the template's end time.
pub struct SlotGenerator<T, R> {
    templates: T,
    reservations: R,
    convention: DayOfWeekConvention,
}

impl<T, R> SlotGenerator<T, R>
where
    T: TemplateStore,
    R: ReservationStore,
{
    pub fn new(templates: T, reservations: R) -> Self {
        Self {
            templates,
            reservations,
            convention: DayOfWeekConvention::default(),
        }
    }

    pub fn with_convention(mut self, convention: DayOfWeekConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Slots for `[today, today + days_in_future)` as of the local wall clock.
    pub async fn generate_available_slots(
        &self,
        days_in_future: i64,
    ) -> Result<Vec<AvailableSlot>, ScheduleError> {
        self.generate_available_slots_at(days_in_future, Local::now().naive_local()).await
    }

    /// Same as [`Self::generate_available_slots`] with a fixed `now`.
    /// The window is clamped to [`MAX_WINDOW_DAYS`].
    pub async fn generate_available_slots_at(
        &self,
        days_in_future: i64,
        now: NaiveDateTime,
    ) -> Result<Vec<AvailableSlot>, ScheduleError> {
        let days_in_future = if days_in_future > MAX_WINDOW_DAYS {
            warn!("Window of {} days clamped to {}", days_in_future, MAX_WINDOW_DAYS);
            MAX_WINDOW_DAYS
        } else {
            days_in_future
        };

        if days_in_future <= 0 {
            debug!("Non-positive window ({} days), no slots to generate", days_in_future);
            return Ok(Vec::new());
        }

        let (templates, reserved) = tokio::try_join!(
            self.templates.list_enriched_templates(),
            self.reservations.list_active_future_reservations(now),
        )?;

        debug!(
            "Generating slots for {} days from {} templates and {} active reservations",
            days_in_future,
            templates.len(),
            reserved.len()
        );

        let reserved_keys = reservation_keys(&reserved);
        let slots = expand_slots(&templates, &reserved_keys, now, days_in_future, self.convention);

        debug!("Generated {} available slots", slots.len());
        Ok(slots)
    }
}

/// Lookup of reserved `(template, exact date-time)` pairs.
pub fn reservation_keys(reserved: &[ReservedSlot]) -> HashSet<String> {
    reserved
        .iter()
        .map(|r| slot_key(r.template_id, &r.date_time))
        .collect()
}

/// Pure expansion step. Output order is date ascending, then template order.
pub fn expand_slots(
    templates: &[EnrichedTemplate],
    reserved_keys: &HashSet<String>,
    now: NaiveDateTime,
    days_in_future: i64,
    convention: DayOfWeekConvention,
) -> Vec<AvailableSlot> {
    let mut available_slots = Vec::new();
    if days_in_future <= 0 {
        return available_slots;
    }

    let today = now.date();

    for offset in 0..days_in_future.min(MAX_WINDOW_DAYS) as u64 {
        let Some(current_date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        let day_code = convention.code_for(current_date);

        for template in templates.iter().filter(|t| t.day_of_week == day_code) {
            let slot_date_time = current_date.and_time(template.start_time);

            if slot_date_time < now {
                continue;
            }

            let key = slot_key(template.template_id, &slot_date_time);
            if reserved_keys.contains(&key) {
                continue;
            }

            available_slots.push(AvailableSlot {
                id: key,
                template_id: template.template_id,
                date_time: slot_date_time,
                date: current_date,
                time: template.start_time.format("%H:%M").to_string(),
                doctor_name: template.doctor_name.clone(),
                doctor_surname: template.doctor_surname.clone(),
                specialty: template.specialty.clone(),
                professional_full_name: template.professional_full_name(),
                room_number: template.room_number.clone(),
            });
        }
    }

    available_slots
}
