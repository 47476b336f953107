// libs/schedule-cell/tests/slot_generator_test.rs

use async_trait::async_trait;
use assert_matches::assert_matches;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::json;

use schedule_cell::models::{EnrichedTemplate, EnrichedTemplateRow, ReservedSlot, ScheduleError};
use schedule_cell::services::slots::MAX_WINDOW_DAYS;
use schedule_cell::services::{
    slot_key, DayOfWeekConvention, ReservationStore, SlotGenerator, TemplateStore,
};

// ==============================================================================
// IN-MEMORY STORES
// ==============================================================================

struct InMemoryTemplates(Vec<EnrichedTemplate>);

#[async_trait]
impl TemplateStore for InMemoryTemplates {
    async fn list_enriched_templates(&self) -> Result<Vec<EnrichedTemplate>, ScheduleError> {
        Ok(self.0.clone())
    }
}

/// Holds every reservation and filters like the real store does.
struct InMemoryReservations(Vec<(i64, NaiveDateTime, &'static str)>);

#[async_trait]
impl ReservationStore for InMemoryReservations {
    async fn list_active_future_reservations(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<ReservedSlot>, ScheduleError> {
        Ok(self.0.iter()
            .filter(|(_, at, status)| *at > now && matches!(*status, "pendiente" | "confirmado"))
            .map(|(template_id, at, _)| ReservedSlot { template_id: *template_id, date_time: *at })
            .collect())
    }
}

struct UnreachableReservations;

#[async_trait]
impl ReservationStore for UnreachableReservations {
    async fn list_active_future_reservations(
        &self,
        _now: NaiveDateTime,
    ) -> Result<Vec<ReservedSlot>, ScheduleError> {
        Err(ScheduleError::UpstreamUnavailable("connection refused".to_string()))
    }
}

// ==============================================================================
// FIXTURES
// ==============================================================================

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

fn template(id: i64, day_of_week: i16, hour: u32, minute: u32) -> EnrichedTemplate {
    EnrichedTemplate {
        template_id: id,
        day_of_week,
        start_time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
        doctor_name: "Ana".to_string(),
        doctor_surname: "Pérez".to_string(),
        specialty: "Cardiología".to_string(),
        room_number: "101".to_string(),
    }
}

fn weekly_templates() -> Vec<EnrichedTemplate> {
    vec![
        template(1, 1, 9, 0),
        template(2, 3, 14, 30),
        template(3, 0, 10, 0),
        template(4, 6, 8, 0),
        template(5, 3, 7, 0),
    ]
}

/// 2024-01-10 is a Wednesday.
fn wednesday_morning() -> NaiveDateTime {
    at(2024, 1, 10, 8, 0)
}

fn generator(
    templates: Vec<EnrichedTemplate>,
    reservations: Vec<(i64, NaiveDateTime, &'static str)>,
) -> SlotGenerator<InMemoryTemplates, InMemoryReservations> {
    SlotGenerator::new(InMemoryTemplates(templates), InMemoryReservations(reservations))
}

// ==============================================================================
// SCENARIOS
// ==============================================================================

#[tokio::test]
async fn test_first_monday_slot_for_monday_template() {
    let generator = generator(vec![template(1, 1, 9, 0)], vec![]);

    let slots = generator.generate_available_slots_at(14, wednesday_morning()).await.unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].date_time, at(2024, 1, 15, 9, 0));
    assert_eq!(slots[0].id, "1-2024-01-15T09:00:00");
    assert_eq!(slots[0].time, "09:00");
    assert_eq!(slots[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    assert_eq!(slots[0].professional_full_name, "Ana Pérez");
    assert_eq!(slots[0].room_number, "101");
    assert_eq!(slots[1].date_time, at(2024, 1, 22, 9, 0));
}

#[tokio::test]
async fn test_confirmed_reservation_removes_exact_slot() {
    let generator = generator(
        vec![template(1, 1, 9, 0)],
        vec![(1, at(2024, 1, 15, 9, 0), "confirmado")],
    );

    let slots = generator.generate_available_slots_at(14, wednesday_morning()).await.unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].date_time, at(2024, 1, 22, 9, 0));
}

#[tokio::test]
async fn test_inactive_reservations_do_not_block() {
    let generator = generator(
        vec![template(1, 1, 9, 0)],
        vec![
            (1, at(2024, 1, 15, 9, 0), "cancelado"),
            (1, at(2024, 1, 22, 9, 0), "completado"),
        ],
    );

    let slots = generator.generate_available_slots_at(14, wednesday_morning()).await.unwrap();
    assert_eq!(slots.len(), 2);
}

#[tokio::test]
async fn test_reservation_match_is_exact_not_ranged() {
    let generator = generator(
        vec![template(1, 1, 9, 0), template(2, 1, 9, 0)],
        vec![
            // Same template, five minutes off
            (1, at(2024, 1, 15, 9, 5), "pendiente"),
            // Same instant, other template
            (2, at(2024, 1, 22, 9, 0), "pendiente"),
        ],
    );

    let slots = generator.generate_available_slots_at(14, wednesday_morning()).await.unwrap();
    let keys: Vec<&str> = slots.iter().map(|s| s.id.as_str()).collect();

    assert_eq!(keys, vec![
        "1-2024-01-15T09:00:00",
        "2-2024-01-15T09:00:00",
        "1-2024-01-22T09:00:00",
    ]);
}

#[tokio::test]
async fn test_out_of_range_start_time_falls_back_without_aborting() {
    // 25 hours stored as elapsed seconds
    let broken: EnrichedTemplateRow = serde_json::from_value(json!({
        "id": 7,
        "dia_semana": 3,
        "hora_inicio": 90000,
        "medicos": { "nombre": "Luis", "apellido": "Díaz", "especialidad": "Pediatría" },
        "consultorios": { "numero": "B2" }
    }))
    .unwrap();
    let broken = EnrichedTemplate::from(broken);
    assert_eq!(broken.start_time, NaiveTime::from_hms_opt(0, 0, 0).unwrap());

    let generator = generator(vec![broken, template(2, 3, 14, 30)], vec![]);
    let slots = generator.generate_available_slots_at(14, wednesday_morning()).await.unwrap();

    let keys: Vec<&str> = slots.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(keys, vec![
        // today's midnight fallback is already past
        "2-2024-01-10T14:30:00",
        "7-2024-01-17T00:00:00",
        "2-2024-01-17T14:30:00",
    ]);
}

#[tokio::test]
async fn test_empty_stores_yield_empty_result() {
    let slots = generator(vec![], vec![])
        .generate_available_slots_at(14, wednesday_morning())
        .await
        .unwrap();
    assert!(slots.is_empty());

    let slots = generator(vec![], vec![(1, at(2024, 1, 15, 9, 0), "pendiente")])
        .generate_available_slots_at(14, wednesday_morning())
        .await
        .unwrap();
    assert!(slots.is_empty());
}

#[tokio::test]
async fn test_non_positive_window_is_empty() {
    let generator = generator(weekly_templates(), vec![]);

    assert!(generator.generate_available_slots_at(0, wednesday_morning()).await.unwrap().is_empty());
    assert!(generator.generate_available_slots_at(-5, wednesday_morning()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_window_is_clamped() {
    let generator = generator(vec![template(1, 1, 9, 0)], vec![]);
    let now = wednesday_morning();

    let slots = generator.generate_available_slots_at(i64::MAX, now).await.unwrap();
    let horizon = now.date().checked_add_days(Days::new(MAX_WINDOW_DAYS as u64)).unwrap();

    assert!(!slots.is_empty());
    assert!(slots.iter().all(|slot| slot.date < horizon));
    assert_eq!(
        slots.len(),
        generator.generate_available_slots_at(MAX_WINDOW_DAYS, now).await.unwrap().len()
    );
}

#[tokio::test]
async fn test_store_failure_fails_whole_call() {
    let generator = SlotGenerator::new(InMemoryTemplates(weekly_templates()), UnreachableReservations);

    let result = generator.generate_available_slots_at(14, wednesday_morning()).await;
    assert_matches!(result, Err(ScheduleError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn test_monday_zero_convention_shifts_matching() {
    // Under MondayZero, code 1 is Tuesday
    let generator = generator(vec![template(1, 1, 9, 0)], vec![])
        .with_convention(DayOfWeekConvention::MondayZero);

    let slots = generator.generate_available_slots_at(7, wednesday_morning()).await.unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].date_time, at(2024, 1, 16, 9, 0));
}

// ==============================================================================
// PROPERTIES
// ==============================================================================

#[tokio::test]
async fn test_generation_properties_hold() {
    let now = at(2024, 1, 10, 10, 15);
    let reservations = vec![
        (1, at(2024, 1, 15, 9, 0), "confirmado"),
        (2, at(2024, 1, 17, 14, 30), "pendiente"),
        (4, at(2024, 1, 13, 8, 0), "cancelado"),
    ];
    let generator = generator(weekly_templates(), reservations.clone());
    let templates = weekly_templates();
    let days = 21;

    let first = generator.generate_available_slots_at(days, now).await.unwrap();
    let second = generator.generate_available_slots_at(days, now).await.unwrap();

    // Determinism
    assert_eq!(first, second);
    assert!(!first.is_empty());

    let today = now.date();
    let last_day = today + chrono::Duration::days(days - 1);

    for slot in &first {
        // No past slots
        assert!(slot.date_time >= now, "{} is before now", slot.id);

        // Window bound
        assert!(slot.date >= today && slot.date <= last_day, "{} outside window", slot.id);

        // No reserved slots
        assert!(!reservations.iter().any(|(template_id, reserved_at, status)| {
            *template_id == slot.template_id
                && *reserved_at == slot.date_time
                && matches!(*status, "pendiente" | "confirmado")
        }), "{} is reserved", slot.id);

        // Day-of-week correctness under the (weekday + 1) % 7 remap
        let origin = templates.iter().find(|t| t.template_id == slot.template_id).unwrap();
        let remapped = (slot.date.weekday().num_days_from_monday() as i16 + 1) % 7;
        assert_eq!(remapped, origin.day_of_week);

        // Key stability
        assert_eq!(slot.id, slot_key(slot.template_id, &slot.date_time));
    }

    // Cancelled reservations leave their slot open
    assert!(first.iter().any(|s| s.id == "4-2024-01-13T08:00:00"));
    // Wednesday 07:00 is already past on day 0
    assert!(!first.iter().any(|s| s.id == "5-2024-01-10T07:00:00"));
    assert!(first.iter().any(|s| s.id == "5-2024-01-17T07:00:00"));
}

#[tokio::test]
async fn test_dates_are_non_decreasing() {
    let slots = generator(weekly_templates(), vec![])
        .generate_available_slots_at(28, wednesday_morning())
        .await
        .unwrap();

    assert!(slots.windows(2).all(|pair| pair[0].date <= pair[1].date));
}
