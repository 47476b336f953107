use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// How `horarios_medicos.dia_semana` numbers the week.
///
/// The stored schedules use `SundayZero` (0 = Sunday .. 6 = Saturday), which
/// maps the Monday-based weekday index `w` to `(w + 1) % 7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayOfWeekConvention {
    #[default]
    SundayZero,
    MondayZero,
}

impl DayOfWeekConvention {
    /// Stored day code for `date` under this convention.
    pub fn code_for(self, date: NaiveDate) -> i16 {
        let from_monday = date.weekday().num_days_from_monday() as i16;
        match self {
            DayOfWeekConvention::SundayZero => (from_monday + 1) % 7,
            DayOfWeekConvention::MondayZero => from_monday,
        }
    }
}

/// ISO-8601 rendering used inside slot keys; sub-second digits only when non-zero.
pub fn iso_datetime(date_time: &NaiveDateTime) -> String {
    date_time.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Deterministic identity of a slot: `"{template_id}-{iso date-time}"`.
pub fn slot_key(template_id: i64, date_time: &NaiveDateTime) -> String {
    format!("{}-{}", template_id, iso_datetime(date_time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sunday_zero_codes() {
        let convention = DayOfWeekConvention::SundayZero;
        // 2024-01-14 is a Sunday
        assert_eq!(convention.code_for(date(2024, 1, 14)), 0);
        assert_eq!(convention.code_for(date(2024, 1, 15)), 1);
        assert_eq!(convention.code_for(date(2024, 1, 10)), 3);
        assert_eq!(convention.code_for(date(2024, 1, 20)), 6);
    }

    #[test]
    fn test_monday_zero_codes() {
        let convention = DayOfWeekConvention::MondayZero;
        assert_eq!(convention.code_for(date(2024, 1, 15)), 0);
        assert_eq!(convention.code_for(date(2024, 1, 14)), 6);
    }

    #[test]
    fn test_slot_key_is_stable() {
        let at = date(2024, 1, 15).and_hms_opt(9, 0, 0).unwrap();
        assert_eq!(slot_key(1, &at), "1-2024-01-15T09:00:00");
        assert_eq!(slot_key(1, &at), slot_key(1, &at.clone()));

        let with_millis = date(2024, 1, 15).and_hms_milli_opt(9, 0, 0, 250).unwrap();
        assert_eq!(slot_key(12, &with_millis), "12-2024-01-15T09:00:00.250");
        assert_ne!(slot_key(1, &at), slot_key(1, &with_millis));
    }
}
