pub mod calendar;
pub mod reservations;
pub mod slots;
pub mod store;
pub mod store_adapter;
pub mod template;

pub use calendar::{DayOfWeekConvention, slot_key};
pub use reservations::SupabaseReservationReader;
pub use slots::SlotGenerator;
pub use store::{ReservationStore, TemplateStore};
pub use template::TemplateService;
