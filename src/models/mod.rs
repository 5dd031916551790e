pub mod entity;
pub mod report;
pub mod retry;
pub mod tour;
pub mod window;

pub use entity::{Driver, Entity, EntityKind, Trailer, Vehicle};
pub use report::{DriverEcoMonitorReport, ReportKind, TruckActivityReport, Upsert};
pub use retry::{RetryQueueEntry, REASON_NO_DATA};
pub use tour::{Tour, TourKey, TourState};
pub use window::Window;
