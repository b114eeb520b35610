pub mod activity_log;
pub mod booking;
pub mod customer;
pub mod vehicle;

pub use activity_log::{ActivityLogEntry, LogStatus};
pub use booking::{Booking, BookingStatus};
pub use customer::{Customer, CustomerRef, ImageRef};
pub use vehicle::{FleetSummary, Vehicle, VehicleRef, VehicleStatus};
