pub mod booking;
pub mod court;
pub mod notification;
pub mod payment;
pub mod revenue;
pub mod slot;
pub mod void_record;

pub use booking::{Booking, BookingStatus, BLOCKING_STATUSES};
pub use court::{Court, CourtStatus};
pub use notification::Notification;
pub use payment::{Payment, PaymentStatus};
pub use revenue::{PeriodTotals, RevenueEntry, RevenueKind};
pub use slot::TimeSlot;
pub use void_record::VoidRecord;
