pub mod availability;
pub mod booking;
pub mod events;
pub mod ledger;
pub mod notify;
pub mod payments;
pub mod qr;
