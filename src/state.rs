use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::services::events::BookingChange;
use crate::services::payments::PaymentProvider;
use crate::services::qr::QrProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub payments: Box<dyn PaymentProvider>,
    pub qr: Box<dyn QrProvider>,
    /// Fan-out of booking changes to availability subscribers.
    pub changes_tx: broadcast::Sender<BookingChange>,
}
