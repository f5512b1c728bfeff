use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Created exactly once per voided booking. The refund amount is captured
/// from the original payment at void time and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidRecord {
    pub booking_id: String,
    pub reason: String,
    pub refund_required: bool,
    pub refund_amount: Option<i64>,
    pub created_at: NaiveDateTime,
}
