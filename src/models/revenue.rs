use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Append-only revenue ledger row. A sale appends `+1 / +price`, a refunded
/// void appends `-1 / -price`. Period totals are always a fold over rows,
/// never a stored counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueEntry {
    pub id: i64,
    pub booking_id: String,
    pub kind: RevenueKind,
    pub count_delta: i64,
    pub amount_delta: i64,
    /// Year-month bucket, `YYYY-MM`.
    pub period: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RevenueKind {
    Sale,
    Refund,
}

impl RevenueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenueKind::Sale => "sale",
            RevenueKind::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(RevenueKind::Sale),
            "refund" => Some(RevenueKind::Refund),
            _ => None,
        }
    }
}

/// Read-time rollup of one period bucket.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodTotals {
    pub period: String,
    pub bookings: i64,
    pub amount: i64,
}
