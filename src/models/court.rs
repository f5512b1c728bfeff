use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Court {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub location: String,
    pub hourly_price: i64,
    pub status: CourtStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourtStatus {
    Active,
    Inactive,
    UnderMaintenance,
}

impl CourtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourtStatus::Active => "active",
            CourtStatus::Inactive => "inactive",
            CourtStatus::UnderMaintenance => "under_maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CourtStatus::Active),
            "inactive" => Some(CourtStatus::Inactive),
            "under_maintenance" => Some(CourtStatus::UnderMaintenance),
            _ => None,
        }
    }
}
