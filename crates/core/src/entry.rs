use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::direction::Direction;
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Settled,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Pending => write!(f, "pending"),
            EntryStatus::Settled => write!(f, "settled"),
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EntryStatus::Pending),
            "settled" => Ok(EntryStatus::Settled),
            other => Err(format!("Unknown entry status: '{other}'")),
        }
    }
}

/// A committed ledger entry, ready for the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    /// `YYYY-MM-DD` as read from the statement. Not calendar-checked.
    pub date: String,
    pub amount: Money,
    pub direction: Direction,
    pub description: String,
    pub category: String,
    pub unit: Option<String>,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    /// Bank-assigned transaction reference, when the statement carried one.
    pub external_ref: Option<String>,
}

impl LedgerEntry {
    /// Positive for inflows, negative for outflows.
    pub fn signed_cents(&self) -> i64 {
        match self.direction {
            Direction::Inflow => self.amount.to_cents(),
            Direction::Outflow => -self.amount.to_cents(),
        }
    }
}
