//! Lot model: an expiration-dated batch of received stock

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A batch of physical stock received together, sharing one expiration date
///
/// Every incoming movement of a tracking product opens a new lot; lots are
/// never merged and never deleted. A lot drawn down to zero stays on record
/// as the audit trail of what was received and when it ran out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Per-product monotonic sequence, assigned at receipt, never reused
    pub lot_number: i64,
    pub expiration_date: NaiveDate,
    /// Remaining units; decremented only by the allocator
    pub quantity: i64,
    pub received_at: DateTime<Utc>,
    /// Set when the allocator draws the lot down to exactly zero
    pub exhausted_at: Option<DateTime<Utc>>,
}

impl Lot {
    /// Active lots are the only ones eligible for allocation
    pub fn is_active(&self) -> bool {
        self.quantity > 0
    }
}

impl std::fmt::Display for Lot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Lot #{} ({} units, expires {})",
            self.lot_number, self.quantity, self.expiration_date
        )
    }
}
