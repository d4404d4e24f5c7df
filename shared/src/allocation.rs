//! FIFO-by-expiry allocation planning
//!
//! Decides which lots absorb an outgoing movement, always drawing from the
//! lot closest to expiring first so short-dated stock leaves the warehouse
//! before it spoils. The planner is pure: it reads a snapshot of the lots
//! and either returns a complete draw plan or nothing at all.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Planning failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("requested quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },
}

/// The slice of lot state the planner needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotSnapshot {
    pub lot_id: Uuid,
    pub lot_number: i64,
    pub expiration_date: NaiveDate,
    pub quantity: i64,
}

/// One draw against a single lot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotDraw {
    pub lot_id: Uuid,
    pub lot_number: i64,
    pub drawn: i64,
}

/// Plan an outgoing movement of `requested` units against the given lots.
///
/// Active lots are consumed in ascending `(expiration_date, lot_number)`
/// order; the lot number tie-break keeps the plan deterministic when two
/// lots share an expiration date. All-or-nothing: when the active quantity
/// cannot cover the request, no partial plan is produced and the caller's
/// lots stay untouched.
pub fn plan_fifo_allocation(
    lots: &[LotSnapshot],
    requested: i64,
) -> Result<Vec<LotDraw>, AllocationError> {
    if requested <= 0 {
        return Err(AllocationError::InvalidQuantity(requested));
    }

    let mut active: Vec<&LotSnapshot> = lots.iter().filter(|l| l.quantity > 0).collect();
    active.sort_by_key(|l| (l.expiration_date, l.lot_number));

    let available: i64 = active.iter().map(|l| l.quantity).sum();
    if available < requested {
        return Err(AllocationError::InsufficientStock {
            requested,
            available,
        });
    }

    let mut remaining = requested;
    let mut draws = Vec::new();
    for lot in active {
        if remaining == 0 {
            break;
        }
        let drawn = lot.quantity.min(remaining);
        draws.push(LotDraw {
            lot_id: lot.lot_id,
            lot_number: lot.lot_number,
            drawn,
        });
        remaining -= drawn;
    }

    Ok(draws)
}
