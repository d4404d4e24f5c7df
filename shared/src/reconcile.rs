//! Reconciliation planning: the pure decision step of drift repair
//!
//! Three views of one product's stock must agree: the ledger fold, the lot
//! sum, and the cached aggregate counter. The ledger is canonical. When the
//! aggregate disagrees it is set back to the ledger balance via a single
//! appended adjustment; when the lots disagree the drift is reported but
//! the lot store is left alone; only concrete movements rebuild it.

use serde::Serialize;

/// The three observed views of a product's stock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockViews {
    pub ledger_balance: i64,
    /// `None` for products that do not track expiration
    pub lot_sum: Option<i64>,
    /// The cached aggregate counter
    pub stock: i64,
}

/// Which derived view disagrees with the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// Cached aggregate disagrees; repaired by an appended adjustment
    Aggregate,
    /// Lot sum disagrees; logged only, never rewritten blindly
    Lots,
}

impl DriftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftKind::Aggregate => "aggregate",
            DriftKind::Lots => "lots",
        }
    }
}

/// Outcome of comparing the three views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub drifts: Vec<DriftKind>,
    /// Signed delta of the adjustment entry that repairs the aggregate,
    /// when it needs repair
    pub adjustment: Option<i64>,
    /// What the aggregate must equal afterwards (the ledger balance)
    pub corrected_stock: i64,
}

impl ReconcilePlan {
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty()
    }
}

/// Compare the three views and decide the repair.
///
/// Idempotent by construction: once `stock == ledger_balance` no further
/// adjustment is ever proposed.
pub fn plan_reconciliation(views: StockViews) -> ReconcilePlan {
    let mut drifts = Vec::new();

    if let Some(lot_sum) = views.lot_sum {
        if lot_sum != views.ledger_balance {
            drifts.push(DriftKind::Lots);
        }
    }

    let adjustment = if views.stock != views.ledger_balance {
        drifts.push(DriftKind::Aggregate);
        Some(views.ledger_balance - views.stock)
    } else {
        None
    };

    ReconcilePlan {
        drifts,
        adjustment,
        corrected_stock: views.ledger_balance,
    }
}
