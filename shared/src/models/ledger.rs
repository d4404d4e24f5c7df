//! Ledger models and the balance fold
//!
//! The ledger is the append-only movement history of each product and the
//! single source of truth for how much stock exists. Lots and the cached
//! aggregate are derived views corrected from it, never the reverse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason carried by adjustments the reconciliation engine appends
pub const RECONCILIATION_REASON: &str = "reconciliation";

/// Kinds of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Incoming,
    Outgoing,
    Adjustment,
}

impl LedgerEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryKind::Incoming => "incoming",
            LedgerEntryKind::Outgoing => "outgoing",
            LedgerEntryKind::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "incoming" => Some(LedgerEntryKind::Incoming),
            "outgoing" => Some(LedgerEntryKind::Outgoing),
            "adjustment" => Some(LedgerEntryKind::Adjustment),
            _ => None,
        }
    }

    /// Signed contribution of an entry of this kind to the running balance.
    /// Adjustment quantities are stored already signed.
    pub fn signed_delta(&self, quantity: i64) -> i64 {
        match self {
            LedgerEntryKind::Incoming => quantity,
            LedgerEntryKind::Outgoing => -quantity,
            LedgerEntryKind::Adjustment => quantity,
        }
    }
}

impl std::fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form provenance carried by a movement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementMetadata {
    /// Supplier RUT (incoming movements)
    pub supplier_rut: Option<String>,
    pub dispatch_guide: Option<String>,
    pub invoice_number: Option<String>,
    pub purchase_order: Option<String>,
    /// Delivery receipt the movement is attached to (outgoing movements)
    pub delivery_receipt_id: Option<i64>,
    pub note: Option<String>,
}

/// An immutable ledger entry
///
/// Entries are append-only: corrections happen by appending an adjustment,
/// never by editing or deleting committed history. The `id` is the
/// insertion sequence and tie-breaks entries that share `recorded_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub product_id: Uuid,
    pub kind: LedgerEntryKind,
    /// Strictly positive for incoming/outgoing; signed for adjustments
    pub quantity: i64,
    pub recorded_at: DateTime<Utc>,
    /// Why an adjustment was appended (e.g., "reconciliation")
    pub reason: Option<String>,
    #[serde(flatten)]
    pub metadata: MovementMetadata,
}

impl LedgerEntry {
    /// Adjustments appended by the reconciliation engine document a repair
    /// of the cached aggregate
    pub fn is_reconciliation_adjustment(&self) -> bool {
        self.kind == LedgerEntryKind::Adjustment
            && self.reason.as_deref() == Some(RECONCILIATION_REASON)
    }

    /// Whether the entry moves the balance. Reconciliation adjustments do
    /// not: they record that the aggregate was reset to the ledger balance,
    /// which already stands; folding them in would re-create the very
    /// drift they repaired.
    pub fn counts_toward_balance(&self) -> bool {
        !self.is_reconciliation_adjustment()
    }

    /// Signed contribution to the running balance
    pub fn signed_delta(&self) -> i64 {
        if !self.counts_toward_balance() {
            return 0;
        }
        self.kind.signed_delta(self.quantity)
    }

    /// Total order over the ledger: timestamp first, insertion sequence as
    /// the tie-breaker
    pub fn sort_key(&self) -> (DateTime<Utc>, i64) {
        (self.recorded_at, self.id)
    }
}

/// One stock-card (bincard) row: the entry plus the balance after it
#[derive(Debug, Clone, Serialize)]
pub struct StockCardLine {
    pub entry: LedgerEntry,
    pub balance: i64,
}

/// Fold entries into the current balance.
///
/// Callers must pass entries in `(recorded_at, id)` order; the fold itself
/// is order-insensitive but the running balances derived from it are not.
pub fn fold_balance<'a, I>(entries: I) -> i64
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    entries.into_iter().map(LedgerEntry::signed_delta).sum()
}

/// Balance considering only entries recorded at or before `cutoff`.
/// Used to reconstruct historical stock cards.
pub fn balance_as_of<'a, I>(entries: I, cutoff: DateTime<Utc>) -> i64
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    entries
        .into_iter()
        .filter(|e| e.recorded_at <= cutoff)
        .map(LedgerEntry::signed_delta)
        .sum()
}

/// Attach the running balance to each entry, in ledger order
pub fn with_running_balance(mut entries: Vec<LedgerEntry>) -> Vec<StockCardLine> {
    entries.sort_by_key(LedgerEntry::sort_key);
    let mut balance = 0i64;
    entries
        .into_iter()
        .map(|entry| {
            balance += entry.signed_delta();
            StockCardLine { entry, balance }
        })
        .collect()
}
