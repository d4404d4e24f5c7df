//! Product model: the cached aggregate view of stock

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A warehouse product
///
/// `stock` is a derived cache of the ledger balance. Only the movement
/// services and the reconciliation engine write it; the ledger remains
/// the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// Unique barcode / SKU (e.g., "100041")
    pub barcode: String,
    pub description: String,
    pub category: String,
    /// Supplier RUT recorded at registration
    pub supplier_rut: Option<String>,
    pub dispatch_guide: Option<String>,
    pub invoice_number: Option<String>,
    pub purchase_order: Option<String>,
    /// Whether incoming stock is split into expiration-dated lots
    pub tracks_expiration: bool,
    /// Cached aggregate stock, always the ledger balance outside an
    /// in-flight transaction
    pub stock: i64,
    /// Products are never deleted, only disabled
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.active && self.stock > 0
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description, self.barcode)
    }
}
