//! Dispatch draft: items staged for an outgoing movement
//!
//! An explicit, short-lived value object passed through calls. Nothing here
//! touches ambient state; if a draft must survive across requests, give it
//! its own identity and storage.

use serde::{Deserialize, Serialize};

use crate::validation::{validate_barcode, validate_quantity};

/// One product staged for dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftItem {
    pub barcode: String,
    pub quantity: i64,
    /// SISCOM document number quoted on the delivery receipt
    pub siscom_number: Option<String>,
    pub note: Option<String>,
}

/// Items staged for one dispatch, plus the receipt destination
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchDraft {
    pub department: Option<String>,
    pub recipient: Option<String>,
    items: Vec<DraftItem>,
}

impl DispatchDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[DraftItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Stage an item. A product can appear only once per draft and the
    /// quantity must be strictly positive.
    pub fn add_item(&mut self, item: DraftItem) -> Result<(), &'static str> {
        validate_barcode(&item.barcode)?;
        validate_quantity(item.quantity)?;
        if self.items.iter().any(|i| i.barcode == item.barcode) {
            return Err("Product is already staged for dispatch");
        }
        self.items.push(item);
        Ok(())
    }

    /// Unstage a product; returns whether anything was removed
    pub fn remove_item(&mut self, barcode: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.barcode != barcode);
        self.items.len() != before
    }
}
