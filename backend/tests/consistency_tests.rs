//! Stock consistency scenario tests
//!
//! Drives the pure core through the same sequence of steps the movement
//! and reconciliation services perform in SQL, checking the system-wide
//! invariants after every operation:
//! - ledger fold == aggregate stock
//! - lot sum == aggregate stock (tracking products)
//! - depleted products report NoActiveLots

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use shared::allocation::{plan_fifo_allocation, AllocationError, LotSnapshot};
use shared::models::{
    fold_balance, summarize_product, ExpirationThresholds, LedgerEntry, LedgerEntryKind, Lot,
    MovementMetadata, ProductExpirationStatus, RECONCILIATION_REASON,
};
use shared::reconcile::{plan_reconciliation, StockViews};

/// In-memory stand-in for one tracking product's persistent state
struct ProductState {
    product_id: Uuid,
    stock: i64,
    lots: Vec<Lot>,
    entries: Vec<LedgerEntry>,
    next_lot_number: i64,
    next_entry_id: i64,
    clock: DateTime<Utc>,
}

impl ProductState {
    fn new() -> Self {
        Self {
            product_id: Uuid::from_u128(7),
            stock: 0,
            lots: Vec::new(),
            entries: Vec::new(),
            next_lot_number: 1,
            next_entry_id: 1,
            clock: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        }
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::minutes(1);
        self.clock
    }

    fn append(&mut self, kind: LedgerEntryKind, quantity: i64, reason: Option<&str>) {
        let recorded_at = self.tick();
        self.entries.push(LedgerEntry {
            id: self.next_entry_id,
            product_id: self.product_id,
            kind,
            quantity,
            recorded_at,
            reason: reason.map(str::to_string),
            metadata: MovementMetadata::default(),
        });
        self.next_entry_id += 1;
    }

    /// registerIncoming: new lot + ledger entry + aggregate increment
    fn incoming(&mut self, quantity: i64, expiration_date: NaiveDate) {
        let received_at = self.tick();
        self.lots.push(Lot {
            id: Uuid::from_u128(self.next_lot_number as u128 + 100),
            product_id: self.product_id,
            lot_number: self.next_lot_number,
            expiration_date,
            quantity,
            received_at,
            exhausted_at: None,
        });
        self.next_lot_number += 1;
        self.append(LedgerEntryKind::Incoming, quantity, None);
        self.stock += quantity;
    }

    /// registerOutgoing: FIFO draws + ledger entry + aggregate decrement
    fn outgoing(&mut self, quantity: i64) -> Result<(), AllocationError> {
        let snapshots: Vec<LotSnapshot> = self
            .lots
            .iter()
            .map(|l| LotSnapshot {
                lot_id: l.id,
                lot_number: l.lot_number,
                expiration_date: l.expiration_date,
                quantity: l.quantity,
            })
            .collect();
        let draws = plan_fifo_allocation(&snapshots, quantity)?;

        for draw in &draws {
            let lot = self.lots.iter_mut().find(|l| l.id == draw.lot_id).unwrap();
            lot.quantity -= draw.drawn;
            if lot.quantity == 0 {
                lot.exhausted_at = Some(self.clock);
            }
        }
        self.append(LedgerEntryKind::Outgoing, quantity, None);
        self.stock -= quantity;
        Ok(())
    }

    /// reconcile: aggregate reset from the ledger plus one audit adjustment
    fn reconcile(&mut self) -> Option<i64> {
        let plan = plan_reconciliation(StockViews {
            ledger_balance: fold_balance(&self.entries),
            lot_sum: Some(self.lots.iter().map(|l| l.quantity).sum()),
            stock: self.stock,
        });
        if let Some(delta) = plan.adjustment {
            self.append(LedgerEntryKind::Adjustment, delta, Some(RECONCILIATION_REASON));
            self.stock = plan.corrected_stock;
        }
        plan.adjustment
    }

    fn lot_sum(&self) -> i64 {
        self.lots.iter().map(|l| l.quantity).sum()
    }

    fn assert_invariants(&self) {
        assert_eq!(
            fold_balance(&self.entries),
            self.stock,
            "ledger fold must equal the aggregate"
        );
        assert_eq!(
            self.lot_sum(),
            self.stock,
            "lot sum must equal the aggregate"
        );
    }

    fn status(&self) -> ProductExpirationStatus {
        summarize_product(
            true,
            &self.lots,
            self.clock.date_naive(),
            &ExpirationThresholds::default(),
        )
        .status
    }
}

fn day(days_out: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + Duration::days(days_out)
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// Two receipts, one partial dispatch, full depletion, and a rejected
    /// over-dispatch, with the invariants holding throughout
    #[test]
    fn test_dispatch_lifecycle() {
        let mut p = ProductState::new();

        p.incoming(50, day(30));
        p.incoming(30, day(60));
        p.assert_invariants();
        assert_eq!(p.stock, 80);

        // Draws the 30-day lot first
        p.outgoing(40).unwrap();
        p.assert_invariants();
        assert_eq!(p.lots[0].quantity, 10);
        assert_eq!(p.lots[1].quantity, 30);

        // Finishes lot 1, empties lot 2
        p.outgoing(40).unwrap();
        p.assert_invariants();
        assert_eq!(p.stock, 0);
        // Both lots retained with their exhaustion timestamps
        assert_eq!(p.lots.len(), 2);
        assert!(p.lots.iter().all(|l| l.quantity == 0 && l.exhausted_at.is_some()));
        assert_eq!(p.status(), ProductExpirationStatus::NoActiveLots);

        // Nothing left: rejected, nothing changes
        let err = p.outgoing(1).unwrap_err();
        assert_eq!(
            err,
            AllocationError::InsufficientStock {
                requested: 1,
                available: 0
            }
        );
        p.assert_invariants();
        assert_eq!(p.entries.len(), 4);
    }

    /// External corruption of the aggregate is healed by one adjustment
    /// and stays healed
    #[test]
    fn test_corruption_repair_round_trip() {
        let mut p = ProductState::new();
        p.incoming(20, day(45));
        p.outgoing(20).unwrap();
        p.assert_invariants();

        // Someone writes the aggregate directly
        p.stock = 999;

        let adjustment = p.reconcile();
        assert_eq!(adjustment, Some(-999));
        assert_eq!(p.stock, 0);
        p.assert_invariants();

        // Second run appends nothing
        assert_eq!(p.reconcile(), None);
        assert_eq!(
            p.entries
                .iter()
                .filter(|e| e.is_reconciliation_adjustment())
                .count(),
            1
        );
    }

    /// Depletion and restocking cycle: a product that went to zero is
    /// indistinguishable from a fresh one, then comes back to life
    #[test]
    fn test_restock_after_depletion() {
        let mut p = ProductState::new();
        p.incoming(10, day(5));
        p.outgoing(10).unwrap();
        assert_eq!(p.status(), ProductExpirationStatus::NoActiveLots);

        p.incoming(25, day(90));
        p.assert_invariants();
        assert_eq!(p.stock, 25);
        assert_eq!(p.status(), ProductExpirationStatus::Normal);
        // The exhausted lot is still there; the new one got the next number
        assert_eq!(p.lots.len(), 2);
        assert_eq!(p.lots[1].lot_number, 2);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Incoming { quantity: i64, days_out: i64 },
    Outgoing { quantity: i64 },
    Corrupt { stock: i64 },
    Reconcile,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            (1i64..=100, -10i64..=120).prop_map(|(quantity, days_out)| Op::Incoming {
                quantity,
                days_out
            }),
            (1i64..=120).prop_map(|quantity| Op::Outgoing { quantity }),
            (0i64..=500).prop_map(|stock| Op::Corrupt { stock }),
            Just(Op::Reconcile),
        ],
        1..30,
    )
}

proptest! {
    /// After any operation sequence ending in reconciliation, all three
    /// views agree and the ledger replays to the aggregate
    #[test]
    fn prop_views_agree_after_reconcile(ops in ops_strategy()) {
        let mut p = ProductState::new();
        for op in ops {
            match op {
                Op::Incoming { quantity, days_out } => p.incoming(quantity, day(days_out)),
                Op::Outgoing { quantity } => {
                    // Insufficient stock leaves no trace
                    let entries_before = p.entries.len();
                    if p.outgoing(quantity).is_err() {
                        prop_assert_eq!(p.entries.len(), entries_before);
                    }
                }
                Op::Corrupt { stock } => p.stock = stock,
                Op::Reconcile => {
                    p.reconcile();
                }
            }
        }

        p.reconcile();
        prop_assert_eq!(fold_balance(&p.entries), p.stock);
        prop_assert_eq!(p.lot_sum(), p.stock);

        // And a second pass appends nothing
        let entries = p.entries.len();
        p.reconcile();
        prop_assert_eq!(p.entries.len(), entries);
    }

    /// Without corruption, the invariants hold after every single step
    #[test]
    fn prop_movements_preserve_invariants(ops in ops_strategy()) {
        let mut p = ProductState::new();
        for op in ops {
            match op {
                Op::Incoming { quantity, days_out } => p.incoming(quantity, day(days_out)),
                Op::Outgoing { quantity } => {
                    let _ = p.outgoing(quantity);
                }
                _ => continue,
            }
            prop_assert_eq!(fold_balance(&p.entries), p.stock);
            prop_assert_eq!(p.lot_sum(), p.stock);
        }
    }
}
