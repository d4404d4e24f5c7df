//! Ledger fold tests
//!
//! Covers:
//! - Signed deltas per entry kind
//! - The (recorded_at, id) total order and its tie-break
//! - balance_as_of cutoffs
//! - Replay round-trip: folding history reproduces the balance

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use shared::models::{
    balance_as_of, fold_balance, with_running_balance, LedgerEntry, LedgerEntryKind,
    MovementMetadata,
};

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn entry(id: i64, kind: LedgerEntryKind, quantity: i64, minutes: i64) -> LedgerEntry {
    LedgerEntry {
        id,
        product_id: Uuid::from_u128(1),
        kind,
        quantity,
        recorded_at: at(minutes),
        reason: None,
        metadata: MovementMetadata::default(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_signed_deltas() {
        assert_eq!(LedgerEntryKind::Incoming.signed_delta(10), 10);
        assert_eq!(LedgerEntryKind::Outgoing.signed_delta(10), -10);
        assert_eq!(LedgerEntryKind::Adjustment.signed_delta(-999), -999);
        assert_eq!(LedgerEntryKind::Adjustment.signed_delta(7), 7);
    }

    #[test]
    fn test_fold_balance() {
        let entries = vec![
            entry(1, LedgerEntryKind::Incoming, 50, 0),
            entry(2, LedgerEntryKind::Incoming, 30, 10),
            entry(3, LedgerEntryKind::Outgoing, 40, 20),
            entry(4, LedgerEntryKind::Adjustment, -5, 30),
        ];
        assert_eq!(fold_balance(&entries), 35);
    }

    #[test]
    fn test_fold_empty_ledger_is_zero() {
        assert_eq!(fold_balance(&[]), 0);
    }

    #[test]
    fn test_balance_as_of_cutoff() {
        let entries = vec![
            entry(1, LedgerEntryKind::Incoming, 50, 0),
            entry(2, LedgerEntryKind::Outgoing, 20, 10),
            entry(3, LedgerEntryKind::Incoming, 5, 20),
        ];
        assert_eq!(balance_as_of(&entries, at(-1)), 0);
        assert_eq!(balance_as_of(&entries, at(0)), 50);
        assert_eq!(balance_as_of(&entries, at(15)), 30);
        assert_eq!(balance_as_of(&entries, at(60)), 35);
    }

    #[test]
    fn test_running_balance() {
        let lines = with_running_balance(vec![
            entry(1, LedgerEntryKind::Incoming, 80, 0),
            entry(2, LedgerEntryKind::Outgoing, 40, 10),
            entry(3, LedgerEntryKind::Outgoing, 40, 20),
        ]);
        let balances: Vec<i64> = lines.iter().map(|l| l.balance).collect();
        assert_eq!(balances, vec![80, 40, 0]);
    }

    /// Entries sharing a timestamp fold in insertion order. Timestamp-only
    /// ordering left the running balances indeterminate.
    #[test]
    fn test_insertion_sequence_breaks_timestamp_ties() {
        let lines = with_running_balance(vec![
            entry(2, LedgerEntryKind::Outgoing, 30, 0),
            entry(1, LedgerEntryKind::Incoming, 30, 0),
        ]);
        assert_eq!(lines[0].entry.id, 1);
        let balances: Vec<i64> = lines.iter().map(|l| l.balance).collect();
        // Incoming first: the balance never dips below zero
        assert_eq!(balances, vec![30, 0]);
    }

    /// Reconciliation adjustments show on the stock card but do not move
    /// the balance: they record that the aggregate was reset to a ledger
    /// balance that already stands
    #[test]
    fn test_reconciliation_adjustments_do_not_move_the_balance() {
        let mut repair = entry(2, LedgerEntryKind::Adjustment, -999, 10);
        repair.reason = Some(shared::models::RECONCILIATION_REASON.to_string());

        let entries = vec![entry(1, LedgerEntryKind::Incoming, 40, 0), repair];
        assert_eq!(fold_balance(&entries), 40);

        let lines = with_running_balance(entries);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].balance, 40);
        assert_eq!(lines[1].balance, 40);

        // A manual adjustment with any other reason still counts
        let mut manual = entry(3, LedgerEntryKind::Adjustment, -5, 20);
        manual.reason = Some("physical count".to_string());
        assert_eq!(manual.signed_delta(), -5);
    }

    #[test]
    fn test_running_balance_sorts_out_of_order_input() {
        let lines = with_running_balance(vec![
            entry(3, LedgerEntryKind::Incoming, 5, 20),
            entry(1, LedgerEntryKind::Incoming, 50, 0),
            entry(2, LedgerEntryKind::Outgoing, 20, 10),
        ]);
        let ids: Vec<i64> = lines.iter().map(|l| l.entry.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(lines.last().unwrap().balance, 35);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn entries_strategy() -> impl Strategy<Value = Vec<LedgerEntry>> {
    prop::collection::vec(
        (0..3usize, 1i64..=500, -200i64..=200, 0i64..=1_000),
        0..40,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (kind, quantity, signed, minutes))| {
                let (kind, quantity) = match kind {
                    0 => (LedgerEntryKind::Incoming, quantity),
                    1 => (LedgerEntryKind::Outgoing, quantity),
                    _ => (
                        LedgerEntryKind::Adjustment,
                        if signed == 0 { 1 } else { signed },
                    ),
                };
                entry(i as i64 + 1, kind, quantity, minutes)
            })
            .collect()
    })
}

proptest! {
    /// Replay round-trip: the fold equals the last running balance
    #[test]
    fn prop_fold_matches_last_running_balance(entries in entries_strategy()) {
        let total = fold_balance(&entries);
        let lines = with_running_balance(entries);
        let last = lines.last().map_or(0, |l| l.balance);
        prop_assert_eq!(total, last);
    }

    /// Each running balance is the previous one plus the entry's delta
    #[test]
    fn prop_running_balance_is_cumulative(entries in entries_strategy()) {
        let lines = with_running_balance(entries);
        let mut previous = 0i64;
        for line in &lines {
            prop_assert_eq!(line.balance, previous + line.entry.signed_delta());
            previous = line.balance;
        }
    }

    /// A cutoff after every entry equals the full fold
    #[test]
    fn prop_balance_as_of_late_cutoff_is_full_balance(entries in entries_strategy()) {
        let cutoff = at(100_000);
        prop_assert_eq!(balance_as_of(&entries, cutoff), fold_balance(&entries));
    }
}
