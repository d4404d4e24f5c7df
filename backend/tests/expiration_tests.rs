//! Expiration classifier tests
//!
//! Covers:
//! - Band boundaries at 0, 7, 30 days and the configured overrides
//! - Product-level status from the soonest-expiring active lot
//! - Depleted products reporting NoActiveLots

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use shared::models::{
    classify_lot, days_until, summarize_product, ExpirationThresholds, Lot, LotExpirationStatus,
    ProductExpirationStatus,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

fn received() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
}

fn lot(number: i64, days_out: i64, quantity: i64) -> Lot {
    Lot {
        id: Uuid::from_u128(number as u128),
        product_id: Uuid::from_u128(42),
        lot_number: number,
        expiration_date: today() + Duration::days(days_out),
        quantity,
        received_at: received(),
        exhausted_at: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_days_until() {
        assert_eq!(days_until(today() + Duration::days(5), today()), 5);
        assert_eq!(days_until(today(), today()), 0);
        assert_eq!(days_until(today() - Duration::days(3), today()), -3);
    }

    #[test]
    fn test_lot_band_boundaries() {
        let t = ExpirationThresholds::default();
        let classify = |days| classify_lot(today() + Duration::days(days), today(), &t);

        assert_eq!(classify(-1), LotExpirationStatus::Expired);
        assert_eq!(classify(0), LotExpirationStatus::ExpiresToday);
        assert_eq!(classify(1), LotExpirationStatus::Critical);
        assert_eq!(classify(7), LotExpirationStatus::Critical);
        assert_eq!(classify(8), LotExpirationStatus::Caution);
        assert_eq!(classify(30), LotExpirationStatus::Caution);
        assert_eq!(classify(31), LotExpirationStatus::Normal);
    }

    /// The 7/30 bands are configuration, not constants
    #[test]
    fn test_custom_thresholds() {
        let t = ExpirationThresholds {
            critical_days: 3,
            caution_days: 10,
        };
        let classify = |days| classify_lot(today() + Duration::days(days), today(), &t);

        assert_eq!(classify(3), LotExpirationStatus::Critical);
        assert_eq!(classify(4), LotExpirationStatus::Caution);
        assert_eq!(classify(10), LotExpirationStatus::Caution);
        assert_eq!(classify(11), LotExpirationStatus::Normal);
    }

    #[test]
    fn test_product_without_tracking() {
        let summary = summarize_product(false, &[], today(), &ExpirationThresholds::default());
        assert_eq!(summary.status, ProductExpirationStatus::NoExpirationTracking);
        assert_eq!(summary.next_expiration_date, None);
        assert_eq!(summary.active_lot_count, 0);
    }

    /// Soonest-expiring active lot determines the product status
    #[test]
    fn test_product_status_follows_soonest_lot() {
        let lots = vec![lot(1, 40, 10), lot(2, 5, 3), lot(3, 90, 25)];
        let summary = summarize_product(true, &lots, today(), &ExpirationThresholds::default());

        assert_eq!(summary.status, ProductExpirationStatus::Critical);
        assert_eq!(summary.next_expiration_date, Some(today() + Duration::days(5)));
        assert_eq!(summary.days_remaining, Some(5));
        assert_eq!(summary.active_lot_count, 3);
    }

    /// Exhausted lots don't count, even when they expire soonest
    #[test]
    fn test_exhausted_lots_are_ignored() {
        let lots = vec![lot(1, 2, 0), lot(2, 60, 12)];
        let summary = summarize_product(true, &lots, today(), &ExpirationThresholds::default());

        assert_eq!(summary.status, ProductExpirationStatus::Normal);
        assert_eq!(summary.active_lot_count, 1);
        assert_eq!(summary.days_remaining, Some(60));
    }

    /// A fully depleted product looks exactly like one that never had stock
    #[test]
    fn test_depleted_product_reports_no_active_lots() {
        let depleted = vec![lot(1, 10, 0), lot(2, 20, 0)];
        let drained = summarize_product(true, &depleted, today(), &ExpirationThresholds::default());
        let empty = summarize_product(true, &[], today(), &ExpirationThresholds::default());

        assert_eq!(drained.status, ProductExpirationStatus::NoActiveLots);
        assert_eq!(drained.status, empty.status);
        assert_eq!(drained.next_expiration_date, empty.next_expiration_date);
        assert_eq!(drained.days_remaining, empty.days_remaining);
        assert_eq!(drained.active_lot_count, empty.active_lot_count);
    }

    #[test]
    fn test_expired_product_status() {
        let lots = vec![lot(1, -10, 4)];
        let summary = summarize_product(true, &lots, today(), &ExpirationThresholds::default());
        assert_eq!(summary.status, ProductExpirationStatus::Expired);
        assert_eq!(summary.days_remaining, Some(-10));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Classification is total and consistent with days_until
    #[test]
    fn prop_classification_matches_days(days in -1000i64..=1000) {
        let t = ExpirationThresholds::default();
        let status = classify_lot(today() + Duration::days(days), today(), &t);
        let expected = if days < 0 {
            LotExpirationStatus::Expired
        } else if days == 0 {
            LotExpirationStatus::ExpiresToday
        } else if days <= t.critical_days {
            LotExpirationStatus::Critical
        } else if days <= t.caution_days {
            LotExpirationStatus::Caution
        } else {
            LotExpirationStatus::Normal
        };
        prop_assert_eq!(status, expected);
    }

    /// Product summary always reports the minimum expiration of active lots
    #[test]
    fn prop_summary_reports_soonest_active(specs in prop::collection::vec((0i64..=50, -60i64..=120), 0..10)) {
        let lots: Vec<Lot> = specs
            .iter()
            .enumerate()
            .map(|(i, (quantity, days))| lot(i as i64 + 1, *days, *quantity))
            .collect();

        let summary = summarize_product(true, &lots, today(), &ExpirationThresholds::default());
        let soonest = lots
            .iter()
            .filter(|l| l.quantity > 0)
            .map(|l| l.expiration_date)
            .min();

        prop_assert_eq!(summary.next_expiration_date, soonest);
        match soonest {
            Some(_) => prop_assert!(summary.status != ProductExpirationStatus::NoActiveLots),
            None => prop_assert_eq!(summary.status, ProductExpirationStatus::NoActiveLots),
        }
    }
}
