//! Expiration classification for lots and products
//!
//! Pure functions parameterized by "today" so reports, alerts and tests
//! all classify the same way regardless of when they run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Lot;

/// Day thresholds separating the freshness bands.
/// These are configuration, not constants; 7/30 are only the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationThresholds {
    /// Upper bound in days (inclusive) of the Critical band
    pub critical_days: i64,
    /// Upper bound in days (inclusive) of the Caution band
    pub caution_days: i64,
}

impl Default for ExpirationThresholds {
    fn default() -> Self {
        Self {
            critical_days: 7,
            caution_days: 30,
        }
    }
}

/// Freshness of a single lot as of a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotExpirationStatus {
    Expired,
    ExpiresToday,
    Critical,
    Caution,
    Normal,
}

impl std::fmt::Display for LotExpirationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotExpirationStatus::Expired => write!(f, "Expired"),
            LotExpirationStatus::ExpiresToday => write!(f, "Expires Today"),
            LotExpirationStatus::Critical => write!(f, "Critical"),
            LotExpirationStatus::Caution => write!(f, "Caution"),
            LotExpirationStatus::Normal => write!(f, "Normal"),
        }
    }
}

/// Product-level freshness: the soonest-expiring active lot wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductExpirationStatus {
    Expired,
    ExpiresToday,
    Critical,
    Caution,
    Normal,
    /// Tracks expiration but every lot is exhausted; indistinguishable
    /// from never having had stock
    NoActiveLots,
    /// The product does not track expiration at all
    NoExpirationTracking,
}

impl From<LotExpirationStatus> for ProductExpirationStatus {
    fn from(status: LotExpirationStatus) -> Self {
        match status {
            LotExpirationStatus::Expired => ProductExpirationStatus::Expired,
            LotExpirationStatus::ExpiresToday => ProductExpirationStatus::ExpiresToday,
            LotExpirationStatus::Critical => ProductExpirationStatus::Critical,
            LotExpirationStatus::Caution => ProductExpirationStatus::Caution,
            LotExpirationStatus::Normal => ProductExpirationStatus::Normal,
        }
    }
}

impl std::fmt::Display for ProductExpirationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductExpirationStatus::Expired => write!(f, "Expired"),
            ProductExpirationStatus::ExpiresToday => write!(f, "Expires Today"),
            ProductExpirationStatus::Critical => write!(f, "Critical"),
            ProductExpirationStatus::Caution => write!(f, "Caution"),
            ProductExpirationStatus::Normal => write!(f, "Normal"),
            ProductExpirationStatus::NoActiveLots => write!(f, "No Active Lots"),
            ProductExpirationStatus::NoExpirationTracking => write!(f, "No Expiration Tracking"),
        }
    }
}

/// Freshness summary for dashboards and alerting collaborators
#[derive(Debug, Clone, Serialize)]
pub struct ExpirationSummary {
    pub status: ProductExpirationStatus,
    pub next_expiration_date: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
    pub active_lot_count: i64,
}

/// Whole days until `expiration_date`; negative when already past
pub fn days_until(expiration_date: NaiveDate, today: NaiveDate) -> i64 {
    (expiration_date - today).num_days()
}

/// Classify one lot's freshness as of `today`
pub fn classify_lot(
    expiration_date: NaiveDate,
    today: NaiveDate,
    thresholds: &ExpirationThresholds,
) -> LotExpirationStatus {
    let days = days_until(expiration_date, today);
    if days < 0 {
        LotExpirationStatus::Expired
    } else if days == 0 {
        LotExpirationStatus::ExpiresToday
    } else if days <= thresholds.critical_days {
        LotExpirationStatus::Critical
    } else if days <= thresholds.caution_days {
        LotExpirationStatus::Caution
    } else {
        LotExpirationStatus::Normal
    }
}

/// Compute the product-level freshness summary from its lots.
///
/// Only active lots (quantity > 0) are considered; the one closest to
/// expiring determines the status.
pub fn summarize_product(
    tracks_expiration: bool,
    lots: &[Lot],
    today: NaiveDate,
    thresholds: &ExpirationThresholds,
) -> ExpirationSummary {
    if !tracks_expiration {
        return ExpirationSummary {
            status: ProductExpirationStatus::NoExpirationTracking,
            next_expiration_date: None,
            days_remaining: None,
            active_lot_count: 0,
        };
    }

    let active: Vec<&Lot> = lots.iter().filter(|l| l.is_active()).collect();
    let next = active
        .iter()
        .map(|l| l.expiration_date)
        .min();

    match next {
        Some(date) => ExpirationSummary {
            status: classify_lot(date, today, thresholds).into(),
            next_expiration_date: Some(date),
            days_remaining: Some(days_until(date, today)),
            active_lot_count: active.len() as i64,
        },
        None => ExpirationSummary {
            status: ProductExpirationStatus::NoActiveLots,
            next_expiration_date: None,
            days_remaining: None,
            active_lot_count: 0,
        },
    }
}
