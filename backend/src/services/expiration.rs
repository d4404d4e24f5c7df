//! Expiration status for dashboards and alerting collaborators

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    summarize_product, ExpirationSummary, ExpirationThresholds, Lot, ProductExpirationStatus,
};

/// Expiration service, parameterized by the configured day thresholds
#[derive(Clone)]
pub struct ExpirationService {
    db: PgPool,
    thresholds: ExpirationThresholds,
}

/// One row of the expiration control report
#[derive(Debug, Clone, Serialize)]
pub struct ProductExpirationReport {
    pub product_id: Uuid,
    pub barcode: String,
    pub description: String,
    pub summary: ExpirationSummary,
}

#[derive(Debug, sqlx::FromRow)]
struct ReportLotRow {
    product_id: Uuid,
    barcode: String,
    description: String,
    lot_id: Option<Uuid>,
    lot_number: Option<i64>,
    expiration_date: Option<NaiveDate>,
    quantity: Option<i64>,
    received_at: Option<DateTime<Utc>>,
    exhausted_at: Option<DateTime<Utc>>,
}

impl ExpirationService {
    /// Create a new ExpirationService instance
    pub fn new(db: PgPool, thresholds: ExpirationThresholds) -> Self {
        Self { db, thresholds }
    }

    /// Freshness summary of one product as of today
    pub async fn expiration_status(&self, product_id: Uuid) -> AppResult<ExpirationSummary> {
        let tracks = sqlx::query_scalar::<_, bool>(
            "SELECT tracks_expiration FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let lots = if tracks {
            let rows = sqlx::query_as::<_, (Uuid, Uuid, i64, NaiveDate, i64, DateTime<Utc>, Option<DateTime<Utc>>)>(
                r#"
                SELECT id, product_id, lot_number, expiration_date, quantity, received_at, exhausted_at
                FROM lots
                WHERE product_id = $1
                "#,
            )
            .bind(product_id)
            .fetch_all(&self.db)
            .await?;
            rows.into_iter()
                .map(|r| Lot {
                    id: r.0,
                    product_id: r.1,
                    lot_number: r.2,
                    expiration_date: r.3,
                    quantity: r.4,
                    received_at: r.5,
                    exhausted_at: r.6,
                })
                .collect()
        } else {
            Vec::new()
        };

        let today = Utc::now().date_naive();
        Ok(summarize_product(tracks, &lots, today, &self.thresholds))
    }

    /// Expiration control report over every active tracking product,
    /// most urgent first. `status` narrows the report to one band.
    pub async fn expiration_report(
        &self,
        status: Option<ProductExpirationStatus>,
    ) -> AppResult<Vec<ProductExpirationReport>> {
        let rows = sqlx::query_as::<_, ReportLotRow>(
            r#"
            SELECT p.id AS product_id, p.barcode, p.description,
                   l.id AS lot_id, l.lot_number, l.expiration_date, l.quantity,
                   l.received_at, l.exhausted_at
            FROM products p
            LEFT JOIN lots l ON l.product_id = p.id
            WHERE p.tracks_expiration AND p.active
            ORDER BY p.barcode, l.lot_number
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        // Group the joined rows back into per-product lot lists
        let mut reports: Vec<(Uuid, String, String, Vec<Lot>)> = Vec::new();
        for row in rows {
            if reports.last().map(|r| r.0) != Some(row.product_id) {
                reports.push((
                    row.product_id,
                    row.barcode.clone(),
                    row.description.clone(),
                    Vec::new(),
                ));
            }
            if let (Some(id), Some(lot_number), Some(expiration_date), Some(quantity), Some(received_at)) = (
                row.lot_id,
                row.lot_number,
                row.expiration_date,
                row.quantity,
                row.received_at,
            ) {
                if let Some(last) = reports.last_mut() {
                    last.3.push(Lot {
                        id,
                        product_id: row.product_id,
                        lot_number,
                        expiration_date,
                        quantity,
                        received_at,
                        exhausted_at: row.exhausted_at,
                    });
                }
            }
        }

        let today = Utc::now().date_naive();
        let mut result: Vec<ProductExpirationReport> = reports
            .into_iter()
            .map(|(product_id, barcode, description, lots)| ProductExpirationReport {
                product_id,
                barcode,
                description,
                summary: summarize_product(true, &lots, today, &self.thresholds),
            })
            .filter(|r| status.map_or(true, |s| r.summary.status == s))
            .collect();

        // Soonest-expiring products first; fully depleted ones last
        result.sort_by_key(|r| (r.summary.days_remaining.is_none(), r.summary.days_remaining));
        Ok(result)
    }
}
