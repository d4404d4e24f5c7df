//! Lot listing and lot-level operations
//!
//! Lots are a derived cache of the ledger: created by incoming movements,
//! drawn down by the allocator, never deleted. Exhausted lots stay on
//! record, so the full listing is the receipt history of the product.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Lot;
use shared::validation::validate_lot_number;

/// Lot service for detail views and expiration-date maintenance
#[derive(Clone)]
pub struct LotService {
    db: PgPool,
}

const LOT_COLUMNS: &str =
    "id, product_id, lot_number, expiration_date, quantity, received_at, exhausted_at";

/// Database row for a lot
#[derive(Debug, sqlx::FromRow)]
struct LotRow {
    id: Uuid,
    product_id: Uuid,
    lot_number: i64,
    expiration_date: NaiveDate,
    quantity: i64,
    received_at: DateTime<Utc>,
    exhausted_at: Option<DateTime<Utc>>,
}

impl From<LotRow> for Lot {
    fn from(row: LotRow) -> Self {
        Lot {
            id: row.id,
            product_id: row.product_id,
            lot_number: row.lot_number,
            expiration_date: row.expiration_date,
            quantity: row.quantity,
            received_at: row.received_at,
            exhausted_at: row.exhausted_at,
        }
    }
}

impl LotService {
    /// Create a new LotService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Lots of a product in receipt order.
    ///
    /// `active_only = true` keeps only lots that can still be allocated;
    /// `false` returns the complete historical record, exhausted lots
    /// included.
    pub async fn lot_detail(&self, product_id: Uuid, active_only: bool) -> AppResult<Vec<Lot>> {
        self.ensure_product(product_id).await?;

        let query = if active_only {
            format!(
                "SELECT {} FROM lots WHERE product_id = $1 AND quantity > 0 ORDER BY lot_number",
                LOT_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM lots WHERE product_id = $1 ORDER BY lot_number",
                LOT_COLUMNS
            )
        };

        let rows = sqlx::query_as::<_, LotRow>(&query)
            .bind(product_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Correct the expiration date of one lot.
    ///
    /// Dates are data, not history: unlike quantities they may be fixed in
    /// place when the label was typed in wrong.
    pub async fn update_expiration_date(
        &self,
        product_id: Uuid,
        lot_number: i64,
        new_date: NaiveDate,
    ) -> AppResult<Lot> {
        if let Err(msg) = validate_lot_number(lot_number) {
            return Err(AppError::Validation {
                field: "lot_number".to_string(),
                message: msg.to_string(),
                message_es: "Número de lote inválido".to_string(),
            });
        }

        let barcode = self.ensure_product(product_id).await?;

        let row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            UPDATE lots
            SET expiration_date = $3
            WHERE product_id = $1 AND lot_number = $2
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(product_id)
        .bind(lot_number)
        .bind(new_date)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidLotReference {
            barcode,
            lot_number,
        })?;

        tracing::info!(
            product_id = %product_id,
            lot_number,
            new_date = %new_date,
            "lot expiration date corrected"
        );
        Ok(row.into())
    }

    async fn ensure_product(&self, product_id: Uuid) -> AppResult<String> {
        sqlx::query_scalar::<_, String>("SELECT barcode FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }
}
