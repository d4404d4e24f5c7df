//! Incoming and outgoing stock movements
//!
//! Every movement commits as one transaction under the product's exclusive
//! lock: lot changes, the ledger entry and the aggregate update land
//! together or not at all. A partially applied movement is never
//! observable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::LockingConfig;
use crate::error::{AppError, AppResult};
use crate::models::{DispatchDraft, LedgerEntry, LedgerEntryKind, MovementMetadata};
use crate::services::ledger::append_entry;
use crate::services::locking::begin_product_tx;
use shared::allocation::{plan_fifo_allocation, AllocationError, LotDraw, LotSnapshot};

/// Movement service: the only writer of lots and the aggregate besides
/// the reconciliation engine
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
    locking: LockingConfig,
}

/// Input for an incoming movement
#[derive(Debug, Deserialize)]
pub struct IncomingMovementInput {
    pub quantity: i64,
    /// Required when the product tracks expiration
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub metadata: MovementMetadata,
}

/// Input for an outgoing movement
#[derive(Debug, Deserialize)]
pub struct OutgoingMovementInput {
    pub quantity: i64,
    #[serde(default)]
    pub metadata: MovementMetadata,
}

/// A committed outgoing movement: the entry plus the lots it drew from
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMovement {
    pub entry: LedgerEntry,
    pub draws: Vec<LotDraw>,
}

/// Row for the allocation snapshot
#[derive(Debug, sqlx::FromRow)]
struct LotSnapshotRow {
    id: Uuid,
    lot_number: i64,
    expiration_date: NaiveDate,
    quantity: i64,
}

impl From<LotSnapshotRow> for LotSnapshot {
    fn from(row: LotSnapshotRow) -> Self {
        LotSnapshot {
            lot_id: row.id,
            lot_number: row.lot_number,
            expiration_date: row.expiration_date,
            quantity: row.quantity,
        }
    }
}

impl MovementService {
    /// Create a new MovementService instance
    pub fn new(db: PgPool, locking: LockingConfig) -> Self {
        Self { db, locking }
    }

    /// Register an incoming movement.
    ///
    /// Tracking products open a brand-new lot on every receipt; existing
    /// lots are never topped up, so each batch keeps its own expiration
    /// date and audit trail.
    pub async fn register_incoming(
        &self,
        product_id: Uuid,
        input: IncomingMovementInput,
    ) -> AppResult<LedgerEntry> {
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
                message_es: "La cantidad debe ser positiva".to_string(),
            });
        }

        let (mut tx, product) = begin_product_tx(&self.db, &self.locking, product_id).await?;
        ensure_active(&product.barcode, product.active)?;

        let lot_number = if product.tracks_expiration {
            let expiration_date = input.expiration_date.ok_or_else(|| AppError::Validation {
                field: "expiration_date".to_string(),
                message: "Expiration date is required for products that track expiration"
                    .to_string(),
                message_es: "La fecha de vencimiento es obligatoria para productos con control de vencimiento"
                    .to_string(),
            })?;

            let lot_number = sqlx::query_scalar::<_, i64>(
                "SELECT COALESCE(MAX(lot_number), 0) + 1 FROM lots WHERE product_id = $1",
            )
            .bind(product.id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO lots (product_id, lot_number, expiration_date, quantity)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(product.id)
            .bind(lot_number)
            .bind(expiration_date)
            .bind(input.quantity)
            .execute(&mut *tx)
            .await?;

            Some(lot_number)
        } else {
            if input.expiration_date.is_some() {
                return Err(AppError::Validation {
                    field: "expiration_date".to_string(),
                    message: "Product does not track expiration; enable tracking first"
                        .to_string(),
                    message_es: "El producto no tiene control de vencimiento; actívelo primero"
                        .to_string(),
                });
            }
            None
        };

        let entry = append_entry(
            &mut *tx,
            product.id,
            LedgerEntryKind::Incoming,
            input.quantity,
            None,
            &input.metadata,
        )
        .await?;

        sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(product.id)
            .bind(input.quantity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            barcode = %product.barcode,
            quantity = input.quantity,
            lot_number,
            "incoming movement registered"
        );
        Ok(entry)
    }

    /// Register an outgoing movement.
    ///
    /// Tracking products draw from their lots closest-to-expiry first;
    /// lots drained to exactly zero are stamped exhausted but kept.
    /// All-or-nothing: insufficient stock aborts with nothing persisted.
    pub async fn register_outgoing(
        &self,
        product_id: Uuid,
        input: OutgoingMovementInput,
    ) -> AppResult<OutgoingMovement> {
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
                message_es: "La cantidad debe ser positiva".to_string(),
            });
        }

        let (mut tx, product) = begin_product_tx(&self.db, &self.locking, product_id).await?;
        ensure_active(&product.barcode, product.active)?;

        let draws = if product.tracks_expiration {
            let rows = sqlx::query_as::<_, LotSnapshotRow>(
                r#"
                SELECT id, lot_number, expiration_date, quantity
                FROM lots
                WHERE product_id = $1 AND quantity > 0
                "#,
            )
            .bind(product.id)
            .fetch_all(&mut *tx)
            .await?;
            let snapshots: Vec<LotSnapshot> = rows.into_iter().map(Into::into).collect();

            let draws = plan_fifo_allocation(&snapshots, input.quantity).map_err(|e| match e {
                AllocationError::InsufficientStock {
                    requested,
                    available,
                } => AppError::InsufficientStock {
                    barcode: product.barcode.clone(),
                    requested,
                    available,
                },
                AllocationError::InvalidQuantity(_) => AppError::Validation {
                    field: "quantity".to_string(),
                    message: "Quantity must be positive".to_string(),
                    message_es: "La cantidad debe ser positiva".to_string(),
                },
            })?;

            for draw in &draws {
                sqlx::query(
                    r#"
                    UPDATE lots
                    SET quantity = quantity - $2,
                        exhausted_at = CASE WHEN quantity - $2 = 0 THEN NOW() ELSE exhausted_at END
                    WHERE id = $1
                    "#,
                )
                .bind(draw.lot_id)
                .bind(draw.drawn)
                .execute(&mut *tx)
                .await?;
            }
            draws
        } else {
            if product.stock < input.quantity {
                return Err(AppError::InsufficientStock {
                    barcode: product.barcode.clone(),
                    requested: input.quantity,
                    available: product.stock,
                });
            }
            Vec::new()
        };

        let entry = append_entry(
            &mut *tx,
            product.id,
            LedgerEntryKind::Outgoing,
            input.quantity,
            None,
            &input.metadata,
        )
        .await?;

        for draw in &draws {
            sqlx::query(
                "INSERT INTO ledger_entry_lots (entry_id, lot_id, quantity_drawn) VALUES ($1, $2, $3)",
            )
            .bind(entry.id)
            .bind(draw.lot_id)
            .bind(draw.drawn)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1")
            .bind(product.id)
            .bind(input.quantity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            barcode = %product.barcode,
            quantity = input.quantity,
            lots_drawn = draws.len(),
            "outgoing movement registered"
        );
        Ok(OutgoingMovement { entry, draws })
    }

    /// Dispatch every item staged in a draft.
    ///
    /// Atomicity stays per product (one transaction each); processing
    /// stops at the first failure and movements already committed stand.
    pub async fn register_outgoing_draft(
        &self,
        draft: &DispatchDraft,
        metadata: &MovementMetadata,
    ) -> AppResult<Vec<OutgoingMovement>> {
        if draft.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "Draft has no items".to_string(),
                message_es: "La lista de salida está vacía".to_string(),
            });
        }

        let mut movements = Vec::with_capacity(draft.items().len());
        for item in draft.items() {
            let product_id = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM products WHERE barcode = $1",
            )
            .bind(&item.barcode)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", item.barcode)))?;

            let mut item_metadata = metadata.clone();
            item_metadata.note = match (&item.siscom_number, &item.note) {
                (Some(siscom), Some(note)) => Some(format!("SISCOM {} - {}", siscom, note)),
                (Some(siscom), None) => Some(format!("SISCOM {}", siscom)),
                (None, note) => note.clone().or_else(|| item_metadata.note.clone()),
            };

            let movement = self
                .register_outgoing(
                    product_id,
                    OutgoingMovementInput {
                        quantity: item.quantity,
                        metadata: item_metadata,
                    },
                )
                .await?;
            movements.push(movement);
        }
        Ok(movements)
    }
}

fn ensure_active(barcode: &str, active: bool) -> AppResult<()> {
    if !active {
        return Err(AppError::Validation {
            field: "product".to_string(),
            message: format!("Product {} is disabled", barcode),
            message_es: format!("El producto {} está deshabilitado", barcode),
        });
    }
    Ok(())
}
