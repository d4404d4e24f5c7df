//! Reconciliation engine: detect and repair stock drift
//!
//! The single replacement for every ad hoc stock-repair script. Per
//! product it compares the ledger fold, the lot sum and the cached
//! aggregate, then repairs the aggregate from the ledger by appending one
//! adjustment entry. History is never rewritten; lots are never rewritten
//! blindly: only concrete movements rebuild them.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::config::{LockingConfig, ReconciliationConfig};
use crate::error::{AppError, AppResult};
use crate::models::{LedgerEntryKind, MovementMetadata, RECONCILIATION_REASON};
use crate::services::ledger::append_entry;
use crate::services::locking::begin_product_tx;
use shared::reconcile::{plan_reconciliation, DriftKind, StockViews};

/// Reconciliation service
#[derive(Clone)]
pub struct ReconciliationService {
    db: PgPool,
    locking: LockingConfig,
    reconciliation: ReconciliationConfig,
}

/// Read-only drift report for one product
#[derive(Debug, Clone, Serialize)]
pub struct StockAudit {
    pub product_id: Uuid,
    pub barcode: String,
    pub ledger_balance: i64,
    pub lot_sum: Option<i64>,
    pub stock: i64,
    pub drifts: Vec<DriftKind>,
}

impl StockAudit {
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty()
    }
}

/// What a repair run did to one product
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub product_id: Uuid,
    pub barcode: String,
    pub drifts: Vec<DriftKind>,
    /// Signed delta of the appended adjustment, when the aggregate needed
    /// repair
    pub adjustment: Option<i64>,
    pub corrected_stock: i64,
}

impl ReconcileOutcome {
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty()
    }

    /// Lot drift cannot be auto-repaired; it clears only when movements
    /// rebuild the lots
    pub fn has_unrepaired_drift(&self) -> bool {
        self.drifts.contains(&DriftKind::Lots)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    barcode: String,
    tracks_expiration: bool,
    stock: i64,
}

impl ReconciliationService {
    /// Create a new ReconciliationService instance
    pub fn new(db: PgPool, locking: LockingConfig, reconciliation: ReconciliationConfig) -> Self {
        Self {
            db,
            locking,
            reconciliation,
        }
    }

    /// Lock-free drift detection. May observe a slightly stale snapshot;
    /// never blocks writers. Nothing is repaired or recorded.
    pub async fn audit_product(&self, product_id: Uuid) -> AppResult<StockAudit> {
        let product = sqlx::query_as::<_, AuditRow>(
            "SELECT id, barcode, tracks_expiration, stock FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let mut conn = self.db.acquire().await?;
        let ledger_balance = ledger_balance(&mut *conn, product.id).await?;
        let lot_sum = if product.tracks_expiration {
            Some(lot_sum(&mut *conn, product.id).await?)
        } else {
            None
        };

        let plan = plan_reconciliation(StockViews {
            ledger_balance,
            lot_sum,
            stock: product.stock,
        });

        Ok(StockAudit {
            product_id: product.id,
            barcode: product.barcode,
            ledger_balance,
            lot_sum,
            stock: product.stock,
            drifts: plan.drifts,
        })
    }

    /// Audit every product, one at a time, without locks
    pub async fn audit_all(&self) -> AppResult<Vec<StockAudit>> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM products ORDER BY barcode")
            .fetch_all(&self.db)
            .await?;
        let mut audits = Vec::with_capacity(ids.len());
        for id in ids {
            audits.push(self.audit_product(id).await?);
        }
        Ok(audits)
    }

    /// Detect and repair drift for one product, under its lock.
    ///
    /// Idempotent: a second run with no intervening writes appends
    /// nothing. The ledger is never edited; the aggregate is set back to
    /// the ledger balance via exactly one appended adjustment.
    pub async fn reconcile_product(&self, product_id: Uuid) -> AppResult<ReconcileOutcome> {
        let (mut tx, product) = begin_product_tx(&self.db, &self.locking, product_id).await?;

        let ledger = ledger_balance(&mut *tx, product.id).await?;
        let lots = if product.tracks_expiration {
            Some(lot_sum(&mut *tx, product.id).await?)
        } else {
            None
        };

        let plan = plan_reconciliation(StockViews {
            ledger_balance: ledger,
            lot_sum: lots,
            stock: product.stock,
        });

        if plan.is_clean() {
            tx.commit().await?;
            return Ok(ReconcileOutcome {
                product_id: product.id,
                barcode: product.barcode,
                drifts: Vec::new(),
                adjustment: None,
                corrected_stock: plan.corrected_stock,
            });
        }

        for drift in &plan.drifts {
            sqlx::query(
                r#"
                INSERT INTO drift_events (product_id, kind, ledger_balance, lot_sum, stock, repaired)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(product.id)
            .bind(drift.as_str())
            .bind(ledger)
            .bind(lots)
            .bind(product.stock)
            .bind(*drift == DriftKind::Aggregate)
            .execute(&mut *tx)
            .await?;
        }

        if plan.drifts.contains(&DriftKind::Lots) {
            tracing::warn!(
                barcode = %product.barcode,
                lot_sum = lots,
                ledger_balance = ledger,
                "lot sum disagrees with ledger; lots are only rebuilt by movements"
            );
        }

        if let Some(delta) = plan.adjustment {
            append_entry(
                &mut *tx,
                product.id,
                LedgerEntryKind::Adjustment,
                delta,
                Some(RECONCILIATION_REASON),
                &MovementMetadata::default(),
            )
            .await?;

            sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
                .bind(product.id)
                .bind(plan.corrected_stock)
                .execute(&mut *tx)
                .await?;

            tracing::warn!(
                barcode = %product.barcode,
                delta,
                corrected_stock = plan.corrected_stock,
                "aggregate repaired from ledger"
            );
        }

        let recent = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM drift_events
            WHERE product_id = $1
              AND detected_at > NOW() - make_interval(hours => $2)
            "#,
        )
        .bind(product.id)
        .bind(self.reconciliation.drift_window_hours)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if recent >= self.reconciliation.drift_alert_threshold {
            tracing::warn!(
                barcode = %product.barcode,
                events_in_window = recent,
                window_hours = self.reconciliation.drift_window_hours,
                "product keeps drifting within the alert window, investigate for a deeper bug"
            );
        }

        Ok(ReconcileOutcome {
            product_id: product.id,
            barcode: product.barcode,
            drifts: plan.drifts,
            adjustment: plan.adjustment,
            corrected_stock: plan.corrected_stock,
        })
    }

    /// Reconcile every product, taking one product lock at a time.
    ///
    /// A product whose lock stays busy after the configured retries is
    /// skipped with a warning so a scheduled sweep is never wedged by one
    /// hot product.
    pub async fn reconcile_all(&self) -> AppResult<Vec<ReconcileOutcome>> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM products ORDER BY barcode")
            .fetch_all(&self.db)
            .await?;

        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            match self.reconcile_product(id).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_transient() => {
                    tracing::warn!(product_id = %id, "product busy, skipped this sweep");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }
}

async fn ledger_balance(conn: &mut PgConnection, product_id: Uuid) -> AppResult<i64> {
    let balance = sqlx::query_scalar::<_, i64>(
        r#"
        -- Reconciliation adjustments record aggregate repairs and do not
        -- move the balance
        SELECT COALESCE(SUM(
            CASE kind
                WHEN 'incoming' THEN quantity
                WHEN 'outgoing' THEN -quantity
                ELSE quantity
            END
        ), 0)::BIGINT
        FROM ledger_entries
        WHERE product_id = $1
          AND reason IS DISTINCT FROM 'reconciliation'
        "#,
    )
    .bind(product_id)
    .fetch_one(conn)
    .await?;
    Ok(balance)
}

async fn lot_sum(conn: &mut PgConnection, product_id: Uuid) -> AppResult<i64> {
    let sum = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM lots WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(conn)
    .await?;
    Ok(sum)
}
