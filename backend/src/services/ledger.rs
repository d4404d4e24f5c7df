//! Ledger service: the append-only movement history per product
//!
//! The ledger is the single source of truth for quantity. Entries are
//! immutable once committed; corrections are appended as adjustments,
//! never edited in. Reads here take no lock and never block writers.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    with_running_balance, LedgerEntry, LedgerEntryKind, MovementMetadata, StockCardLine,
};
use shared::allocation::LotDraw;

/// Ledger service for balances and stock cards
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

const ENTRY_COLUMNS: &str = "id, product_id, kind, quantity, recorded_at, reason, \
     supplier_rut, dispatch_guide, invoice_number, purchase_order, delivery_receipt_id, note";

/// Database row for a ledger entry
#[derive(Debug, sqlx::FromRow)]
struct LedgerEntryRow {
    id: i64,
    product_id: Uuid,
    kind: String,
    quantity: i64,
    recorded_at: DateTime<Utc>,
    reason: Option<String>,
    supplier_rut: Option<String>,
    dispatch_guide: Option<String>,
    invoice_number: Option<String>,
    purchase_order: Option<String>,
    delivery_receipt_id: Option<i64>,
    note: Option<String>,
}

impl LedgerEntryRow {
    fn into_entry(self) -> AppResult<LedgerEntry> {
        let kind = LedgerEntryKind::from_str(&self.kind)
            .ok_or_else(|| AppError::Internal(anyhow!("unknown ledger entry kind: {}", self.kind)))?;
        Ok(LedgerEntry {
            id: self.id,
            product_id: self.product_id,
            kind,
            quantity: self.quantity,
            recorded_at: self.recorded_at,
            reason: self.reason,
            metadata: MovementMetadata {
                supplier_rut: self.supplier_rut,
                dispatch_guide: self.dispatch_guide,
                invoice_number: self.invoice_number,
                purchase_order: self.purchase_order,
                delivery_receipt_id: self.delivery_receipt_id,
                note: self.note,
            },
        })
    }
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Current folded balance for a product
    pub async fn full_balance(&self, product_id: Uuid) -> AppResult<i64> {
        self.ensure_product(product_id).await?;
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
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
        .fetch_one(&self.db)
        .await?;
        Ok(balance)
    }

    /// Balance considering only entries recorded at or before `cutoff`;
    /// used to reconstruct historical stock cards
    pub async fn balance_as_of(&self, product_id: Uuid, cutoff: DateTime<Utc>) -> AppResult<i64> {
        self.ensure_product(product_id).await?;
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(
                CASE kind
                    WHEN 'incoming' THEN quantity
                    WHEN 'outgoing' THEN -quantity
                    ELSE quantity
                END
            ), 0)::BIGINT
            FROM ledger_entries
            WHERE product_id = $1 AND recorded_at <= $2
              AND reason IS DISTINCT FROM 'reconciliation'
            "#,
        )
        .bind(product_id)
        .bind(cutoff)
        .fetch_one(&self.db)
        .await?;
        Ok(balance)
    }

    /// All entries for a product, totally ordered by (recorded_at, id).
    /// The id tie-break keeps the fold deterministic when entries share
    /// a timestamp.
    pub async fn entries(&self, product_id: Uuid) -> AppResult<Vec<LedgerEntry>> {
        self.ensure_product(product_id).await?;
        let rows = sqlx::query_as::<_, LedgerEntryRow>(&format!(
            "SELECT {} FROM ledger_entries WHERE product_id = $1 ORDER BY recorded_at, id",
            ENTRY_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(LedgerEntryRow::into_entry).collect()
    }

    /// The classic bincard: every entry with its running balance
    pub async fn stock_card(&self, product_id: Uuid) -> AppResult<Vec<StockCardLine>> {
        let entries = self.entries(product_id).await?;
        Ok(with_running_balance(entries))
    }

    /// The lots an outgoing entry drew from, in draw order
    pub async fn entry_draws(&self, entry_id: i64) -> AppResult<Vec<LotDraw>> {
        let rows = sqlx::query_as::<_, (Uuid, i64, i64)>(
            r#"
            SELECT el.lot_id, l.lot_number, el.quantity_drawn
            FROM ledger_entry_lots el
            JOIN lots l ON l.id = el.lot_id
            WHERE el.entry_id = $1
            ORDER BY l.expiration_date, l.lot_number
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(lot_id, lot_number, drawn)| LotDraw {
                lot_id,
                lot_number,
                drawn,
            })
            .collect())
    }

    async fn ensure_product(&self, product_id: Uuid) -> AppResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }
}

/// Append an entry inside an open per-product transaction.
///
/// Never rejects for balance reasons: balance is a derived property of the
/// ledger, not a precondition for writing to it.
pub(crate) async fn append_entry(
    conn: &mut PgConnection,
    product_id: Uuid,
    kind: LedgerEntryKind,
    quantity: i64,
    reason: Option<&str>,
    metadata: &MovementMetadata,
) -> AppResult<LedgerEntry> {
    let row = sqlx::query_as::<_, LedgerEntryRow>(&format!(
        r#"
        INSERT INTO ledger_entries (
            product_id, kind, quantity, reason,
            supplier_rut, dispatch_guide, invoice_number, purchase_order,
            delivery_receipt_id, note
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {}
        "#,
        ENTRY_COLUMNS
    ))
    .bind(product_id)
    .bind(kind.as_str())
    .bind(quantity)
    .bind(reason)
    .bind(&metadata.supplier_rut)
    .bind(&metadata.dispatch_guide)
    .bind(&metadata.invoice_number)
    .bind(&metadata.purchase_order)
    .bind(metadata.delivery_receipt_id)
    .bind(&metadata.note)
    .fetch_one(conn)
    .await?;
    row.into_entry()
}
