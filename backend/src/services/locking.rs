//! Per-product exclusive locking
//!
//! The unit of atomicity is a single product: any change to its lots, its
//! ledger and its aggregate counter happens inside one transaction holding
//! the product's row lock. Operations on different products never contend;
//! there is no global lock.

use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::LockingConfig;
use crate::error::{AppError, AppResult};

/// Product state captured under the lock
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LockedProduct {
    pub id: Uuid,
    pub barcode: String,
    pub tracks_expiration: bool,
    pub stock: i64,
    pub active: bool,
}

/// Open a transaction holding the exclusive row lock for `product_id`.
///
/// `FOR UPDATE NOWAIT` fails fast when another movement holds the lock;
/// acquisition is retried with exponential backoff before surfacing
/// `ConcurrentModification` to the caller.
pub(crate) async fn begin_product_tx(
    db: &PgPool,
    locking: &LockingConfig,
    product_id: Uuid,
) -> AppResult<(Transaction<'static, Postgres>, LockedProduct)> {
    let mut attempt: u32 = 0;
    loop {
        let mut tx = db.begin().await?;

        let row = sqlx::query_as::<_, LockedProduct>(
            r#"
            SELECT id, barcode, tracks_expiration, stock, active
            FROM products
            WHERE id = $1
            FOR UPDATE NOWAIT
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await;

        match row {
            Ok(Some(product)) => return Ok((tx, product)),
            Ok(None) => return Err(AppError::NotFound("Product".to_string())),
            Err(e) if is_lock_unavailable(&e) => {
                // Transaction is poisoned after the failed lock; discard it
                drop(tx);
                if attempt >= locking.max_retries {
                    tracing::warn!(%product_id, attempt, "product lock retries exhausted");
                    return Err(AppError::ConcurrentModification(product_id.to_string()));
                }
                let delay = locking.backoff_ms << attempt.min(6);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// SQLSTATE 55P03: lock_not_available, raised by FOR UPDATE NOWAIT
fn is_lock_unavailable(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("55P03"))
}
