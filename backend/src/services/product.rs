//! Product registration and administration
//!
//! Products are never deleted; they are soft-disabled and keep their
//! ledger and lots forever. The aggregate `stock` column is written only
//! by the movement and reconciliation services.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::LockingConfig;
use crate::error::{AppError, AppResult};
use crate::models::Product;
use crate::services::locking::begin_product_tx;
use shared::validation::{
    validate_barcode, validate_category, validate_description, validate_rut,
};

/// Product service for registration, lookup and administration
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
    locking: LockingConfig,
}

const PRODUCT_COLUMNS: &str = "id, barcode, description, category, supplier_rut, dispatch_guide, \
     invoice_number, purchase_order, tracks_expiration, stock, active, created_at, updated_at";

/// Database row for a product
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    barcode: String,
    description: String,
    category: String,
    supplier_rut: Option<String>,
    dispatch_guide: Option<String>,
    invoice_number: Option<String>,
    purchase_order: Option<String>,
    tracks_expiration: bool,
    stock: i64,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            barcode: row.barcode,
            description: row.description,
            category: row.category,
            supplier_rut: row.supplier_rut,
            dispatch_guide: row.dispatch_guide,
            invoice_number: row.invoice_number,
            purchase_order: row.purchase_order,
            tracks_expiration: row.tracks_expiration,
            stock: row.stock,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for registering a product
#[derive(Debug, Deserialize)]
pub struct RegisterProductInput {
    pub barcode: String,
    pub description: String,
    pub category: String,
    pub supplier_rut: Option<String>,
    pub dispatch_guide: Option<String>,
    pub invoice_number: Option<String>,
    pub purchase_order: Option<String>,
    #[serde(default)]
    pub tracks_expiration: bool,
}

/// Search filter for product listings
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub barcode: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub include_disabled: bool,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool, locking: LockingConfig) -> Self {
        Self { db, locking }
    }

    /// Register a product with zero stock
    pub async fn register(&self, input: RegisterProductInput) -> AppResult<Product> {
        if let Err(msg) = validate_barcode(&input.barcode) {
            return Err(AppError::Validation {
                field: "barcode".to_string(),
                message: msg.to_string(),
                message_es: "Código de barra inválido".to_string(),
            });
        }
        if let Err(msg) = validate_description(&input.description) {
            return Err(AppError::Validation {
                field: "description".to_string(),
                message: msg.to_string(),
                message_es: "Descripción inválida".to_string(),
            });
        }
        if let Err(msg) = validate_category(&input.category) {
            return Err(AppError::Validation {
                field: "category".to_string(),
                message: msg.to_string(),
                message_es: "Categoría inválida".to_string(),
            });
        }
        if let Some(rut) = &input.supplier_rut {
            if let Err(msg) = validate_rut(rut) {
                return Err(AppError::Validation {
                    field: "supplier_rut".to_string(),
                    message: msg.to_string(),
                    message_es: "RUT del proveedor inválido".to_string(),
                });
            }
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (
                barcode, description, category, supplier_rut, dispatch_guide,
                invoice_number, purchase_order, tracks_expiration
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&input.barcode)
        .bind(&input.description)
        .bind(&input.category)
        .bind(&input.supplier_rut)
        .bind(&input.dispatch_guide)
        .bind(&input.invoice_number)
        .bind(&input.purchase_order)
        .bind(input.tracks_expiration)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.code().as_deref() == Some("23505") {
                    return AppError::DuplicateEntry("barcode".to_string());
                }
            }
            AppError::DatabaseError(e)
        })?;

        tracing::info!(barcode = %row.barcode, "product registered");
        Ok(row.into())
    }

    /// Get a product by id
    pub async fn get(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        Ok(row.into())
    }

    /// Look a product up by its barcode
    pub async fn find_by_barcode(&self, barcode: &str) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE barcode = $1",
            PRODUCT_COLUMNS
        ))
        .bind(barcode)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", barcode)))?;
        Ok(row.into())
    }

    /// List products, filtered the way the warehouse list views filter
    pub async fn list(&self, filter: ProductFilter) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {}
            FROM products
            WHERE ($1::text IS NULL OR barcode = $1)
              AND ($2::text IS NULL OR description ILIKE '%' || $2 || '%')
              AND (active OR $3)
            ORDER BY barcode
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&filter.barcode)
        .bind(&filter.description)
        .bind(filter.include_disabled)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Soft-disable a product; its history stays intact
    pub async fn disable(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET active = FALSE, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        tracing::info!(barcode = %row.barcode, "product disabled");
        Ok(row.into())
    }

    /// Turn expiration tracking on for a product that was registered
    /// without it. Existing stock is moved into an opening lot so the
    /// lot sum keeps matching the ledger balance.
    pub async fn enable_expiration_tracking(
        &self,
        product_id: Uuid,
        expiration_date: NaiveDate,
    ) -> AppResult<Product> {
        let (mut tx, product) = begin_product_tx(&self.db, &self.locking, product_id).await?;

        if product.tracks_expiration {
            return Err(AppError::Validation {
                field: "tracks_expiration".to_string(),
                message: "Product already tracks expiration".to_string(),
                message_es: "El producto ya tiene control de vencimiento".to_string(),
            });
        }

        sqlx::query("UPDATE products SET tracks_expiration = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(product.id)
            .execute(&mut *tx)
            .await?;

        if product.stock > 0 {
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
            .bind(product.stock)
            .execute(&mut *tx)
            .await?;

            tracing::info!(
                barcode = %product.barcode,
                lot_number,
                quantity = product.stock,
                "expiration tracking enabled; opening lot created"
            );
        }

        tx.commit().await?;
        self.get(product_id).await
    }
}
