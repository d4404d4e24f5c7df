//! Error handling for the Warehouse Stock Management Platform
//!
//! Provides consistent error codes with English and Spanish messages for
//! the operator-facing collaborators.

use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock for {barcode}: requested {requested}, available {available}")]
    InsufficientStock {
        barcode: String,
        requested: i64,
        available: i64,
    },

    #[error("Lot #{lot_number} does not belong to product {barcode}")]
    InvalidLotReference { barcode: String, lot_number: i64 },

    #[error("Concurrent modification of product {0}: lock retries exhausted")]
    ConcurrentModification(String),

    /// Raised internally by the reconciliation engine; auto-repaired and
    /// never surfaced to end users directly
    #[error("Stock drift detected on product {barcode}")]
    DriftDetected { barcode: String },

    // Infrastructure errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

/// Machine-readable error detail handed to the boundary collaborators
#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::InvalidLotReference { .. } => "INVALID_LOT_REFERENCE",
            AppError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            AppError::DriftDetected { .. } => "DRIFT_DETECTED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Transient failures the caller may retry as-is
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::ConcurrentModification(_))
    }

    pub fn detail(&self) -> ErrorDetail {
        let (message_en, message_es, field) = match self {
            AppError::Validation {
                field,
                message,
                message_es,
            } => (message.clone(), message_es.clone(), Some(field.clone())),
            AppError::DuplicateEntry(field) => (
                format!("A record with this {} already exists", field),
                format!("Ya existe un registro con este {}", field),
                Some(field.clone()),
            ),
            AppError::NotFound(resource) => (
                format!("{} not found", resource),
                format!("No se encontró {}", resource),
                None,
            ),
            AppError::InsufficientStock {
                barcode,
                requested,
                available,
            } => (
                format!(
                    "Insufficient stock for product {}: requested {}, available {}",
                    barcode, requested, available
                ),
                format!(
                    "Stock insuficiente para el producto {}: solicitado {}, disponible {}",
                    barcode, requested, available
                ),
                None,
            ),
            AppError::InvalidLotReference { barcode, lot_number } => (
                format!("Lot #{} does not belong to product {}", lot_number, barcode),
                format!("El lote #{} no pertenece al producto {}", lot_number, barcode),
                None,
            ),
            AppError::ConcurrentModification(product) => (
                format!("Product {} is being modified by another operation", product),
                format!("El producto {} está siendo modificado por otra operación", product),
                None,
            ),
            AppError::DriftDetected { barcode } => (
                format!("Stock drift detected on product {}", barcode),
                format!("Desincronización de stock detectada en el producto {}", barcode),
                None,
            ),
            AppError::DatabaseError(_) => (
                "A database error occurred".to_string(),
                "Ocurrió un error de base de datos".to_string(),
                None,
            ),
            AppError::Configuration(msg) => (
                format!("Configuration error: {}", msg),
                format!("Error de configuración: {}", msg),
                None,
            ),
            AppError::Internal(_) => (
                "An internal error occurred".to_string(),
                "Ocurrió un error interno".to_string(),
                None,
            ),
        };

        ErrorDetail {
            code: self.code().to_string(),
            message_en,
            message_es,
            field,
        }
    }
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;
