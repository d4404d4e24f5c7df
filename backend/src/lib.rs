//! Warehouse Stock Management Platform - Inventory Consistency Engine
//!
//! Keeps the three views of stock in agreement for every product: the
//! append-only movement ledger (the source of truth), the expiration-dated
//! lots, and the cached aggregate counter. Surrounding request-handling
//! code calls into the services exposed here; persistence is Postgres.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
