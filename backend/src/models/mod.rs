//! Database models for the Warehouse Stock Management Platform
//!
//! Re-exports the domain models from the shared crate

pub use shared::models::*;
