//! Shared types and domain logic for the Warehouse Stock Management Platform
//!
//! This crate contains the pure core of the inventory consistency engine:
//! domain models, the ledger balance fold, FIFO-by-expiry allocation
//! planning, expiration classification and reconciliation planning.
//! No I/O lives here; the backend crate wires these into Postgres.

pub mod allocation;
pub mod models;
pub mod reconcile;
pub mod validation;

pub use allocation::*;
pub use models::*;
pub use reconcile::*;
pub use validation::*;
