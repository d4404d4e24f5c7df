//! Business logic services for the Warehouse Stock Management Platform

pub mod expiration;
pub mod ledger;
pub mod locking;
pub mod lot;
pub mod movement;
pub mod product;
pub mod reconcile;

pub use expiration::ExpirationService;
pub use ledger::LedgerService;
pub use lot::LotService;
pub use movement::MovementService;
pub use product::ProductService;
pub use reconcile::ReconciliationService;
