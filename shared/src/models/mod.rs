//! Domain models for the Warehouse Stock Management Platform

mod draft;
mod expiration;
mod ledger;
mod lot;
mod product;

pub use draft::*;
pub use expiration::*;
pub use ledger::*;
pub use lot::*;
pub use product::*;
