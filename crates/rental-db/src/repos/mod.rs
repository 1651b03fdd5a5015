//! Repository modules implementing persistence for all RentalCore entities.
//!
//! Each module adds methods to `RentalDb` via `impl RentalDb` blocks.

pub mod archive;
pub mod assignment;
pub mod audit;
pub mod device;
pub mod gdpr;
pub mod job;
pub mod retention;
pub mod signature;
