//! # rental-booking
//!
//! Availability and revenue engine. Devices are temporally exclusive: one
//! device may be held by at most one open or in-progress job over any
//! overlapping date range (closed on both ends). Every assignment change
//! recomputes the job's revenue from scratch.

pub mod availability;
pub mod engine;
pub mod error;

pub use availability::{Availability, ConflictingJob, UnavailableReason};
pub use engine::{AssignOutcome, BookingEngine, BulkAssignReport, NewJob, RejectedDevice};
pub use error::BookingError;
