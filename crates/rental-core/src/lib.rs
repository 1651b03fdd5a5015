//! # rental-core
//!
//! Core types, ID prefixes, and error types for RentalCore.
//!
//! This crate provides the foundational types shared across all RentalCore crates:
//! - Entity structs for the compliance ledger (audit events, retention policies,
//!   archive records, signatures, GDPR records) and the booking engine (products,
//!   devices, jobs, assignments)
//! - Status enums with state machine transitions
//! - ID prefix constants
//! - Cross-cutting error types and error classification
//! - Typed audit payloads
//! - The pure algorithms: audit hash chaining, closed-interval availability, and
//!   discount-aware revenue calculation

pub mod audit_detail;
pub mod availability;
pub mod chain;
pub mod digest;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod revenue;
