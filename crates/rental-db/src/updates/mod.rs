//! Update builder types for entity mutations.
//!
//! Each builder produces an update struct with `Option` fields. Only `Some`
//! fields generate SET clauses in the dynamic UPDATE SQL. The serialized update
//! (changed fields only) is what callers record as the audit `new_values`.

pub mod job;
