//! Entity structs for all RentalCore domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `rental-db/migrations/001_initial.sql`). All structs derive `Serialize` and
//! `Deserialize` for JSON roundtrip, CLI output, and archive snapshots.

mod archive;
mod audit;
mod device;
mod gdpr;
mod job;
mod retention;
mod signature;

pub use archive::ArchivedRecord;
pub use audit::{Actor, AuditEvent, RequestContext};
pub use device::{Device, Product};
pub use gdpr::{ConsentRecord, DataSubjectRequest};
pub use job::{Job, JobDevice};
pub use retention::RetentionPolicy;
pub use signature::DigitalSignature;
