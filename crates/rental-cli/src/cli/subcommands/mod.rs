mod archive;
mod audit;
mod device;
mod gdpr;
mod job;
mod product;
mod retention;

pub use archive::ArchiveCommands;
pub use audit::AuditCommands;
pub use device::DeviceCommands;
pub use gdpr::GdprCommands;
pub use job::JobCommands;
pub use product::ProductCommands;
pub use retention::RetentionCommands;
