pub mod archive;
pub mod audit;
pub mod device;
pub mod dispatch;
pub mod gdpr;
pub mod init;
pub mod job;
pub mod product;
pub mod retention;
pub mod shared;
