//! ID prefix constants.
//!
//! Every persisted entity gets an ID of the form `{prefix}-{8 hex chars}`,
//! generated by the database layer.

pub const PREFIX_AUDIT: &str = "aud";
pub const PREFIX_ARCHIVE: &str = "arc";
pub const PREFIX_SIGNATURE: &str = "sig";
pub const PREFIX_POLICY: &str = "pol";
pub const PREFIX_PRODUCT: &str = "prd";
pub const PREFIX_DEVICE: &str = "dev";
pub const PREFIX_JOB: &str = "job";
pub const PREFIX_CONSENT: &str = "cns";
pub const PREFIX_REQUEST: &str = "dsr";

/// All prefixes, for exhaustive format tests.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_AUDIT,
    PREFIX_ARCHIVE,
    PREFIX_SIGNATURE,
    PREFIX_POLICY,
    PREFIX_PRODUCT,
    PREFIX_DEVICE,
    PREFIX_JOB,
    PREFIX_CONSENT,
    PREFIX_REQUEST,
];
