use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Detached Ed25519 signature over a document's payload hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DigitalSignature {
    pub id: String,
    pub document_type: String,
    pub document_id: String,
    pub signer: String,
    /// SHA-256 of the canonical payload at signing time.
    pub payload_hash: String,
    pub signed_at: DateTime<Utc>,
    /// Hex-encoded 64-byte signature.
    pub signature: String,
    /// Hex-encoded 32-byte verifying key.
    pub public_key: String,
    pub key_id: String,
    pub algorithm: String,
}
