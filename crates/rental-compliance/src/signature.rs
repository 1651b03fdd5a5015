//! Digital Signature Manager.
//!
//! Signs documents with a long-lived Ed25519 key. The key lives hex-encoded at
//! `{key_dir}/signing.key` (0600, directory 0700) and is generated on first
//! use. The signed message is not the raw payload but
//! `payload_hash|document_type|document_id|signer|signed_at`, so a signature
//! survives serialization changes as long as the canonical payload hash does.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use rand_core::OsRng;
use serde::Serialize;

use rental_core::chain::format_timestamp;
use rental_core::digest::{canonical_json, sha256_hex};
use rental_core::entities::DigitalSignature;
use rental_core::ids::PREFIX_SIGNATURE;
use rental_db::RentalDb;

use crate::error::ComplianceError;

pub const ALGORITHM: &str = "Ed25519";
const KEY_FILE: &str = "signing.key";

/// Hash of a payload as covered by signatures and archive records.
///
/// # Errors
///
/// Returns `ComplianceError::Serialization` if the payload is not JSON-representable.
pub fn payload_hash<T: Serialize + ?Sized>(payload: &T) -> Result<String, ComplianceError> {
    Ok(sha256_hex(canonical_json(payload)?))
}

/// The exact bytes that get signed.
#[must_use]
pub fn signing_input(
    payload_hash: &str,
    document_type: &str,
    document_id: &str,
    signer: &str,
    signed_at: DateTime<Utc>,
) -> String {
    format!(
        "{payload_hash}|{document_type}|{document_id}|{signer}|{}",
        format_timestamp(signed_at)
    )
}

pub struct SignatureManager {
    db: Arc<RentalDb>,
    signing_key: SigningKey,
    key_id: String,
    key_path: PathBuf,
}

impl SignatureManager {
    /// Load the signing key from `key_dir`, generating and persisting a new
    /// one if none exists.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Key` for a malformed key file and
    /// `ComplianceError::Io` if the directory or file cannot be accessed.
    pub fn load_or_generate(db: Arc<RentalDb>, key_dir: &Path) -> Result<Self, ComplianceError> {
        let key_path = key_dir.join(KEY_FILE);
        let signing_key = if key_path.exists() {
            load_key(&key_path)?
        } else {
            let key = SigningKey::generate(&mut OsRng);
            store_key(key_dir, &key_path, &key)?;
            tracing::info!(path = %key_path.display(), "generated new signing key");
            key
        };
        let key_id = hex::encode(&signing_key.verifying_key().to_bytes()[..8]);
        Ok(Self {
            db,
            signing_key,
            key_id,
            key_path,
        })
    }

    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// First 8 bytes of the public key, hex.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    #[must_use]
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Sign a payload and persist the signature.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError` if the payload cannot be serialized or the
    /// signature cannot be stored.
    pub async fn sign<T: Serialize + ?Sized>(
        &self,
        document_type: &str,
        document_id: &str,
        payload: &T,
        signer: &str,
    ) -> Result<DigitalSignature, ComplianceError> {
        let hash = payload_hash(payload)?;
        self.sign_hash(document_type, document_id, &hash, signer, Utc::now())
            .await
    }

    /// Sign an already computed payload hash and persist the signature.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError` if the signature cannot be stored.
    pub async fn sign_hash(
        &self,
        document_type: &str,
        document_id: &str,
        payload_hash: &str,
        signer: &str,
        signed_at: DateTime<Utc>,
    ) -> Result<DigitalSignature, ComplianceError> {
        let message = signing_input(payload_hash, document_type, document_id, signer, signed_at);
        let signature = self.signing_key.sign(message.as_bytes());

        let record = DigitalSignature {
            id: self.db.generate_id(PREFIX_SIGNATURE).await?,
            document_type: document_type.to_string(),
            document_id: document_id.to_string(),
            signer: signer.to_string(),
            payload_hash: payload_hash.to_string(),
            signed_at,
            signature: hex::encode(signature.to_bytes()),
            public_key: self.public_key_hex(),
            key_id: self.key_id.clone(),
            algorithm: ALGORITHM.to_string(),
        };
        self.db.insert_signature(&record).await?;
        tracing::debug!(id = %record.id, document_type, document_id, "document signed");
        Ok(record)
    }

    /// Check a signature against the payload as it exists now.
    ///
    /// The payload hash is compared first; a changed payload is rejected
    /// without touching the cryptographic signature.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Serialization` if the payload cannot be serialized.
    pub fn verify<T: Serialize + ?Sized>(
        &self,
        signature: &DigitalSignature,
        current_payload: &T,
    ) -> Result<bool, ComplianceError> {
        let current_hash = payload_hash(current_payload)?;
        Ok(self.verify_hash(signature, &current_hash))
    }

    /// [`Self::verify`] for a caller that already holds the payload hash.
    ///
    /// Only signatures made with this manager's key are accepted. The public
    /// key stored next to a signature is never trusted on its own.
    #[must_use]
    pub fn verify_hash(&self, signature: &DigitalSignature, current_hash: &str) -> bool {
        if signature.public_key != self.public_key_hex() || signature.key_id != self.key_id {
            tracing::warn!(
                id = %signature.id,
                key_id = %signature.key_id,
                trusted = %self.key_id,
                "signature made with an untrusted key"
            );
            return false;
        }
        if signature.payload_hash != current_hash {
            tracing::warn!(id = %signature.id, "payload changed after signing");
            return false;
        }
        if signature.algorithm != ALGORITHM {
            tracing::warn!(id = %signature.id, algorithm = %signature.algorithm, "unsupported algorithm");
            return false;
        }
        let Some(sig) = decode_signature(&signature.signature) else {
            tracing::warn!(id = %signature.id, "malformed signature bytes");
            return false;
        };
        let message = signing_input(
            &signature.payload_hash,
            &signature.document_type,
            &signature.document_id,
            &signature.signer,
            signature.signed_at,
        );
        self.signing_key
            .verifying_key()
            .verify(message.as_bytes(), &sig)
            .is_ok()
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Database` (`NotFound`) for an unknown id.
    pub async fn get(&self, signature_id: &str) -> Result<DigitalSignature, ComplianceError> {
        Ok(self.db.get_signature(signature_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the query fails.
    pub async fn signatures_for(
        &self,
        document_type: &str,
        document_id: &str,
    ) -> Result<Vec<DigitalSignature>, ComplianceError> {
        Ok(self
            .db
            .signatures_for_document(document_type, document_id)
            .await?)
    }
}

fn decode_signature(hex_str: &str) -> Option<Signature> {
    let bytes: [u8; 64] = hex::decode(hex_str).ok()?.try_into().ok()?;
    Some(Signature::from_bytes(&bytes))
}

fn load_key(path: &Path) -> Result<SigningKey, ComplianceError> {
    let raw = fs::read_to_string(path).map_err(|e| ComplianceError::io(path, e))?;
    let bytes = hex::decode(raw.trim())
        .map_err(|e| ComplianceError::Key(format!("{}: invalid hex: {e}", path.display())))?;
    let secret: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
        ComplianceError::Key(format!(
            "{}: expected 32 key bytes, got {}",
            path.display(),
            b.len()
        ))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            let mode = meta.permissions().mode() & 0o777;
            if mode & 0o077 != 0 {
                tracing::warn!(path = %path.display(), mode = format!("{mode:o}"), "signing key is readable by others");
            }
        }
    }

    Ok(SigningKey::from_bytes(&secret))
}

fn store_key(key_dir: &Path, key_path: &Path, key: &SigningKey) -> Result<(), ComplianceError> {
    fs::create_dir_all(key_dir).map_err(|e| ComplianceError::io(key_dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(key_dir, fs::Permissions::from_mode(0o700)) {
            tracing::warn!("failed to chmod 0700 {}: {e}", key_dir.display());
        }
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(key_path)
        .map_err(|e| ComplianceError::io(key_path, e))?;
    file.write_all(hex::encode(key.to_bytes()).as_bytes())
        .map_err(|e| ComplianceError::io(key_path, e))?;
    file.sync_all().map_err(|e| ComplianceError::io(key_path, e))?;
    Ok(())
}
