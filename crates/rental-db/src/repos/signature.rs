//! Digital signature repository.

use rental_core::entities::DigitalSignature;

use crate::RentalDb;
use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, parse_datetime};

const SELECT_COLS: &str = "id, document_type, document_id, signer, payload_hash, signed_at, \
     signature, public_key, key_id, algorithm";

fn row_to_signature(row: &libsql::Row) -> Result<DigitalSignature, DatabaseError> {
    Ok(DigitalSignature {
        id: row.get(0)?,
        document_type: row.get(1)?,
        document_id: row.get(2)?,
        signer: row.get(3)?,
        payload_hash: row.get(4)?,
        signed_at: parse_datetime(&row.get::<String>(5)?)?,
        signature: row.get(6)?,
        public_key: row.get(7)?,
        key_id: row.get(8)?,
        algorithm: row.get(9)?,
    })
}

impl RentalDb {
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn insert_signature(&self, sig: &DigitalSignature) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO digital_signatures ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                libsql::params![
                    sig.id.as_str(),
                    sig.document_type.as_str(),
                    sig.document_id.as_str(),
                    sig.signer.as_str(),
                    sig.payload_hash.as_str(),
                    format_timestamp(sig.signed_at),
                    sig.signature.as_str(),
                    sig.public_key.as_str(),
                    sig.key_id.as_str(),
                    sig.algorithm.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no signature has this id.
    pub async fn get_signature(&self, id: &str) -> Result<DigitalSignature, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SELECT_COLS} FROM digital_signatures WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("signature", id))?;
        row_to_signature(&row)
    }

    /// Signatures for one document, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn signatures_for_document(
        &self,
        document_type: &str,
        document_id: &str,
    ) -> Result<Vec<DigitalSignature>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM digital_signatures
                     WHERE document_type = ?1 AND document_id = ?2
                     ORDER BY signed_at ASC"
                ),
                [document_type, document_id],
            )
            .await?;
        let mut sigs = Vec::new();
        while let Some(row) = rows.next().await? {
            sigs.push(row_to_signature(&row)?);
        }
        Ok(sigs)
    }
}
