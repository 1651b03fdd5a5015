//! Product and device repository.

use chrono::{DateTime, Utc};

use rental_core::entities::{Device, Product};
use rental_core::enums::DeviceStatus;

use crate::RentalDb;
use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_opt_string, parse_datetime, parse_decimal, parse_enum};

const PRODUCT_COLS: &str = "id, name, flat_rate, created_at";
const DEVICE_COLS: &str = "id, name, product_id, serial_number, status, created_at, updated_at";

fn row_to_product(row: &libsql::Row) -> Result<Product, DatabaseError> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        flat_rate: parse_decimal(&row.get::<String>(2)?)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
    })
}

fn row_to_device(row: &libsql::Row) -> Result<Device, DatabaseError> {
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        product_id: get_opt_string(row, 2)?,
        serial_number: get_opt_string(row, 3)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

impl RentalDb {
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn insert_product(&self, product: &Product) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                &format!("INSERT INTO products ({PRODUCT_COLS}) VALUES (?1, ?2, ?3, ?4)"),
                libsql::params![
                    product.id.as_str(),
                    product.name.as_str(),
                    product.flat_rate.to_string(),
                    format_timestamp(product.created_at)
                ],
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no product has this id.
    pub async fn get_product(&self, id: &str) -> Result<Product, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {PRODUCT_COLS} FROM products WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("product", id))?;
        row_to_product(&row)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails (unknown product, duplicate
    /// serial number).
    pub async fn insert_device(&self, device: &Device) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                &format!("INSERT INTO devices ({DEVICE_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                libsql::params![
                    device.id.as_str(),
                    device.name.as_str(),
                    device.product_id.as_deref(),
                    device.serial_number.as_deref(),
                    device.status.as_str(),
                    format_timestamp(device.created_at),
                    format_timestamp(device.updated_at)
                ],
            )
            .await
            .map_err(|e| DatabaseError::constraint_or(e, "constraint failed"))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no device has this id.
    pub async fn get_device(&self, id: &str) -> Result<Device, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {DEVICE_COLS} FROM devices WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("device", id))?;
        row_to_device(&row)
    }

    /// Devices ordered by name, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_devices(
        &self,
        status: Option<DeviceStatus>,
        limit: u32,
    ) -> Result<Vec<Device>, DatabaseError> {
        let mut rows = match status {
            Some(status) => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {DEVICE_COLS} FROM devices WHERE status = ?1
                             ORDER BY name ASC, id ASC LIMIT ?2"
                        ),
                        libsql::params![status.as_str(), i64::from(limit)],
                    )
                    .await?
            }
            None => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {DEVICE_COLS} FROM devices ORDER BY name ASC, id ASC LIMIT ?1"
                        ),
                        [i64::from(limit)],
                    )
                    .await?
            }
        };
        let mut devices = Vec::new();
        while let Some(row) = rows.next().await? {
            devices.push(row_to_device(&row)?);
        }
        Ok(devices)
    }

    /// Unconditionally set a device's status. State machine checks belong to
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no device has this id.
    pub async fn set_device_status(
        &self,
        id: &str,
        status: DeviceStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE devices SET status = ?2, updated_at = ?3 WHERE id = ?1",
                libsql::params![id, status.as_str(), format_timestamp(now)],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("device", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::test_support::helpers::{seed_device, seed_product, test_db};

    #[tokio::test]
    async fn product_roundtrip_keeps_decimal() {
        let db = test_db().await;
        let product = Product {
            id: "prd-1".into(),
            name: "Mixer".into(),
            flat_rate: Decimal::new(4999, 2),
            created_at: Utc::now(),
        };
        db.insert_product(&product).await.unwrap();
        assert_eq!(db.get_product("prd-1").await.unwrap(), product);
    }

    #[tokio::test]
    async fn device_status_update_and_filter() {
        let db = test_db().await;
        let product = seed_product(&db, 100).await;
        let a = seed_device(&db, Some(&product.id)).await;
        let _b = seed_device(&db, None).await;

        db.set_device_status(&a.id, DeviceStatus::Maintenance, Utc::now())
            .await
            .unwrap();
        let in_maintenance = db
            .list_devices(Some(DeviceStatus::Maintenance), 50)
            .await
            .unwrap();
        assert_eq!(in_maintenance.len(), 1);
        assert_eq!(in_maintenance[0].id, a.id);
        assert_eq!(db.list_devices(None, 50).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let db = test_db().await;
        let now = Utc::now();
        let device = Device {
            id: "dev-1".into(),
            name: "Orphan".into(),
            product_id: Some("prd-missing".into()),
            serial_number: None,
            status: DeviceStatus::Free,
            created_at: now,
            updated_at: now,
        };
        assert!(db.insert_device(&device).await.is_err());
    }

    #[tokio::test]
    async fn status_of_missing_device_is_not_found() {
        let db = test_db().await;
        let err = db
            .set_device_status("dev-missing", DeviceStatus::Free, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
