//! Shared test utilities for rental-db unit tests.

pub(crate) mod helpers {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use rental_core::entities::{Device, Job, Product};
    use rental_core::enums::{DeviceStatus, DiscountType, JobStatus};

    use crate::RentalDb;

    pub async fn test_db() -> RentalDb {
        RentalDb::open_local(":memory:").await.unwrap()
    }

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub async fn seed_product(db: &RentalDb, rate: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: db.generate_id("prd").await.unwrap(),
            name: "Line array".into(),
            flat_rate: Decimal::from(rate),
            created_at: now,
        };
        db.insert_product(&product).await.unwrap();
        product
    }

    pub async fn seed_device(db: &RentalDb, product_id: Option<&str>) -> Device {
        let now = Utc::now();
        let device = Device {
            id: db.generate_id("dev").await.unwrap(),
            name: "Speaker".into(),
            product_id: product_id.map(String::from),
            serial_number: None,
            status: DeviceStatus::Free,
            created_at: now,
            updated_at: now,
        };
        db.insert_device(&device).await.unwrap();
        device
    }

    pub async fn seed_job(db: &RentalDb, start: &str, end: &str) -> Job {
        let now = Utc::now();
        let job = Job {
            id: db.generate_id("job").await.unwrap(),
            title: format!("Festival {start}"),
            customer_id: None,
            start_date: date(start),
            end_date: date(end),
            status: JobStatus::Open,
            discount: Decimal::ZERO,
            discount_type: DiscountType::Percent,
            revenue: Decimal::ZERO,
            final_revenue: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        db.insert_job(&job).await.unwrap();
        job
    }
}
