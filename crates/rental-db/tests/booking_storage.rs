//! Storage-level booking guarantees, exercised through the public repo API.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use rental_core::entities::{Device, Job, JobDevice, Product};
use rental_core::enums::{DeviceStatus, DiscountType, JobStatus};
use rental_db::RentalDb;
use rental_db::error::DatabaseError;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn job(db: &RentalDb, id: &str, start: &str, end: &str) {
    let now = Utc::now();
    db.insert_job(&Job {
        id: id.into(),
        title: id.to_uppercase(),
        customer_id: Some("cust-1".into()),
        start_date: date(start),
        end_date: date(end),
        status: JobStatus::Open,
        discount: Decimal::ZERO,
        discount_type: DiscountType::Percent,
        revenue: Decimal::ZERO,
        final_revenue: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    })
    .await
    .unwrap();
}

fn link(job: &str, device: &str) -> JobDevice {
    JobDevice {
        job_id: job.into(),
        device_id: device.into(),
        custom_price: None,
        assigned_at: Utc::now(),
        returned_at: None,
    }
}

#[tokio::test]
async fn concurrent_double_booking_is_refused_by_storage() {
    let db = RentalDb::open_local(":memory:").await.unwrap();
    let now = Utc::now();
    db.insert_product(&Product {
        id: "prd-1".into(),
        name: "Moving head".into(),
        flat_rate: Decimal::from(100),
        created_at: now,
    })
    .await
    .unwrap();
    db.insert_device(&Device {
        id: "dev-1".into(),
        name: "Moving head #1".into(),
        product_id: Some("prd-1".into()),
        serial_number: Some("MH-0001".into()),
        status: DeviceStatus::Free,
        created_at: now,
        updated_at: now,
    })
    .await
    .unwrap();
    job(&db, "job-a", "2024-06-01", "2024-06-05").await;
    job(&db, "job-b", "2024-06-03", "2024-06-10").await;

    // Both requests passed an application-level availability check; only the
    // first insert may land.
    let link_a = link("job-a", "dev-1");
    let link_b = link("job-b", "dev-1");
    let (first, second) = tokio::join!(
        db.insert_assignment_if_free(&link_a),
        db.insert_assignment_if_free(&link_b),
    );
    let outcomes = [first, second];
    let landed = outcomes.iter().filter(|r| matches!(r, Ok(true))).count();
    let refused = outcomes
        .iter()
        .filter(|r| matches!(r, Err(DatabaseError::Constraint(m)) if m.contains("device_conflict")))
        .count();
    assert_eq!((landed, refused), (1, 1));

    let bookings = db.bookings_for_device("dev-1").await.unwrap();
    assert_eq!(bookings.len(), 1);
}
