//! Benchmarks for the aggregation tools and output validation.
//!
//! Tools recompute from the full booking list on every call, so their cost
//! grows with the number of bookings. These benchmarks measure that growth.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use courtside_core::types::{Booking, BookingStatus, Timestamp};
use courtside_flows::flows::business_presentation;
use courtside_flows::tools::{popular_sports, revenue_trend};
use serde_json::json;

const SPORTS: [&str; 8] = [
    "Tennis",
    "Soccer",
    "Climbing",
    "Basketball",
    "Golf",
    "Pickleball",
    "Squash",
    "Padel",
];

fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

/// Bookings spread over the past year with a mix of statuses.
fn generate_bookings(count: usize) -> Vec<Booking> {
    let now = now();
    (0..count)
        .map(|i| {
            let status = match i % 5 {
                0 => BookingStatus::Cancelled,
                1 => BookingStatus::Pending,
                _ => BookingStatus::Confirmed,
            };
            Booking {
                id: format!("booking-{}", i),
                user_id: format!("user-{}", i % 50),
                facility_id: format!("facility-{}", i % 12),
                facility_name: format!("Facility {}", i % 12),
                sport_name: SPORTS[(i * 7) % SPORTS.len()].to_string(),
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                start_time: "18:00".to_string(),
                end_time: "19:00".to_string(),
                total_price: 10.0 + (i % 40) as f64,
                status,
                booked_at: now - ChronoDuration::hours((i % 8760) as i64),
            }
        })
        .collect()
}

fn bench_aggregations(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregations");
    group.measurement_time(Duration::from_secs(5));

    for size in [100usize, 1_000, 10_000] {
        let bookings = generate_bookings(size);

        group.bench_with_input(BenchmarkId::new("popular_sports", size), &bookings, |b, bk| {
            b.iter(|| popular_sports(black_box(bk), 5));
        });

        group.bench_with_input(BenchmarkId::new("revenue_trend", size), &bookings, |b, bk| {
            b.iter(|| revenue_trend(black_box(bk), now(), 6));
        });
    }

    group.finish();
}

fn bench_output_validation(c: &mut Criterion) {
    let spec = business_presentation::spec().unwrap();
    let slides: Vec<_> = (0..20)
        .map(|i| {
            json!({
                "slideTitle": format!("Slide {}", i),
                "icon": "chart",
                "bulletPoints": ["Revenue up", "Bookings steady", "Tennis leads"],
                "narrative": "Speaker notes for this slide."
            })
        })
        .collect();
    let deck = json!({ "title": "Quarterly review", "summary": "All good", "slides": slides });

    c.bench_function("validate_presentation_20_slides", |b| {
        b.iter(|| spec.output.validate(black_box(&deck)));
    });
}

criterion_group!(benches, bench_aggregations, bench_output_validation);
criterion_main!(benches);
