//! Demo data used by the in-memory store and the SQLite seeder.

use chrono::{Duration, NaiveDate};

use crate::store::Dataset;
use crate::types::{
    Booking, BookingStatus, Facility, MembershipPlan, PricingRule, PromotionRule, SiteSettings,
    SportEvent, Timestamp, User, UserRole,
};

/// Build the demo dataset with bookings spread over the months before `now`.
pub fn demo_dataset(now: Timestamp) -> Dataset {
    let facilities = vec![
        facility("facility-1", "Riverside Tennis Club", "Tennis", "Downtown", 25.0, 4.6),
        facility("facility-2", "Greenfield Soccer Arena", "Soccer", "Northside", 60.0, 4.3),
        facility("facility-3", "Summit Climbing Gym", "Climbing", "Eastgate", 18.0, 4.8),
        facility("facility-4", "Harbor Basketball Courts", "Basketball", "Harbor District", 30.0, 4.1),
        facility("facility-5", "Oakwood Golf Range", "Golf", "Oakwood", 45.0, 4.4),
        facility("facility-6", "Lakeside Pickleball Center", "Pickleball", "Lakeside", 20.0, 4.7),
    ];

    let users = vec![
        user("user-1", "Alex Rivera", "alex@example.com", UserRole::User),
        user("user-2", "Sam Chen", "sam@example.com", UserRole::User),
        user("user-3", "Jordan Patel", "jordan@example.com", UserRole::User),
        user("owner-1", "Morgan Lee", "morgan@example.com", UserRole::Owner),
        user("admin-1", "Casey Brooks", "casey@example.com", UserRole::Admin),
    ];

    // (facility index, days before now, hours, status)
    let plan: [(usize, i64, f64, BookingStatus); 14] = [
        (0, 2, 2.0, BookingStatus::Confirmed),
        (0, 9, 1.0, BookingStatus::Confirmed),
        (1, 12, 1.5, BookingStatus::Confirmed),
        (2, 20, 2.0, BookingStatus::Pending),
        (0, 35, 1.0, BookingStatus::Confirmed),
        (3, 41, 2.0, BookingStatus::Confirmed),
        (4, 47, 1.0, BookingStatus::Cancelled),
        (5, 66, 1.0, BookingStatus::Confirmed),
        (1, 70, 2.0, BookingStatus::Confirmed),
        (2, 95, 3.0, BookingStatus::Confirmed),
        (0, 101, 1.0, BookingStatus::Cancelled),
        (5, 128, 2.0, BookingStatus::Confirmed),
        (3, 150, 1.0, BookingStatus::Confirmed),
        (4, 240, 2.0, BookingStatus::Confirmed),
    ];

    let bookings = plan
        .iter()
        .enumerate()
        .map(|(i, (fac_idx, days_ago, hours, status))| {
            let f = &facilities[*fac_idx];
            let booked_at = now - Duration::days(*days_ago);
            let played = booked_at.date_naive() + Duration::days(3);
            Booking {
                id: format!("booking-{}", i + 1),
                user_id: users[i % 3].id.clone(),
                facility_id: f.id.clone(),
                facility_name: f.name.clone(),
                sport_name: f.sport_type.clone(),
                date: played,
                start_time: "18:00".to_string(),
                end_time: format!("{}:00", 18 + hours.ceil() as u32),
                total_price: f.price_per_hour * hours,
                status: *status,
                booked_at,
            }
        })
        .collect();

    let today = now.date_naive();

    Dataset {
        facilities,
        users,
        bookings,
        settings: SiteSettings::default(),
        events: vec![SportEvent {
            id: "event-1".to_string(),
            name: "Autumn Doubles Open".to_string(),
            facility_id: "facility-1".to_string(),
            sport_name: "Tennis".to_string(),
            start_date: today + Duration::days(14),
            end_date: today + Duration::days(15),
            entry_fee: 40.0,
            max_participants: 32,
        }],
        membership_plans: vec![
            MembershipPlan {
                id: "plan-basic".to_string(),
                name: "Basic".to_string(),
                price_per_month: 19.0,
                benefits: vec!["5% off all bookings".to_string()],
            },
            MembershipPlan {
                id: "plan-pro".to_string(),
                name: "Pro".to_string(),
                price_per_month: 49.0,
                benefits: vec![
                    "15% off all bookings".to_string(),
                    "Priority weekend slots".to_string(),
                ],
            },
        ],
        pricing_rules: vec![PricingRule {
            id: "pricing-peak".to_string(),
            name: "Weekend peak".to_string(),
            facility_id: None,
            multiplier: 1.25,
            days_of_week: vec!["Saturday".to_string(), "Sunday".to_string()],
            start_time: Some("09:00".to_string()),
            end_time: Some("13:00".to_string()),
        }],
        promotion_rules: vec![PromotionRule {
            id: "promo-welcome".to_string(),
            name: "Welcome offer".to_string(),
            code: "WELCOME10".to_string(),
            discount_percent: 10.0,
            valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(today),
            valid_to: today + Duration::days(365),
            active: true,
        }],
    }
}

fn facility(
    id: &str,
    name: &str,
    sport: &str,
    location: &str,
    price_per_hour: f64,
    rating: f64,
) -> Facility {
    Facility {
        id: id.to_string(),
        name: name.to_string(),
        sport_type: sport.to_string(),
        location: location.to_string(),
        price_per_hour,
        rating,
        amenities: vec!["Parking".to_string(), "Changing rooms".to_string()],
        owner_id: Some("owner-1".to_string()),
    }
}

fn user(id: &str, name: &str, email: &str, role: UserRole) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_demo_dataset_is_consistent() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let data = demo_dataset(now);

        assert_eq!(data.facilities.len(), 6);
        assert_eq!(data.bookings.len(), 14);
        for booking in &data.bookings {
            assert!(data.facilities.iter().any(|f| f.id == booking.facility_id));
            assert!(data.users.iter().any(|u| u.id == booking.user_id));
            assert!(booking.booked_at <= now);
            assert!(booking.total_price > 0.0);
        }
    }

    #[test]
    fn test_demo_dataset_is_deterministic_for_same_clock() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let a = demo_dataset(now);
        let b = demo_dataset(now);
        assert_eq!(a.bookings, b.bookings);
    }
}
