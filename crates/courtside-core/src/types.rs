use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// UTC timestamp used throughout the domain.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// Enums
// =============================================================================

/// Account role of a registered user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    /// Manages one or more facilities.
    Owner,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Owner => write!(f, "owner"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "owner" => Ok(UserRole::Owner),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("Unknown user role: {}", s)),
        }
    }
}

/// Booking lifecycle status.
///
/// Serialized with the capitalized names the booking screens display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Cancelled,
}

impl BookingStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Confirmed => write!(f, "Confirmed"),
            BookingStatus::Pending => write!(f, "Pending"),
            BookingStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "pending" => Ok(BookingStatus::Pending),
            "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// A bookable sports facility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: String,
    /// Primary sport, e.g. "Tennis".
    pub sport_type: String,
    pub location: String,
    pub price_per_hour: f64,
    /// Average review rating, 0.0 to 5.0.
    pub rating: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl Facility {
    /// One-line description handed to planning prompts.
    pub fn summary_line(&self, currency: &str) -> String {
        format!(
            "{} ({}) in {}, {:.2} {}/hour, rated {:.1}",
            self.name, self.sport_type, self.location, self.price_per_hour, currency, self.rating
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

/// A reservation of a facility time slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub facility_id: String,
    pub facility_name: String,
    pub sport_name: String,
    /// Day the slot is played.
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub total_price: f64,
    pub status: BookingStatus,
    /// When the booking was made. Revenue reporting buckets on this.
    pub booked_at: Timestamp,
}

/// Site-wide settings editable from the admin screens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    /// ISO 4217 code, e.g. "USD".
    pub default_currency: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Courtside".to_string(),
            default_currency: "USD".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SportEvent {
    pub id: String,
    pub name: String,
    pub facility_id: String,
    pub sport_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub entry_fee: f64,
    pub max_participants: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub id: String,
    pub name: String,
    pub price_per_month: f64,
    #[serde(default)]
    pub benefits: Vec<String>,
}

/// Price adjustment applied to matching slots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: String,
    pub name: String,
    /// `None` applies to every facility.
    #[serde(default)]
    pub facility_id: Option<String>,
    /// Multiplier on the hourly price, e.g. 1.25 for peak hours.
    pub multiplier: f64,
    #[serde(default)]
    pub days_of_week: Vec<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromotionRule {
    pub id: String,
    pub name: String,
    pub code: String,
    pub discount_percent: f64,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub active: bool,
}

impl PromotionRule {
    pub fn is_valid_on(&self, day: NaiveDate) -> bool {
        self.active && day >= self.valid_from && day <= self.valid_to
    }
}

// =============================================================================
// Invocation context
// =============================================================================

/// Caller context passed explicitly into every flow invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowContext {
    /// Signed-in user, if any.
    pub user_id: Option<String>,
    pub request_id: Uuid,
}

impl FlowContext {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            request_id: Uuid::new_v4(),
        }
    }
}

impl Default for FlowContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_status_serializes_capitalized() {
        let json = serde_json::to_string(&BookingStatus::Confirmed).unwrap();
        assert_eq!(json, "\"Confirmed\"");
        let back: BookingStatus = serde_json::from_str("\"Cancelled\"").unwrap();
        assert_eq!(back, BookingStatus::Cancelled);
    }

    #[test]
    fn test_booking_status_from_str_case_insensitive() {
        assert_eq!("confirmed".parse::<BookingStatus>(), Ok(BookingStatus::Confirmed));
        assert_eq!("PENDING".parse::<BookingStatus>(), Ok(BookingStatus::Pending));
        assert_eq!("canceled".parse::<BookingStatus>(), Ok(BookingStatus::Cancelled));
        assert!("booked".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_booking_status_display_matches_parse() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::Pending,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<BookingStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_user_role_roundtrip() {
        for role in [UserRole::User, UserRole::Owner, UserRole::Admin] {
            assert_eq!(role.to_string().parse::<UserRole>(), Ok(role));
        }
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_facility_summary_line() {
        let facility = Facility {
            id: "f1".into(),
            name: "Riverside Courts".into(),
            sport_type: "Tennis".into(),
            location: "Downtown".into(),
            price_per_hour: 25.0,
            rating: 4.5,
            amenities: vec![],
            owner_id: None,
        };
        assert_eq!(
            facility.summary_line("EUR"),
            "Riverside Courts (Tennis) in Downtown, 25.00 EUR/hour, rated 4.5"
        );
    }

    #[test]
    fn test_promotion_validity_window() {
        let promo = PromotionRule {
            id: "p1".into(),
            name: "Spring".into(),
            code: "SPRING10".into(),
            discount_percent: 10.0,
            valid_from: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            valid_to: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            active: true,
        };
        assert!(promo.is_valid_on(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()));
        assert!(!promo.is_valid_on(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()));

        let inactive = PromotionRule {
            active: false,
            ..promo
        };
        assert!(!inactive.is_valid_on(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()));
    }

    #[test]
    fn test_flow_context_request_ids_are_unique() {
        let a = FlowContext::anonymous();
        let b = FlowContext::for_user("u1");
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(b.user_id.as_deref(), Some("u1"));
        assert!(a.user_id.is_none());
    }
}
