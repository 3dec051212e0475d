//! Read-only aggregation tools the model may call mid-generation.
//!
//! Every tool reads the current collections through the `DataSource`,
//! recomputes its aggregate from scratch and validates the result against
//! its declared output shape. Nothing is cached.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use courtside_core::store::DataSource;
use courtside_core::types::{Booking, Timestamp};

use crate::error::ToolError;
use crate::schema::{Field, Shape};

pub const GET_APP_STATS: &str = "getAppStats";
pub const GET_POPULAR_SPORTS: &str = "getPopularSports";
pub const GET_REVENUE_TREND: &str = "getRevenueTrend";

const POPULAR_SPORTS_LIMIT: usize = 5;
const REVENUE_TREND_MONTHS: u32 = 6;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// =============================================================================
// Aggregate types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStats {
    pub total_users: usize,
    pub total_facilities: usize,
    pub total_bookings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportPopularity {
    pub sport_name: String,
    pub booking_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// "Mon YYYY", e.g. "Oct 2026".
    pub month: String,
    pub revenue: f64,
    pub bookings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTrend {
    pub months: Vec<MonthlyRevenue>,
    pub total_revenue: f64,
    pub total_bookings: usize,
}

// =============================================================================
// Pure aggregations
// =============================================================================

/// Counts every user, facility and booking regardless of booking status.
pub fn app_stats(users: usize, facilities: usize, bookings: &[Booking]) -> AppStats {
    AppStats {
        total_users: users,
        total_facilities: facilities,
        total_bookings: bookings.len(),
    }
}

/// Confirmed bookings grouped by sport, most booked first.
///
/// Ties keep the order in which each sport was first encountered.
pub fn popular_sports(bookings: &[Booking], limit: usize) -> Vec<SportPopularity> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<SportPopularity> = Vec::new();

    for booking in bookings.iter().filter(|b| b.status.is_confirmed()) {
        match index.get(booking.sport_name.as_str()) {
            Some(&i) => counts[i].booking_count += 1,
            None => {
                index.insert(booking.sport_name.as_str(), counts.len());
                counts.push(SportPopularity {
                    sport_name: booking.sport_name.clone(),
                    booking_count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.booking_count.cmp(&a.booking_count));
    counts.truncate(limit);
    counts
}

/// Confirmed revenue per calendar month over the trailing `months` months
/// ending with the month of `now`, oldest first.
pub fn revenue_trend(bookings: &[Booking], now: Timestamp, months: u32) -> RevenueTrend {
    let current = month_index(now.year(), now.month());
    let first = current - i64::from(months) + 1;

    let mut revenue = vec![0.0_f64; months as usize];
    let mut counts = vec![0_usize; months as usize];

    for booking in bookings.iter().filter(|b| b.status.is_confirmed()) {
        let idx = month_index(booking.booked_at.year(), booking.booked_at.month());
        if (first..=current).contains(&idx) {
            let slot = (idx - first) as usize;
            revenue[slot] += booking.total_price;
            counts[slot] += 1;
        }
    }

    let entries: Vec<MonthlyRevenue> = (0..months as usize)
        .map(|slot| MonthlyRevenue {
            month: month_label(first + slot as i64),
            revenue: round_cents(revenue[slot]),
            bookings: counts[slot],
        })
        .collect();

    RevenueTrend {
        total_revenue: round_cents(entries.iter().map(|m| m.revenue).sum()),
        total_bookings: entries.iter().map(|m| m.bookings).sum(),
        months: entries,
    }
}

fn month_index(year: i32, month: u32) -> i64 {
    i64::from(year) * 12 + i64::from(month) - 1
}

fn month_label(index: i64) -> String {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as usize;
    format!("{} {}", MONTH_ABBREVIATIONS[month], year)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Tool registry
// =============================================================================

/// A side-effect-free data function.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, source: &dyn DataSource, now: Timestamp) -> Result<Value, ToolError>;
}

/// What the model sees of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments. The built-in tools take none.
    pub parameters: Value,
}

pub struct ToolSpec {
    pub name: String,
    /// Guidance for the model on when to call the tool.
    pub description: String,
    pub output: Shape,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolSpec {
    pub fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Registry of named tools bound to one data source.
pub struct ToolRegistry {
    tools: HashMap<String, ToolSpec>,
    source: Arc<dyn DataSource>,
    clock: Clock,
}

impl ToolRegistry {
    /// Empty registry reading from `source`.
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            tools: HashMap::new(),
            source,
            clock: Arc::new(Utc::now),
        }
    }

    /// Registry with the three aggregation tools registered.
    pub fn with_defaults(source: Arc<dyn DataSource>) -> Self {
        let mut registry = Self::new(source);
        registry.register_defaults();
        registry
    }

    /// Replace the wall clock used for the revenue window.
    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn register(&mut self, spec: ToolSpec) {
        debug!(tool = %spec.name, "Registered tool");
        self.tools.insert(spec.name.clone(), spec);
    }

    pub fn register_defaults(&mut self) {
        self.register(app_stats_tool());
        self.register(popular_sports_tool());
        self.register(revenue_trend_tool());
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Run a tool and validate its output.
    pub async fn invoke(&self, name: &str) -> Result<Value, ToolError> {
        let spec = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let start = Instant::now();
        let raw = match spec.handler.call(self.source.as_ref(), (self.clock)()).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool failed");
                return Err(e);
            }
        };
        let value = spec.output.validate(&raw).map_err(ToolError::InvalidOutput)?;

        debug!(
            tool = name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tool executed"
        );
        Ok(value)
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Built-in tools
// =============================================================================

struct AppStatsTool;

#[async_trait]
impl ToolHandler for AppStatsTool {
    async fn call(&self, source: &dyn DataSource, _now: Timestamp) -> Result<Value, ToolError> {
        let users = source.users().await?;
        let facilities = source.facilities().await?;
        let bookings = source.bookings().await?;
        Ok(to_value(app_stats(users.len(), facilities.len(), &bookings)))
    }
}

struct PopularSportsTool;

#[async_trait]
impl ToolHandler for PopularSportsTool {
    async fn call(&self, source: &dyn DataSource, _now: Timestamp) -> Result<Value, ToolError> {
        let bookings = source.bookings().await?;
        Ok(to_value(popular_sports(&bookings, POPULAR_SPORTS_LIMIT)))
    }
}

struct RevenueTrendTool;

#[async_trait]
impl ToolHandler for RevenueTrendTool {
    async fn call(&self, source: &dyn DataSource, now: Timestamp) -> Result<Value, ToolError> {
        let bookings = source.bookings().await?;
        Ok(to_value(revenue_trend(&bookings, now, REVENUE_TREND_MONTHS)))
    }
}

fn to_value<T: Serialize>(aggregate: T) -> Value {
    serde_json::to_value(aggregate).unwrap_or(Value::Null)
}

fn app_stats_tool() -> ToolSpec {
    ToolSpec {
        name: GET_APP_STATS.to_string(),
        description: "Get the total number of users, facilities and bookings on the platform."
            .to_string(),
        output: Shape::object(vec![
            Field::required("totalUsers", Shape::count()),
            Field::required("totalFacilities", Shape::count()),
            Field::required("totalBookings", Shape::count()),
        ]),
        handler: Arc::new(AppStatsTool),
    }
}

fn popular_sports_tool() -> ToolSpec {
    ToolSpec {
        name: GET_POPULAR_SPORTS.to_string(),
        description: "Get the five most popular sports by number of confirmed bookings."
            .to_string(),
        output: Shape::array(Shape::object(vec![
            Field::required("sportName", Shape::string()),
            Field::required("bookingCount", Shape::count()),
        ])),
        handler: Arc::new(PopularSportsTool),
    }
}

fn revenue_trend_tool() -> ToolSpec {
    ToolSpec {
        name: GET_REVENUE_TREND.to_string(),
        description: "Get confirmed revenue and booking counts for each of the last six months."
            .to_string(),
        output: Shape::object(vec![
            Field::required(
                "months",
                Shape::array(Shape::object(vec![
                    Field::required("month", Shape::string()),
                    Field::required("revenue", Shape::non_negative_number()),
                    Field::required("bookings", Shape::count()),
                ])),
            ),
            Field::required("totalRevenue", Shape::non_negative_number()),
            Field::required("totalBookings", Shape::count()),
        ]),
        handler: Arc::new(RevenueTrendTool),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use async_trait::async_trait;
    use courtside_core::error::{CourtsideError, Result};
    use courtside_core::store::DataSource;
    use courtside_core::types::{
        Booking, Facility, MembershipPlan, PricingRule, PromotionRule, SiteSettings, SportEvent,
        User,
    };

    /// Data source whose collections always fail, as an unreachable database would.
    pub(crate) struct UnreachableSource;

    fn refused() -> CourtsideError {
        CourtsideError::DataUnavailable("connection refused".into())
    }

    #[async_trait]
    impl DataSource for UnreachableSource {
        async fn facilities(&self) -> Result<Vec<Facility>> {
            Err(refused())
        }
        async fn users(&self) -> Result<Vec<User>> {
            Err(refused())
        }
        async fn bookings(&self) -> Result<Vec<Booking>> {
            Err(refused())
        }
        async fn site_settings(&self) -> Result<SiteSettings> {
            Err(refused())
        }
        async fn event(&self, _id: &str) -> Result<Option<SportEvent>> {
            Ok(None)
        }
        async fn membership_plan(&self, _id: &str) -> Result<Option<MembershipPlan>> {
            Ok(None)
        }
        async fn pricing_rule(&self, _id: &str) -> Result<Option<PricingRule>> {
            Ok(None)
        }
        async fn promotion_rule(&self, _id: &str) -> Result<Option<PromotionRule>> {
            Ok(None)
        }
    }
}
