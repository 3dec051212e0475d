//! Facility recommendation from stated preferences and booking history.

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::flows::Flow;
use crate::orchestrator::FlowSpec;
use crate::schema::{Field, Shape};

pub const NAME: &str = "facilityRecommendation";

const TEMPLATE: &str = "\
You are the booking assistant of a sports facility platform.
Recommend the single facility that best matches this user.

Preferences: {{preferences}}
Past bookings: {{pastBookings}}

Give the facility name, its type, its location and a short reason that \
refers to the user's preferences or history.";

pub struct RecommendationFlow;

impl Flow for RecommendationFlow {
    const NAME: &'static str = NAME;
    type Input = RecommendationInput;
    type Output = Recommendation;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationInput {
    pub preferences: String,
    /// Free-text summary of earlier bookings; may be empty.
    pub past_bookings: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub facility_name: String,
    pub facility_type: String,
    pub location: String,
    pub reason: String,
}

pub fn spec() -> Result<FlowSpec, FlowError> {
    let input = Shape::object(vec![
        Field::required("preferences", Shape::string_min(3))
            .describe("What the user is looking for"),
        Field::required("pastBookings", Shape::string())
            .describe("Summary of the user's previous bookings"),
    ])
    .strip_unknown();

    let output = Shape::object(vec![
        Field::required("facilityName", Shape::string()),
        Field::required("facilityType", Shape::string()),
        Field::required("location", Shape::string()),
        Field::required("reason", Shape::string()),
    ]);

    FlowSpec::new(
        NAME,
        "Recommend one facility based on preferences and past bookings",
        input,
        output,
        TEMPLATE,
    )
}
