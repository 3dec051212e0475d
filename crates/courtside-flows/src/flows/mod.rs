//! The five booking-platform flows.

pub mod business_presentation;
pub mod facility_image;
pub mod recommendation;
pub mod review_summary;
pub mod weekend_planner;

use serde::de::DeserializeOwned;
use serde::Serialize;

use courtside_core::config::FlowsConfig;

use crate::error::FlowError;
use crate::orchestrator::FlowSpec;
use crate::schema::{Shape, StringRules};

pub use business_presentation::{
    BusinessPresentationFlow, Presentation, PresentationInput, Slide,
};
pub use facility_image::{FacilityImage, FacilityImageFlow, FacilityImageInput};
pub use recommendation::{Recommendation, RecommendationFlow, RecommendationInput};
pub use review_summary::{ReviewSummary, ReviewSummaryFlow, ReviewSummaryInput};
pub use weekend_planner::{PlanItem, WeekendPlan, WeekendPlannerFlow, WeekendPlannerInput};

/// Compile-time binding between a flow name and its typed input and output.
pub trait Flow {
    const NAME: &'static str;
    type Input: Serialize + Send + Sync;
    type Output: DeserializeOwned;
}

/// Definitions for every built-in flow.
pub fn default_specs(limits: &FlowsConfig) -> Result<Vec<FlowSpec>, FlowError> {
    Ok(vec![
        recommendation::spec()?,
        weekend_planner::spec()?,
        review_summary::spec(limits.min_reviews_for_summary)?,
        facility_image::spec()?,
        business_presentation::spec()?,
    ])
}

/// ISO 4217 style three-letter currency code.
pub(crate) fn currency_shape() -> Shape {
    Shape::string_with(StringRules::default().min_len(3).max_len(3))
}
