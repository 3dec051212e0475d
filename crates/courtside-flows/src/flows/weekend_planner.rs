//! Weekend activity planning over the facilities the platform offers.

use serde::{Deserialize, Serialize};

use courtside_core::error::CourtsideError;
use courtside_core::store::DataSource;

use crate::error::FlowError;
use crate::flows::{currency_shape, Flow};
use crate::orchestrator::FlowSpec;
use crate::schema::{Field, Shape};

pub const NAME: &str = "weekendPlanner";

const TEMPLATE: &str = "\
You are a weekend activity planner for a sports facility booking platform.
Plan Saturday and Sunday for the user using only the facilities listed below.
All prices are in {{currency}}.

Available facilities:
{{#each facilities}}- {{this}}
{{/each}}
User request: {{request}}

For every activity give the day, a time, the activity, the facility name, \
the estimated cost and a short reason. Finish with a brief summary of the \
whole weekend.";

pub struct WeekendPlannerFlow;

impl Flow for WeekendPlannerFlow {
    const NAME: &'static str = NAME;
    type Input = WeekendPlannerInput;
    type Output = WeekendPlan;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekendPlannerInput {
    pub request: String,
    /// One summary line per facility, supplied by the server.
    pub facilities: Vec<String>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    pub day: String,
    pub time: String,
    pub activity: String,
    pub facility_name: String,
    pub estimated_cost: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekendPlan {
    pub plan: Vec<PlanItem>,
    pub summary: String,
}

/// Complete a caller's free-text request with facility summaries and the
/// site currency read from the data source.
pub async fn build_input(
    request: String,
    source: &dyn DataSource,
) -> Result<WeekendPlannerInput, CourtsideError> {
    let settings = source.site_settings().await?;
    let facilities = source
        .facilities()
        .await?
        .iter()
        .map(|f| f.summary_line(&settings.default_currency))
        .collect();

    Ok(WeekendPlannerInput {
        request,
        facilities,
        currency: settings.default_currency,
    })
}

pub fn spec() -> Result<FlowSpec, FlowError> {
    let input = Shape::object(vec![
        Field::required("request", Shape::string_min(10))
            .describe("What the user wants from the weekend"),
        Field::required("facilities", Shape::array(Shape::string())),
        Field::required("currency", currency_shape()),
    ])
    .strip_unknown();

    let item = Shape::object(vec![
        Field::required("day", Shape::string()),
        Field::required("time", Shape::string()),
        Field::required("activity", Shape::string()),
        Field::required("facilityName", Shape::string()),
        Field::required("estimatedCost", Shape::non_negative_number()),
        Field::required("reason", Shape::string()),
    ]);
    let output = Shape::object(vec![
        Field::required("plan", Shape::array(item)),
        Field::required("summary", Shape::string()),
    ]);

    FlowSpec::new(
        NAME,
        "Plan a weekend of activities across available facilities",
        input,
        output,
        TEMPLATE,
    )
}
