//! Slide deck about the platform's business, built from live statistics.
//!
//! The only flow that uses tools: the model pulls totals, popular sports and
//! the revenue trend before writing the slides.

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::flows::{currency_shape, Flow};
use crate::orchestrator::FlowSpec;
use crate::schema::{Field, Shape};
use crate::tools::{GET_APP_STATS, GET_POPULAR_SPORTS, GET_REVENUE_TREND};

pub const NAME: &str = "businessPresentation";

const TEMPLATE: &str = "\
You are a business analyst preparing a presentation about a sports facility \
booking platform for {{audience}}.
{{#if focus}}Give particular attention to: {{focus}}.
{{/if}}
Use the available tools to fetch the current platform statistics, the most \
popular sports and the monthly revenue trend. Do not invent numbers; quote \
the tool results. Report money in {{currency}}.

Produce a title, a short executive summary and the slides. Every slide needs \
a title, an icon name, at least one bullet point and optional speaker notes \
in the narrative field.";

pub struct BusinessPresentationFlow;

impl Flow for BusinessPresentationFlow {
    const NAME: &'static str = NAME;
    type Input = PresentationInput;
    type Output = Presentation;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationInput {
    pub audience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub slide_title: String,
    pub icon: String,
    pub bullet_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub title: String,
    pub summary: String,
    pub slides: Vec<Slide>,
}

pub fn spec() -> Result<FlowSpec, FlowError> {
    let input = Shape::object(vec![
        Field::required("audience", Shape::string_min(1)).describe("Who will see the deck"),
        Field::optional("focus", Shape::string()),
        Field::required("currency", currency_shape()),
    ])
    .strip_unknown();

    let slide = Shape::object(vec![
        Field::required("slideTitle", Shape::string()),
        Field::required("icon", Shape::string()).describe("Icon name for the slide header"),
        Field::required("bulletPoints", Shape::non_empty_array(Shape::string())),
        Field::optional("narrative", Shape::string()).describe("Speaker notes"),
    ]);
    let output = Shape::object(vec![
        Field::required("title", Shape::string()),
        Field::required("summary", Shape::string()),
        Field::required("slides", Shape::non_empty_array(slide)),
    ]);

    Ok(FlowSpec::new(
        NAME,
        "Generate a business presentation from live platform statistics",
        input,
        output,
        TEMPLATE,
    )?
    .with_tools(&[GET_APP_STATS, GET_POPULAR_SPORTS, GET_REVENUE_TREND]))
}
