//! Pros and cons distilled from customer reviews of one facility.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::FlowError;
use crate::flows::Flow;
use crate::orchestrator::FlowSpec;
use crate::schema::{Field, Shape};

pub const NAME: &str = "reviewSummary";

const TEMPLATE: &str = "\
Summarize the customer reviews of {{facilityName}}.
List the main pros and the main cons as short phrases. Only mention points \
that appear in the reviews.

Reviews:
{{#each reviews}}- {{this}}
{{/each}}";

pub struct ReviewSummaryFlow;

impl Flow for ReviewSummaryFlow {
    const NAME: &'static str = NAME;
    type Input = ReviewSummaryInput;
    type Output = ReviewSummary;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummaryInput {
    pub facility_name: String,
    pub reviews: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Inputs with fewer than `min_reviews` comments return empty lists
/// without calling the model.
pub fn spec(min_reviews: usize) -> Result<FlowSpec, FlowError> {
    let input = Shape::object(vec![
        Field::required("facilityName", Shape::string()),
        Field::required("reviews", Shape::array(Shape::string())),
    ])
    .strip_unknown();

    let output = Shape::object(vec![
        Field::required("pros", Shape::array(Shape::string())),
        Field::required("cons", Shape::array(Shape::string())),
    ]);

    let spec = FlowSpec::new(
        NAME,
        "Summarize customer reviews into pros and cons",
        input,
        output,
        TEMPLATE,
    )?;
    Ok(spec.with_short_circuit(move |input: &Value| {
        let count = input["reviews"].as_array().map_or(0, Vec::len);
        (count < min_reviews).then(|| json!({ "pros": [], "cons": [] }))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use crate::orchestrator::demo_orchestrator;
    use courtside_core::config::FlowsConfig;
    use courtside_core::types::FlowContext;
    use std::sync::Arc;

    fn input(n: usize) -> ReviewSummaryInput {
        ReviewSummaryInput {
            facility_name: "Riverside Tennis Club".to_string(),
            reviews: (1..=n).map(|i| format!("Review number {}", i)).collect(),
        }
    }

    #[tokio::test]
    async fn test_fewer_than_three_reviews_skip_the_model() {
        let backend = Arc::new(ScriptedBackend::new());
        let orchestrator = demo_orchestrator(backend.clone(), FlowsConfig::default());

        for n in 0..3 {
            let out = orchestrator
                .run::<ReviewSummaryFlow>(&input(n), &FlowContext::anonymous())
                .await
                .unwrap();
            assert_eq!(out, ReviewSummary::default());
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_three_reviews_call_the_model() {
        let backend = Arc::new(ScriptedBackend::new().then_final(json!({
            "pros": ["Clean courts"],
            "cons": ["Limited parking"]
        })));
        let orchestrator = demo_orchestrator(backend.clone(), FlowsConfig::default());

        let out = orchestrator
            .run::<ReviewSummaryFlow>(&input(3), &FlowContext::anonymous())
            .await
            .unwrap();
        assert_eq!(out.pros, vec!["Clean courts"]);
        assert_eq!(backend.call_count(), 1);

        let prompt = &backend.requests()[0].prompt;
        assert!(prompt.contains("reviews of Riverside Tennis Club."));
        assert!(prompt.ends_with("- Review number 1\n- Review number 2\n- Review number 3\n"));
    }

    #[tokio::test]
    async fn test_threshold_comes_from_config() {
        let backend = Arc::new(ScriptedBackend::new());
        let limits = FlowsConfig {
            min_reviews_for_summary: 5,
            ..FlowsConfig::default()
        };
        let orchestrator = demo_orchestrator(backend.clone(), limits);
        let out = orchestrator
            .run::<ReviewSummaryFlow>(&input(4), &FlowContext::anonymous())
            .await
            .unwrap();
        assert!(out.pros.is_empty() && out.cons.is_empty());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_short_circuit_still_validates_input() {
        let backend = Arc::new(ScriptedBackend::new());
        let orchestrator = demo_orchestrator(backend.clone(), FlowsConfig::default());
        let err = orchestrator
            .run_json(
                NAME,
                json!({ "reviews": ["only one"] }),
                &FlowContext::anonymous(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InputValidation(_)));
        assert_eq!(backend.call_count(), 0);
    }
}
