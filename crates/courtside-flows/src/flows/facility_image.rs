//! Promotional image generation for a facility listing.

use serde::{Deserialize, Serialize};

use crate::backend::{Modality, IMAGE_DATA_URI_FIELD};
use crate::error::FlowError;
use crate::flows::Flow;
use crate::orchestrator::FlowSpec;
use crate::schema::{Field, Shape, StringRules};

pub const NAME: &str = "facilityImage";

const TEMPLATE: &str = "\
Generate an inviting, realistic image of a {{sportType}} facility named \
\"{{facilityName}}\" as it would appear on a booking website.\
{{#if style}} Visual style: {{style}}.{{/if}} \
Do not include any text, logos or watermarks.";

pub struct FacilityImageFlow;

impl Flow for FacilityImageFlow {
    const NAME: &'static str = NAME;
    type Input = FacilityImageInput;
    type Output = FacilityImage;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityImageInput {
    pub facility_name: String,
    pub sport_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityImage {
    /// `data:image/<type>;base64,...`
    pub image_data_uri: String,
}

pub fn spec() -> Result<FlowSpec, FlowError> {
    let input = Shape::object(vec![
        Field::required("facilityName", Shape::string()),
        Field::required("sportType", Shape::string()),
        Field::optional("style", Shape::string()).describe("Optional art direction"),
    ])
    .strip_unknown();

    let output = Shape::object(vec![Field::required(
        IMAGE_DATA_URI_FIELD,
        Shape::string_with(StringRules::default().prefix("data:image/")),
    )]);

    Ok(FlowSpec::new(
        NAME,
        "Generate a promotional image for a facility",
        input,
        output,
        TEMPLATE,
    )?
    .with_modality(Modality::Image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use crate::orchestrator::demo_orchestrator;
    use courtside_core::config::FlowsConfig;
    use courtside_core::types::FlowContext;
    use serde_json::json;
    use std::sync::Arc;

    fn input(style: Option<&str>) -> FacilityImageInput {
        FacilityImageInput {
            facility_name: "Lakeside Pickleball Center".to_string(),
            sport_type: "Pickleball".to_string(),
            style: style.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_image_flow_returns_data_uri() {
        let backend = Arc::new(ScriptedBackend::new().then_final(json!({
            "imageDataUri": "data:image/png;base64,iVBORw0KGgo="
        })));
        let orchestrator = demo_orchestrator(backend.clone(), FlowsConfig::default());

        let out = orchestrator
            .run::<FacilityImageFlow>(&input(Some("golden hour")), &FlowContext::anonymous())
            .await
            .unwrap();
        assert!(out.image_data_uri.starts_with("data:image/png;base64,"));

        let request = &backend.requests()[0];
        assert_eq!(request.modality, Modality::Image);
        assert!(request.prompt.contains("Visual style: golden hour."));
    }

    #[tokio::test]
    async fn test_non_data_uri_is_output_validation() {
        let backend = Arc::new(ScriptedBackend::new().then_final(json!({
            "imageDataUri": "https://cdn.example.com/court.png"
        })));
        let orchestrator = demo_orchestrator(backend, FlowsConfig::default());
        let err = orchestrator
            .run::<FacilityImageFlow>(&input(None), &FlowContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::OutputValidation(_)));
    }

    #[test]
    fn test_prompt_without_style() {
        let spec = spec().unwrap();
        let prompt = spec
            .template
            .render(&json!({ "facilityName": "Arena", "sportType": "Squash" }))
            .unwrap();
        assert_eq!(
            prompt,
            "Generate an inviting, realistic image of a Squash facility named \"Arena\" \
             as it would appear on a booking website. Do not include any text, logos or \
             watermarks."
        );
        assert!(!prompt.contains("Visual style"));
    }
}
