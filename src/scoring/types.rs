// src/scoring/types.rs
use crate::error::{AppError, UpstreamKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Chat models a caller may request. Anything else is rejected at validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OpenAiModel {
    #[default]
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
}

impl OpenAiModel {
    pub const ALL: [OpenAiModel; 5] = [
        OpenAiModel::Gpt4o,
        OpenAiModel::Gpt4oMini,
        OpenAiModel::Gpt4Turbo,
        OpenAiModel::Gpt4,
        OpenAiModel::Gpt35Turbo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpenAiModel::Gpt4o => "gpt-4o",
            OpenAiModel::Gpt4oMini => "gpt-4o-mini",
            OpenAiModel::Gpt4Turbo => "gpt-4-turbo",
            OpenAiModel::Gpt4 => "gpt-4",
            OpenAiModel::Gpt35Turbo => "gpt-3.5-turbo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's verdict, kept as the JSON object it returned.
///
/// Only the four top-level sections are guaranteed to be objects. Their
/// contents are passed through as-is apart from a clamped
/// `confidence_percentage`, so the accessors below are best-effort and
/// only meant for logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalyzerOutput(Map<String, Value>);

impl AnalyzerOutput {
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.0.get(name).and_then(Value::as_object)
    }

    fn text(&self, section: &str, field: &str) -> Option<&str> {
        self.section(section)?.get(field)?.as_str()
    }

    pub fn recommendation(&self) -> &str {
        self.text("hiring_recommendation", "recommendation")
            .unwrap_or("unspecified")
    }

    pub fn overall_fit(&self) -> &str {
        self.text("job_fit_analysis", "overall_fit")
            .unwrap_or("unspecified")
    }

    pub fn confidence_percentage(&self) -> Option<u8> {
        self.section("hiring_recommendation")?
            .get("confidence_percentage")?
            .as_u64()
            .and_then(|value| u8::try_from(value).ok())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

pub const REQUIRED_SECTIONS: [&str; 4] = [
    "engineer_summary",
    "job_fit_analysis",
    "hiring_recommendation",
    "recommendations",
];

/// Parse the engine's message content into an [`AnalyzerOutput`].
///
/// Every required section must be present as an object. A present,
/// non-null `confidence_percentage` is clamped into `[0, 100]` instead of
/// failing the request; a value that is not a number at all becomes 0.
pub fn parse_analyzer_output(content: &str) -> Result<AnalyzerOutput, AppError> {
    let value: Value = serde_json::from_str(content.trim()).map_err(|e| {
        AppError::upstream(
            UpstreamKind::Malformed,
            format!("Response is not valid JSON: {}", e),
        )
    })?;

    let Value::Object(mut object) = value else {
        return Err(AppError::upstream(
            UpstreamKind::Malformed,
            "Response is not a JSON object",
        ));
    };

    let missing: Vec<&str> = REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|section| !object.get(*section).is_some_and(Value::is_object))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::upstream(
            UpstreamKind::Malformed,
            format!("Response is missing sections: {}", missing.join(", ")),
        ));
    }

    if let Some(confidence) = object
        .get_mut("hiring_recommendation")
        .and_then(Value::as_object_mut)
        .and_then(|recommendation| recommendation.get_mut("confidence_percentage"))
    {
        if let Some(clamped) = clamp_confidence(confidence) {
            *confidence = Value::from(clamped);
        }
    }

    Ok(AnalyzerOutput(object))
}

/// `None` leaves an explicit null untouched.
fn clamp_confidence(raw: &Value) -> Option<u8> {
    let number = match raw {
        Value::Null => return None,
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if number.is_nan() {
        return Some(0);
    }
    Some(number.round().clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn sample_output_json(confidence: Value) -> Value {
        json!({
            "engineer_summary": {
                "overview": "Prolific open source contributor",
                "primary_strengths": ["JavaScript", "Testing"],
                "experience_level": "mid"
            },
            "job_fit_analysis": {
                "overall_fit": "strong",
                "matching_skills": ["JavaScript"],
                "missing_skills": [],
                "fit_explanation": "Consistent frontend work"
            },
            "hiring_recommendation": {
                "recommendation": "Hire",
                "confidence_level": "high",
                "confidence_percentage": confidence,
                "rationale": "Steady activity"
            },
            "recommendations": {
                "for_recruiter": ["Ask about testing strategy"],
                "for_candidate": ["Publish more documentation"],
                "interview_focus_areas": ["State management"]
            }
        })
    }

    #[test]
    fn test_parse_complete_output() {
        let output = parse_analyzer_output(&sample_output_json(json!(82)).to_string()).unwrap();
        assert_eq!(output.overall_fit(), "strong");
        assert_eq!(output.recommendation(), "Hire");
        assert_eq!(output.confidence_percentage(), Some(82));
    }

    #[test]
    fn test_section_contents_pass_through() {
        let mut value = sample_output_json(json!(70));
        value["job_fit_analysis"]["overall_fit"] = json!("Strong");
        value["hiring_recommendation"]["confidence_level"] = json!("very high");
        value["engineer_summary"]["years_active"] = json!(9);
        value["extra_section"] = json!({ "note": "kept" });
        value["hiring_recommendation"]
            .as_object_mut()
            .unwrap()
            .remove("rationale");

        let output = parse_analyzer_output(&value.to_string()).unwrap();
        assert_eq!(output.into_value(), value);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let cases = [
            (json!(150), Some(100)),
            (json!(-20), Some(0)),
            (json!(99.6), Some(100)),
            (json!("75"), Some(75)),
            (json!("85%"), Some(85)),
            (json!("very"), Some(0)),
            (json!([1, 2]), Some(0)),
            (Value::Null, None),
        ];

        for (raw, expected) in cases {
            let output = parse_analyzer_output(&sample_output_json(raw.clone()).to_string())
                .unwrap_or_else(|e| panic!("{:?} should parse: {}", raw, e));
            assert_eq!(output.confidence_percentage(), expected, "input {:?}", raw);
            if expected.is_none() {
                let value = output.into_value();
                assert!(value["hiring_recommendation"]["confidence_percentage"].is_null());
            }
        }
    }

    #[test]
    fn test_missing_section_is_malformed() {
        for section in REQUIRED_SECTIONS {
            let mut value = sample_output_json(json!(50));
            value.as_object_mut().unwrap().remove(section);

            let err = parse_analyzer_output(&value.to_string()).unwrap_err();
            match err {
                AppError::Upstream {
                    kind: UpstreamKind::Malformed,
                    message,
                } => assert!(message.contains(section)),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = parse_analyzer_output("Sure! Here is the analysis...").unwrap_err();
        assert!(matches!(
            err,
            AppError::Upstream {
                kind: UpstreamKind::Malformed,
                ..
            }
        ));
    }

    #[test]
    fn test_section_must_be_object() {
        let mut value = sample_output_json(json!(50));
        value["recommendations"] = json!(["hire them"]);
        let err = parse_analyzer_output(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("recommendations"));
    }

    #[test]
    fn test_accessors_fall_back_when_fields_are_odd() {
        let mut value = sample_output_json(Value::Null);
        value["hiring_recommendation"]["recommendation"] = json!(3);
        value["job_fit_analysis"]
            .as_object_mut()
            .unwrap()
            .remove("overall_fit");

        let output = parse_analyzer_output(&value.to_string()).unwrap();
        assert_eq!(output.recommendation(), "unspecified");
        assert_eq!(output.overall_fit(), "unspecified");
        assert_eq!(output.confidence_percentage(), None);
    }

    #[test]
    fn test_model_parse() {
        assert_eq!(OpenAiModel::parse("gpt-4o"), Some(OpenAiModel::Gpt4o));
        assert_eq!(OpenAiModel::parse(" GPT-4o-mini "), Some(OpenAiModel::Gpt4oMini));
        assert_eq!(OpenAiModel::parse("claude"), None);
        assert_eq!(OpenAiModel::default().to_string(), "gpt-4o");
    }
}
