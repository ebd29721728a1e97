//! Interpretation of the model's reply
//!
//! Turns free-form model text into a [`PlantAnalysis`], tolerating replies that
//! wrap the JSON in a markdown fence, and degrading to the raw text when the
//! reply cannot be parsed at all.

use crate::models::{
    AnalysisResponse, DerivedYieldSummary, FailureResult, LandArea, PlantAnalysis, YieldEstimate,
    RESERVED_KEYS,
};
use serde_json::Value;

pub const UNPARSABLE_MESSAGE: &str = "Could not parse structured data";
const DEFAULT_UNIT: &str = "units";
const FENCE: &str = "```";

/// Result of trying to read the reply as structured data.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Structured(Box<PlantAnalysis>),
    /// The complete original reply, untouched.
    Unstructured(String),
}

/// Returns the inner content of the first fenced block, or the whole reply
/// when there is no complete fence.
pub fn extract_json_block(reply: &str) -> &str {
    let Some(open) = reply.find(FENCE) else {
        return reply;
    };
    let after_open = &reply[open + FENCE.len()..];
    let body = match after_open.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &after_open[4..],
        _ => after_open,
    };
    match body.find(FENCE) {
        Some(close) => body[..close].trim(),
        None => reply,
    }
}

pub fn parse_model_reply(reply: &str) -> ParseOutcome {
    let fragment = extract_json_block(reply).trim();

    let mut object = match serde_json::from_str::<Value>(fragment) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            tracing::warn!("Model reply is JSON but not an object: {}", type_name(&other));
            return ParseOutcome::Unstructured(reply.to_string());
        }
        Err(e) => {
            tracing::warn!("Failed to parse model reply as JSON: {}", e);
            return ParseOutcome::Unstructured(reply.to_string());
        }
    };

    for key in RESERVED_KEYS {
        if object.remove(key).is_some() {
            tracing::debug!("Dropped model-supplied '{}' field", key);
        }
    }

    match serde_json::from_value::<PlantAnalysis>(Value::Object(object)) {
        Ok(analysis) => ParseOutcome::Structured(Box::new(analysis)),
        Err(e) => {
            tracing::warn!("Model reply does not match the analysis schema: {}", e);
            ParseOutcome::Unstructured(reply.to_string())
        }
    }
}

/// Leading decimal number of `text` (`"50-60 kg"` -> 50). Leading whitespace
/// is skipped; text that does not start with a number yields 0, as does `-0`.
pub fn leading_number(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v != 0.0)
        .unwrap_or(0.0)
}

/// Renders `value` with two decimals, resolving exact half-cent ties away
/// from zero (`1.125` -> `1.13`). Every other value rounds to nearest.
///
/// A double sits exactly on a half-cent only when it is an odd number of
/// eighths, so the tie test is exact.
pub fn format_two_decimals(value: f64) -> String {
    let eighths = value * 8.0;
    let on_half_cent = value.is_finite() && eighths.fract() == 0.0 && eighths % 2.0 != 0.0;
    if !on_half_cent {
        return format!("{:.2}", value);
    }

    let magnitude = value.abs();
    let whole = magnitude.trunc();
    let cents = ((magnitude - whole) * 100.0).ceil();
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{:.0}.{:02.0}", sign, whole, cents)
}

/// Computes the total yield for the farmer's land.
///
/// Returns `None` when the model gave no per-acre figure. A per-acre figure
/// that is not numeric still produces a summary, with a zero total.
pub fn derive_yield_summary(
    estimate: &YieldEstimate,
    land: &LandArea,
) -> Option<DerivedYieldSummary> {
    let per_acre = estimate.per_acre.as_deref()?;
    let unit = estimate
        .unit
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(DEFAULT_UNIT);
    let total = leading_number(per_acre) * land.value;

    let estimated_revenue = match estimate.market_price.as_deref() {
        Some(price) if !price.trim().is_empty() => format!("Based on {} per {}", price, unit),
        _ => "Contact local markets for current prices".to_string(),
    };

    Some(DerivedYieldSummary {
        acres: land.acres.clone(),
        total_yield: format!("{} {}", format_two_decimals(total), unit),
        estimated_revenue,
    })
}

/// Produces the response for one model reply: the analysis (with a yield
/// summary when land area was given) or the raw-text failure.
pub fn interpret(reply: &str, land: Option<&LandArea>) -> AnalysisResponse {
    match parse_model_reply(reply) {
        ParseOutcome::Structured(mut analysis) => {
            let summary = match (land, analysis.yield_estimate.as_ref()) {
                (Some(land), Some(estimate)) => derive_yield_summary(estimate, land),
                _ => None,
            };
            analysis.total_yield_estimate = summary;
            AnalysisResponse::Analysis(analysis)
        }
        ParseOutcome::Unstructured(raw) => AnalysisResponse::Failure(FailureResult {
            error: UNPARSABLE_MESSAGE.to_string(),
            raw_response: Some(raw),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const REPLY: &str = r#"{
        "plantName": "Tomato",
        "scientificName": "Solanum lycopersicum",
        "pests": [{"name": "Aphids", "description": "Suck sap from leaves"}],
        "yieldEstimate": {"perAcre": "50", "unit": "kg", "marketPrice": "$2/kg"},
        "confidence": 0.92
    }"#;

    fn land(acres: Value) -> LandArea {
        LandArea::from_value(&acres).unwrap()
    }

    fn structured(outcome: ParseOutcome) -> PlantAnalysis {
        match outcome {
            ParseOutcome::Structured(analysis) => *analysis,
            ParseOutcome::Unstructured(raw) => panic!("expected structured, got raw {:?}", raw),
        }
    }

    #[test]
    fn test_extract_plain_reply_unchanged() {
        assert_eq!(extract_json_block("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_fence() {
        let reply = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks!";
        assert_eq!(extract_json_block(reply), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_untagged_fence() {
        assert_eq!(extract_json_block("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_unclosed_fence_uses_whole_reply() {
        let reply = "```json\n{\"a\": 1}";
        assert_eq!(extract_json_block(reply), reply);
    }

    #[test]
    fn test_fenced_and_plain_parse_identically() {
        let fenced = format!("```json\n{}\n```", REPLY);
        assert_eq!(parse_model_reply(&fenced), parse_model_reply(REPLY));
        assert_eq!(
            structured(parse_model_reply(&fenced)).plant_name.as_deref(),
            Some("Tomato")
        );
    }

    #[test]
    fn test_invalid_reply_keeps_full_text() {
        let reply = "```json\n{\"plantName\": \"Tomato\",\n```\nsorry, truncated";
        assert_eq!(
            parse_model_reply(reply),
            ParseOutcome::Unstructured(reply.to_string())
        );

        let prose = "This looks like a healthy basil plant.";
        assert_eq!(
            parse_model_reply(prose),
            ParseOutcome::Unstructured(prose.to_string())
        );
    }

    #[test]
    fn test_non_object_json_is_unstructured() {
        assert_eq!(
            parse_model_reply("[1, 2, 3]"),
            ParseOutcome::Unstructured("[1, 2, 3]".to_string())
        );
    }

    #[test]
    fn test_odd_nested_shapes_are_dropped() {
        let analysis = structured(parse_model_reply(
            r#"{
                "plantName": "Okra",
                "pests": "none",
                "seasonInfo": "all year",
                "yieldEstimate": {"perAcre": "5", "unit": ["kg"]},
                "careInstructions": ["Water weekly", {"step": 2}]
            }"#,
        ));

        assert_eq!(analysis.plant_name.as_deref(), Some("Okra"));
        assert!(analysis.pests.is_empty());
        assert!(analysis.season_info.is_none());
        let estimate = analysis.yield_estimate.unwrap();
        assert_eq!(estimate.per_acre.as_deref(), Some("5"));
        assert!(estimate.unit.is_none());
        assert_eq!(analysis.care_instructions, vec!["Water weekly".to_string()]);
    }

    #[test]
    fn test_reserved_keys_are_dropped() {
        let analysis = structured(parse_model_reply(
            r#"{"plantName": "Mint", "error": "none", "totalYieldEstimate": {"acres": 9}}"#,
        ));
        assert!(analysis.extra.is_empty());
        assert!(analysis.total_yield_estimate.is_none());
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("50"), 50.0);
        assert_eq!(leading_number("  3.5 tons"), 3.5);
        assert_eq!(leading_number("50-60 quintals"), 50.0);
        assert_eq!(leading_number("1,200 kg"), 1.0);
        assert_eq!(leading_number(".5"), 0.5);
        assert_eq!(leading_number("5."), 5.0);
        assert_eq!(leading_number("-2"), -2.0);
        assert_eq!(leading_number("1e3 kg"), 1000.0);
        assert_eq!(leading_number("2e"), 2.0);
        assert_eq!(leading_number("varies"), 0.0);
        assert_eq!(leading_number("about 40"), 0.0);
        assert_eq!(leading_number(""), 0.0);
        assert_eq!(leading_number("-"), 0.0);
        assert!(leading_number("-0 kg").is_sign_positive());
        assert!(leading_number("-0.0").is_sign_positive());
    }

    #[test]
    fn test_two_decimals_round_half_cent_up() {
        assert_eq!(format_two_decimals(1.125), "1.13");
        assert_eq!(format_two_decimals(0.125), "0.13");
        assert_eq!(format_two_decimals(2.375), "2.38");
        assert_eq!(format_two_decimals(-0.625), "-0.63");
        assert_eq!(format_two_decimals(150.0), "150.00");
        assert_eq!(format_two_decimals(0.5), "0.50");
        assert_eq!(format_two_decimals(1.005), "1.00");
        assert_eq!(format_two_decimals(2.0 / 3.0), "0.67");
    }

    #[test]
    fn test_derived_summary_rounds_half_cent_up() {
        let estimate = YieldEstimate {
            per_acre: Some("1.5".to_string()),
            unit: Some("kg".to_string()),
            ..Default::default()
        };
        let summary = derive_yield_summary(&estimate, &land(json!(0.75))).unwrap();
        assert_eq!(summary.total_yield, "1.13 kg");
    }

    #[test]
    fn test_derived_summary_negative_zero_reads_zero() {
        let estimate = YieldEstimate {
            per_acre: Some("-0 kg".to_string()),
            unit: Some("kg".to_string()),
            ..Default::default()
        };
        let summary = derive_yield_summary(&estimate, &land(json!(3))).unwrap();
        assert_eq!(summary.total_yield, "0.00 kg");
    }

    #[test]
    fn test_derived_summary_for_numeric_yield() {
        let estimate = YieldEstimate {
            per_acre: Some("50".to_string()),
            unit: Some("kg".to_string()),
            market_price: None,
            notes: None,
        };
        let summary = derive_yield_summary(&estimate, &land(json!(3))).unwrap();
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({
                "acres": 3,
                "totalYield": "150.00 kg",
                "estimatedRevenue": "Contact local markets for current prices"
            })
        );
    }

    #[test]
    fn test_derived_summary_embeds_market_price() {
        let estimate = YieldEstimate {
            per_acre: Some("12.5 tons".to_string()),
            unit: Some("tons".to_string()),
            market_price: Some("$300".to_string()),
            notes: None,
        };
        let summary = derive_yield_summary(&estimate, &land(json!(2))).unwrap();
        assert_eq!(summary.total_yield, "25.00 tons");
        assert_eq!(summary.estimated_revenue, "Based on $300 per tons");
    }

    #[test]
    fn test_derived_summary_non_numeric_yield_is_zero() {
        let estimate = YieldEstimate {
            per_acre: Some("varies".to_string()),
            unit: None,
            market_price: None,
            notes: None,
        };
        let summary = derive_yield_summary(&estimate, &land(json!(4))).unwrap();
        assert_eq!(summary.total_yield, "0.00 units");
    }

    #[test]
    fn test_no_summary_without_per_acre() {
        let estimate = YieldEstimate {
            unit: Some("kg".to_string()),
            ..Default::default()
        };
        assert!(derive_yield_summary(&estimate, &land(json!(4))).is_none());
    }

    #[test]
    fn test_interpret_attaches_summary() {
        let area = land(json!(3));
        let response = interpret(REPLY, Some(&area));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["plantName"], json!("Tomato"));
        assert_eq!(
            value["totalYieldEstimate"],
            json!({
                "acres": 3,
                "totalYield": "150.00 kg",
                "estimatedRevenue": "Based on $2/kg per kg"
            })
        );
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_interpret_without_land_has_no_summary() {
        let value = serde_json::to_value(interpret(REPLY, None)).unwrap();
        assert!(value.get("totalYieldEstimate").is_none());
        assert_eq!(value["confidence"], json!(0.92));
    }

    #[test]
    fn test_interpret_unparsable_reply() {
        let area = land(json!(3));
        let response = interpret("I cannot tell.", Some(&area));
        assert_eq!(
            response,
            AnalysisResponse::Failure(FailureResult {
                error: UNPARSABLE_MESSAGE.to_string(),
                raw_response: Some("I cannot tell.".to_string()),
            })
        );
    }
}
