//! Data models and structures
//!
//! Defines the inbound request payload, the plant analysis schema the model is
//! asked to fill in, the locally derived yield summary, and the service
//! configuration.

use crate::image::ImageSource;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::time::Duration;

/// Raw inbound JSON body as sent by the browser client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBody {
    #[serde(default)]
    pub image_base64: Option<String>,
    /// Kept as a raw value; the land area is tolerated in any shape and only
    /// used when it turns out to be a positive number.
    #[serde(default)]
    pub acres: Option<Value>,
}

/// Land area in acres as supplied by the farmer.
#[derive(Debug, Clone, PartialEq)]
pub struct LandArea {
    /// Echoed verbatim in the derived summary (`3` stays `3`, not `3.0`).
    pub acres: Number,
    pub value: f64,
}

impl LandArea {
    /// Accepts a positive finite number or a numeric string; anything else is
    /// treated as "not supplied".
    pub fn from_value(value: &Value) -> Option<Self> {
        let acres = match value {
            Value::Number(n) => n.clone(),
            Value::String(s) => s.trim().parse::<Number>().ok()?,
            _ => return None,
        };
        let numeric = acres.as_f64()?;
        if numeric.is_finite() && numeric > 0.0 {
            Some(Self {
                acres,
                value: numeric,
            })
        } else {
            None
        }
    }
}

/// A validated analysis request. Built per call and dropped afterwards.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: ImageSource,
    pub land_area: Option<LandArea>,
}

impl AnalysisRequest {
    /// Validates the inbound body: the image must be present and non-empty.
    pub fn from_body(body: AnalyzeBody) -> Result<Self> {
        let raw_image = body
            .image_base64
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingImage)?;

        let land_area = body.acres.as_ref().and_then(LandArea::from_value);
        if body.acres.is_some() && land_area.is_none() {
            tracing::debug!("Ignoring unusable land area: {:?}", body.acres);
        }

        Ok(Self {
            image: ImageSource::parse(&raw_image)?,
            land_area,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pest {
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pesticide {
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Organic or chemical.
    #[serde(
        rename = "type",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub usage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fertilizer {
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "type",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub timing: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilRequirements {
    #[serde(
        rename = "type",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub soil_type: Option<String>,
    #[serde(
        rename = "pH",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub ph: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub drainage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeasonInfo {
    #[serde(
        deserialize_with = "lenient::text_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub best_seasons: Vec<String>,
    #[serde(
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_season_suitable: Option<bool>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YieldEstimate {
    /// Free text; may start with a number ("50-60 quintals").
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub per_acre: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub market_price: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

/// Yield totals computed locally from the model's per-acre estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedYieldSummary {
    pub acres: Number,
    pub total_yield: String,
    pub estimated_revenue: String,
}

/// Structured plant information as returned by the model. Every field is
/// optional; unknown top-level fields are kept in `extra` and echoed back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlantAnalysis {
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub plant_name: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub scientific_name: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub species: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub growth_days: Option<String>,
    #[serde(
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        deserialize_with = "lenient::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub pests: Vec<Pest>,
    #[serde(
        deserialize_with = "lenient::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub pesticides: Vec<Pesticide>,
    #[serde(
        deserialize_with = "lenient::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub fertilizers: Vec<Fertilizer>,
    #[serde(
        deserialize_with = "lenient::record",
        skip_serializing_if = "Option::is_none"
    )]
    pub soil_requirements: Option<SoilRequirements>,
    #[serde(
        deserialize_with = "lenient::record",
        skip_serializing_if = "Option::is_none"
    )]
    pub season_info: Option<SeasonInfo>,
    #[serde(
        deserialize_with = "lenient::record",
        skip_serializing_if = "Option::is_none"
    )]
    pub yield_estimate: Option<YieldEstimate>,
    #[serde(
        deserialize_with = "lenient::text_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub care_instructions: Vec<String>,
    #[serde(
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub total_yield_estimate: Option<DerivedYieldSummary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Top-level keys that belong to this service rather than to the model.
pub const RESERVED_KEYS: [&str; 3] = ["totalYieldEstimate", "error", "rawResponse"];

/// Error payload, optionally carrying the unparsed model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResult {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// What a successful handler run sends back: either the analysis or the
/// display-only failure produced when the reply could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResponse {
    Analysis(Box<PlantAnalysis>),
    Failure(FailureResult),
}

/// Deserializers that accept the loose shapes models tend to produce.
///
/// A field whose shape cannot be read is dropped on its own instead of
/// failing the whole analysis.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.and_then(as_text))
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => Ok(s.trim().parse().ok()),
            _ => Ok(None),
        }
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(Some(true)),
                "false" | "no" => Ok(Some(false)),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    pub fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => Ok(vec![s]),
            Some(Value::Array(items)) => Ok(items.into_iter().filter_map(as_text).collect()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => Ok(items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn record<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(Option::<Value>::deserialize(d)?
            .filter(Value::is_object)
            .and_then(|value| serde_json::from_value(value).ok()))
    }

    fn as_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer credential for the completion API. Absence is reported per
    /// request, not at startup.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub bind_addr: String,
}

pub const DEFAULT_BASE_URL: &str = "https://ai.gateway.lovable.dev";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
            max_body_bytes: 20 * 1024 * 1024,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let default = Self::default();
        Ok(Self {
            api_key: std::env::var("AI_GATEWAY_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            base_url: std::env::var("AI_GATEWAY_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(default.base_url),
            model: std::env::var("AI_MODEL").unwrap_or(default.model),
            request_timeout: env_parse("AI_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(default.request_timeout),
            max_body_bytes: env_parse("MAX_BODY_BYTES")?.unwrap_or(default.max_body_bytes),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(default.bind_addr),
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
