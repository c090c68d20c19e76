use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Uniform success envelope: `{code: 200, message: "ok", result}`
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    pub result: T,
}

impl<T> Envelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            code: 200,
            message: "ok".to_string(),
            result,
        }
    }
}

/// Document listing entry; the value and internal id are left out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfigSummary {
    pub name: String,
    pub config_type: String,
    pub created: DateTime<Utc>,
    pub modified: Vec<DateTime<Utc>>,
    pub discarded: bool,
}

/// Full document with its value resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfigDetail {
    pub name: String,
    pub config_type: String,
    #[schema(value_type = Object)]
    pub value: JsonValue,
    pub created: DateTime<Utc>,
    pub modified: Vec<DateTime<Utc>>,
    pub discarded: bool,
}

/// Response payload for the stats endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub size: u64,
    pub count: u64,
}

/// Optional JSON body narrowing the list endpoints
///
/// `config_type` and `discarded` are accepted but always overridden by the
/// route being called.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ListFilter {
    pub name: Option<String>,
    pub config_type: Option<String>,
    pub discarded: Option<bool>,
}
