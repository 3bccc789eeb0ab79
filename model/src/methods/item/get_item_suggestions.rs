use crate::JsonRpcRequest;
use chrono::{DateTime, Utc};
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 50;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub list_id: Uuid,
    /// Normalized prefix the suggestions have to start with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub limit: u32,
}

impl Params {
    pub fn new(list_id: Uuid, prefix: Option<&str>, limit: Option<u32>) -> Result<Self, InvalidParams> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(InvalidParams::InvalidLimit);
        }
        let prefix = prefix
            .map(super::normalize_content)
            .filter(|prefix| !prefix.is_empty());

        Ok(Self {
            list_id,
            prefix,
            limit,
        })
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    list_id: Uuid,
    prefix: Option<String>,
    limit: Option<u32>,
}

impl TryFrom<JsonRpcRequest> for Params {
    type Error = InvalidParams;

    fn try_from(request: JsonRpcRequest) -> Result<Self, Self::Error> {
        let builder: ParamsBuilder =
            serde_json::from_value(request.params).map_err(InvalidParams::InvalidFormat)?;
        builder.try_into()
    }
}

impl TryFrom<ParamsBuilder> for Params {
    type Error = InvalidParams;

    fn try_from(builder: ParamsBuilder) -> Result<Self, Self::Error> {
        Params::new(builder.list_id, builder.prefix.as_deref(), builder.limit)
    }
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    InvalidLimit,
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::InvalidLimit => crate::invalid_value_because_message(
                "limit",
                format!("must be between 1 and {}", MAX_LIMIT),
            ),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ItemSuggestion {
    pub content: String,
    pub frequency: i64,
    pub last_used_at: DateTime<Utc>,
}

impl ItemSuggestion {
    pub fn new(content: String, frequency: i64, last_used_at: DateTime<Utc>) -> Self {
        Self {
            content,
            frequency,
            last_used_at,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub suggestions: Vec<ItemSuggestion>,
}

impl MethodResult {
    pub fn new(suggestions: Vec<ItemSuggestion>) -> Self {
        Self { suggestions }
    }
}
