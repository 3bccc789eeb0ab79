use super::{Item, CONTENT_MAX_LEN};
use crate::JsonRpcRequest;
use chrono::{DateTime, Utc};
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub list_id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<DateTime<Utc>>,
}

impl Params {
    pub fn new(
        list_id: Uuid,
        content: &str,
        target_date: Option<DateTime<Utc>>,
    ) -> Result<Self, InvalidParams> {
        let content =
            crate::bounded_text(content, CONTENT_MAX_LEN).ok_or(InvalidParams::InvalidContent)?;

        Ok(Self {
            list_id,
            content,
            target_date,
        })
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    list_id: Uuid,
    content: String,
    target_date: Option<DateTime<Utc>>,
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
        Params::new(builder.list_id, &builder.content, builder.target_date)
    }
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    InvalidContent,
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::InvalidContent => crate::invalid_value_because_message(
                "content",
                format!("must be between 1 and {} characters", CONTENT_MAX_LEN),
            ),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub item: Item,
}

impl MethodResult {
    pub fn new(item: Item) -> Self {
        Self { item }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_date_is_optional() {
        let request = JsonRpcRequest::new(
            "add_item".to_owned(),
            json!({"list_id": Uuid::new_v4(), "content": "Carrots"}),
            None,
        );
        let params = Params::try_from(request).unwrap();
        assert_eq!(params.content, "Carrots");
        assert!(params.target_date.is_none());
    }

    #[test]
    fn empty_content_is_rejected() {
        assert!(matches!(
            Params::new(Uuid::new_v4(), " \n ", None),
            Err(InvalidParams::InvalidContent)
        ));
    }
}
