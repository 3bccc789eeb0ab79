use crate::JsonRpcRequest;
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
    pub parent_item_id: Uuid,
    pub child_item_ids: Vec<Uuid>,
}

impl Params {
    pub fn new(parent_item_id: Uuid, child_item_ids: Vec<Uuid>) -> Result<Self, InvalidParams> {
        if child_item_ids.is_empty() {
            return Err(InvalidParams::NoChildren);
        }

        Ok(Self {
            parent_item_id,
            child_item_ids,
        })
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    parent_item_id: Uuid,
    child_item_ids: Vec<Uuid>,
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
        Params::new(builder.parent_item_id, builder.child_item_ids)
    }
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    NoChildren,
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::NoChildren => crate::invalid_value_because_message(
                "child_item_ids",
                "must contain at least one id".to_owned(),
            ),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct MethodResult {
    /// True whenever the parent exists, even if every child was skipped.
    pub success: bool,
    pub links_created: usize,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl MethodResult {
    pub fn linked(links_created: usize, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            links_created,
            warnings,
            error: None,
        }
    }

    pub fn parent_missing(parent_item_id: Uuid) -> Self {
        Self {
            success: false,
            links_created: 0,
            warnings: Vec::new(),
            error: Some(format!("parent item {} not found", parent_item_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest::new("create_parent_child_link".to_owned(), params, Some("1".to_owned()))
    }

    #[test]
    fn parses_ids() {
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();
        let params = Params::try_from(request(json!({
            "parent_item_id": parent,
            "child_item_ids": [child],
        })))
        .unwrap();
        assert_eq!(params.parent_item_id, parent);
        assert_eq!(params.child_item_ids, vec![child]);
    }

    #[test]
    fn rejects_malformed_uuid() {
        let result = Params::try_from(request(json!({
            "parent_item_id": "not-a-uuid",
            "child_item_ids": [],
        })));
        assert!(matches!(result, Err(InvalidParams::InvalidFormat(_))));
    }

    #[test]
    fn rejects_empty_children() {
        let result = Params::try_from(request(json!({
            "parent_item_id": Uuid::new_v4(),
            "child_item_ids": [],
        })));
        assert!(matches!(result, Err(InvalidParams::NoChildren)));
    }

    #[test]
    fn missing_parent_result_has_an_error() {
        let result = MethodResult::parent_missing(Uuid::nil());
        assert!(!result.success);
        let value = serde_json::to_value(&result).unwrap();
        assert!(value["error"].as_str().unwrap().contains("not found"));
        assert_eq!(value["links_created"], 0);
    }
}
