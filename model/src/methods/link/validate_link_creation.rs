use crate::{
    links::{InvalidLink, LinkValidation},
    JsonRpcRequest,
};
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
    pub can_link: bool,
    pub valid_links: Vec<Uuid>,
    pub invalid_links: Vec<InvalidLink>,
    pub warnings: Vec<String>,
}

impl From<LinkValidation> for MethodResult {
    fn from(validation: LinkValidation) -> Self {
        Self {
            can_link: validation.can_link,
            valid_links: validation.valid_links,
            invalid_links: validation.invalid_links,
            warnings: validation.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::InvalidReason;

    #[test]
    fn reasons_serialize_in_snake_case() {
        let child = Uuid::new_v4();
        let result = MethodResult::from(LinkValidation {
            can_link: false,
            valid_links: Vec::new(),
            invalid_links: vec![InvalidLink {
                child_id: child,
                reason: InvalidReason::CircularDependency,
            }],
            warnings: Vec::new(),
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["can_link"], false);
        assert_eq!(value["invalid_links"][0]["reason"], "circular_dependency");
        assert_eq!(value["invalid_links"][0]["child_id"], child.to_string());
    }
}
