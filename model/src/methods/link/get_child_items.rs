use super::LinkedItemInfo;
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
}

impl Params {
    pub fn new(parent_item_id: Uuid) -> Self {
        Self { parent_item_id }
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    parent_item_id: Uuid,
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
        Ok(Self::new(builder.parent_item_id))
    }
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
        };
        write!(f, "{}", output)
    }
}

/// Direct children ordered by list title, then position.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
#[non_exhaustive]
pub struct MethodResult {
    pub items: Vec<LinkedItemInfo>,
}

impl MethodResult {
    pub fn new(items: Vec<LinkedItemInfo>) -> Self {
        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::ListType;

    #[test]
    fn result_is_a_bare_array() {
        let info = LinkedItemInfo::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Steak".to_owned(),
            true,
            "Groceries".to_owned(),
            ListType::Grocery,
        );
        let value = serde_json::to_value(MethodResult::new(vec![info])).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["list_type"], "grocery");
        assert_eq!(value[0]["list_title"], "Groceries");
    }
}
