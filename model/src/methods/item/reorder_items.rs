use crate::JsonRpcRequest;
use std::{
    collections::HashSet,
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

/// New order of a list: `item_ids[0]` gets position 0 and so on.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub list_id: Uuid,
    pub item_ids: Vec<Uuid>,
}

impl Params {
    pub fn new(list_id: Uuid, item_ids: Vec<Uuid>) -> Result<Self, InvalidParams> {
        if item_ids.is_empty() {
            return Err(InvalidParams::NoItems);
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = item_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(InvalidParams::DuplicateItem(*duplicate));
        }

        Ok(Self { list_id, item_ids })
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    list_id: Uuid,
    item_ids: Vec<Uuid>,
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
        Params::new(builder.list_id, builder.item_ids)
    }
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    NoItems,
    DuplicateItem(Uuid),
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::NoItems => crate::invalid_value_because_message(
                "item_ids",
                "must contain at least one id".to_owned(),
            ),
            InvalidParams::DuplicateItem(id) => crate::invalid_value_because_message(
                "item_ids",
                format!("'{}' appears more than once", id),
            ),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub updated: u64,
}

impl MethodResult {
    pub fn new(updated: u64) -> Self {
        Self { updated }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_rejected() {
        let id = Uuid::new_v4();
        assert!(matches!(
            Params::new(Uuid::new_v4(), vec![id, Uuid::new_v4(), id]),
            Err(InvalidParams::DuplicateItem(d)) if d == id
        ));
    }
}
