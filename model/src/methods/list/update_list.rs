use super::{List, TITLE_MAX_LEN};
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
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

impl Params {
    pub fn new(
        id: Uuid,
        title: Option<&str>,
        is_private: Option<bool>,
    ) -> Result<Self, InvalidParams> {
        if title.is_none() && is_private.is_none() {
            return Err(InvalidParams::NothingToUpdate);
        }
        let title = match title {
            Some(title) => Some(
                crate::bounded_text(title, TITLE_MAX_LEN).ok_or(InvalidParams::InvalidTitle)?,
            ),
            None => None,
        };

        Ok(Self {
            id,
            title,
            is_private,
        })
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    id: Uuid,
    title: Option<String>,
    is_private: Option<bool>,
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
        Params::new(builder.id, builder.title.as_deref(), builder.is_private)
    }
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    InvalidTitle,
    NothingToUpdate,
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::InvalidTitle => crate::invalid_value_because_message(
                "title",
                format!("must be between 1 and {} characters", TITLE_MAX_LEN),
            ),
            InvalidParams::NothingToUpdate => {
                "at least one of 'title' or 'is_private' is required".to_owned()
            }
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub list: List,
}

impl MethodResult {
    pub fn new(list: List) -> Self {
        Self { list }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_is_rejected() {
        assert!(matches!(
            Params::new(Uuid::new_v4(), None, None),
            Err(InvalidParams::NothingToUpdate)
        ));
    }

    #[test]
    fn privacy_alone_is_enough() {
        let params = Params::new(Uuid::new_v4(), None, Some(false)).unwrap();
        assert_eq!(params.is_private, Some(false));
        assert!(params.title.is_none());
    }
}
