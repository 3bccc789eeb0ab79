use super::{List, ListType, TITLE_MAX_LEN};
use crate::JsonRpcRequest;
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub list_type: ListType,
    pub title: String,
    pub is_private: bool,
}

impl Params {
    pub fn new(list_type: ListType, title: &str, is_private: bool) -> Result<Self, InvalidParams> {
        let title = crate::bounded_text(title, TITLE_MAX_LEN).ok_or(InvalidParams::InvalidTitle)?;

        Ok(Self {
            list_type,
            title,
            is_private,
        })
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    list_type: ListType,
    title: String,
    #[serde(default = "private_by_default")]
    is_private: bool,
}

fn private_by_default() -> bool {
    true
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
        Params::new(builder.list_type, &builder.title, builder.is_private)
    }
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    InvalidTitle,
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
    use serde_json::json;

    fn parse(params: serde_json::Value) -> Result<Params, InvalidParams> {
        Params::try_from(JsonRpcRequest::new("create_list".to_owned(), params, None))
    }

    #[test]
    fn lists_are_private_unless_asked() {
        let params = parse(json!({"list_type": "grocery", "title": " Weekly shop "})).unwrap();
        assert_eq!(params.title, "Weekly shop");
        assert_eq!(params.list_type, ListType::Grocery);
        assert!(params.is_private);
    }

    #[test]
    fn unknown_list_type_is_rejected() {
        let result = parse(json!({"list_type": "kanban", "title": "Work"}));
        assert!(matches!(result, Err(InvalidParams::InvalidFormat(_))));
    }

    #[test]
    fn title_is_bounded() {
        let long = "x".repeat(TITLE_MAX_LEN + 1);
        assert!(matches!(
            parse(json!({"list_type": "simple", "title": long})),
            Err(InvalidParams::InvalidTitle)
        ));
        assert!(matches!(
            parse(json!({"list_type": "simple", "title": "   "})),
            Err(InvalidParams::InvalidTitle)
        ));
    }
}
