use super::{Item, CONTENT_MAX_LEN};
use crate::JsonRpcRequest;
use chrono::{DateTime, Utc};
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

/// Changes to one item. Absent fields are left alone.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub clear_target_date: bool,
}

impl Params {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            content: None,
            is_completed: None,
            target_date: None,
            clear_target_date: false,
        }
    }

    pub fn with_content(mut self, content: &str) -> Result<Self, InvalidParams> {
        self.content = Some(
            crate::bounded_text(content, CONTENT_MAX_LEN).ok_or(InvalidParams::InvalidContent)?,
        );
        Ok(self)
    }

    pub fn with_completed(mut self, is_completed: bool) -> Self {
        self.is_completed = Some(is_completed);
        self
    }

    pub fn with_target_date(mut self, target_date: DateTime<Utc>) -> Self {
        self.target_date = Some(target_date);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.is_completed.is_none()
            && self.target_date.is_none()
            && !self.clear_target_date
    }

    /// Merges `newer` into `self`, with `newer` winning every field it sets.
    pub fn merge(&mut self, newer: Params) {
        if newer.content.is_some() {
            self.content = newer.content;
        }
        if newer.is_completed.is_some() {
            self.is_completed = newer.is_completed;
        }
        if newer.target_date.is_some() {
            self.target_date = newer.target_date;
            self.clear_target_date = false;
        }
        if newer.clear_target_date {
            self.target_date = None;
            self.clear_target_date = true;
        }
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    id: Uuid,
    content: Option<String>,
    is_completed: Option<bool>,
    target_date: Option<DateTime<Utc>>,
    #[serde(default)]
    clear_target_date: bool,
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
        if builder.target_date.is_some() && builder.clear_target_date {
            return Err(InvalidParams::ConflictingTargetDate);
        }

        let mut params = Params::new(builder.id);
        if let Some(content) = builder.content {
            params = params.with_content(&content)?;
        }
        params.is_completed = builder.is_completed;
        params.target_date = builder.target_date;
        params.clear_target_date = builder.clear_target_date;

        if params.is_empty() {
            return Err(InvalidParams::NothingToUpdate);
        }
        Ok(params)
    }
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    InvalidContent,
    ConflictingTargetDate,
    NothingToUpdate,
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
            InvalidParams::ConflictingTargetDate => {
                "'target_date' and 'clear_target_date' cannot be combined".to_owned()
            }
            InvalidParams::NothingToUpdate => "no fields to update".to_owned(),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub item: Item,
    /// Children that were reset to pending because this item was reopened.
    pub reset_children: Vec<Uuid>,
}

impl MethodResult {
    pub fn new(item: Item, reset_children: Vec<Uuid>) -> Self {
        Self {
            item,
            reset_children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(params: serde_json::Value) -> Result<Params, InvalidParams> {
        Params::try_from(JsonRpcRequest::new("update_item".to_owned(), params, None))
    }

    #[test]
    fn completion_only() {
        let params = parse(json!({"id": Uuid::new_v4(), "is_completed": false})).unwrap();
        assert_eq!(params.is_completed, Some(false));
        assert!(params.content.is_none());
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(matches!(
            parse(json!({"id": Uuid::new_v4()})),
            Err(InvalidParams::NothingToUpdate)
        ));
    }

    #[test]
    fn conflicting_target_date_is_rejected() {
        assert!(matches!(
            parse(json!({
                "id": Uuid::new_v4(),
                "target_date": "2030-01-01T00:00:00Z",
                "clear_target_date": true,
            })),
            Err(InvalidParams::ConflictingTargetDate)
        ));
    }

    #[test]
    fn merge_prefers_newer_fields() {
        let id = Uuid::new_v4();
        let mut older = Params::new(id).with_content("Milk").unwrap().with_completed(true);
        let newer = Params::new(id).with_completed(false);
        older.merge(newer);
        assert_eq!(older.content.as_deref(), Some("Milk"));
        assert_eq!(older.is_completed, Some(false));
    }

    #[test]
    fn serialized_params_parse_back() {
        let params = Params::new(Uuid::new_v4()).with_completed(true);
        let value = serde_json::to_value(&params).unwrap();
        assert!(value.get("clear_target_date").is_none());
        let parsed = parse(value).unwrap();
        assert_eq!(parsed.is_completed, Some(true));
    }
}
