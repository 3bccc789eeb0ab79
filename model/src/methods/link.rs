use crate::list::ListType;
use uuid::Uuid;

pub mod create_parent_child_link;
pub mod get_child_items;
pub mod get_parent_items;
pub mod remove_parent_child_link;
pub mod validate_link_creation;

/// A linked item together with the list it lives in.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct LinkedItemInfo {
    pub id: Uuid,
    pub list_id: Uuid,
    pub content: String,
    pub is_completed: bool,
    pub list_title: String,
    pub list_type: ListType,
}

impl LinkedItemInfo {
    pub fn new(
        id: Uuid,
        list_id: Uuid,
        content: String,
        is_completed: bool,
        list_title: String,
        list_type: ListType,
    ) -> Self {
        Self {
            id,
            list_id,
            content,
            is_completed,
            list_title,
            list_type,
        }
    }
}
