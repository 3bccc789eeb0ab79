use crate::links::LinkedItems;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod add_item;
pub mod delete_item;
pub mod get_item_suggestions;
pub mod get_items;
pub mod reorder_items;
pub mod update_item;

pub const CONTENT_MAX_LEN: usize = 500;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Item {
    pub id: Uuid,
    pub list_id: Uuid,
    pub content: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub sort_order: i32,
    pub target_date: Option<DateTime<Utc>>,
    pub linked_items: LinkedItems,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        list_id: Uuid,
        content: String,
        is_completed: bool,
        completed_at: Option<DateTime<Utc>>,
        sort_order: i32,
        target_date: Option<DateTime<Utc>>,
        linked_items: LinkedItems,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            list_id,
            content,
            is_completed,
            completed_at,
            sort_order,
            target_date,
            linked_items,
            created_at,
            updated_at,
        }
    }
}

/// Key under which item history is aggregated: trimmed, lowercased, single spaced.
pub fn normalize_content(content: &str) -> String {
    content
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_normalization() {
        assert_eq!(normalize_content("  Free-Range   EGGS "), "free-range eggs");
        assert_eq!(normalize_content(""), "");
    }
}
