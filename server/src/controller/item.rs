use crate::app::{AppResult, ParamsError};
use database::{
    HistoryDatabase, Item as DbItem, ItemChanges, ItemDatabase,
    ItemSuggestion as DbItemSuggestion,
};
use model::{
    access::Caller,
    item::{
        add_item, delete_item, get_item_suggestions, get_items, reorder_items, update_item,
        get_item_suggestions::ItemSuggestion, Item,
    },
    JsonRpcRequest,
};
use std::convert::TryFrom;

pub struct ItemController {
    items: ItemDatabase,
    history: HistoryDatabase,
    max_items: u32,
}

impl ItemController {
    pub fn new(items: ItemDatabase, history: HistoryDatabase, max_items: u32) -> Self {
        Self {
            items,
            history,
            max_items,
        }
    }

    pub async fn add_item(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<add_item::MethodResult> {
        use add_item::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let item = self
            .items
            .insert_item(
                caller,
                params.list_id,
                &params.content,
                params.target_date,
                self.max_items,
            )
            .await?;

        Ok(MethodResult::new(ItemWrapper::from(item).0))
    }

    pub async fn get_items(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<get_items::MethodResult> {
        use get_items::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let items = self
            .items
            .get_items(caller, params.list_id)
            .await?
            .into_iter()
            .map(|item| ItemWrapper::from(item).0)
            .collect();

        Ok(MethodResult::new(items))
    }

    pub async fn update_item(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<update_item::MethodResult> {
        use update_item::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let id = params.id;
        let update = self
            .items
            .update_item(caller, id, ItemChangesWrapper::from(params).0)
            .await?;

        Ok(MethodResult::new(
            ItemWrapper::from(update.item).0,
            update.reset_children,
        ))
    }

    pub async fn delete_item(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<delete_item::MethodResult> {
        use delete_item::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let deleted = self.items.delete_item(caller, params.id).await?;

        Ok(MethodResult::new(deleted))
    }

    pub async fn reorder_items(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<reorder_items::MethodResult> {
        use reorder_items::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let updated = self
            .items
            .reorder_items(caller, params.list_id, &params.item_ids)
            .await?;
        debug!(
            "reordering {} items in list {} moved {}",
            params.item_ids.len(),
            params.list_id,
            updated
        );

        Ok(MethodResult::new(updated))
    }

    pub async fn get_item_suggestions(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<get_item_suggestions::MethodResult> {
        use get_item_suggestions::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let suggestions = self
            .history
            .get_suggestions(
                caller,
                params.list_id,
                params.prefix.as_deref(),
                params.limit,
            )
            .await?
            .into_iter()
            .map(|suggestion| ItemSuggestionWrapper::from(suggestion).0)
            .collect();

        Ok(MethodResult::new(suggestions))
    }
}

/// Used in order to convert from `database::Item` to `model::Item` (orphan rule).
struct ItemWrapper(Item);

impl From<DbItem> for ItemWrapper {
    fn from(item: DbItem) -> Self {
        let linked_items = item.links();
        ItemWrapper(Item::new(
            item.id,
            item.list_id,
            item.content,
            item.is_completed,
            item.completed_at,
            item.sort_order,
            item.target_date,
            linked_items,
            item.created_at,
            item.updated_at,
        ))
    }
}

struct ItemSuggestionWrapper(ItemSuggestion);

impl From<DbItemSuggestion> for ItemSuggestionWrapper {
    fn from(suggestion: DbItemSuggestion) -> Self {
        ItemSuggestionWrapper(ItemSuggestion::new(
            suggestion.content,
            suggestion.frequency,
            suggestion.last_used_at,
        ))
    }
}

struct ItemChangesWrapper(ItemChanges);

impl From<update_item::Params> for ItemChangesWrapper {
    fn from(params: update_item::Params) -> Self {
        let target_date = if params.clear_target_date {
            Some(None)
        } else {
            params.target_date.map(Some)
        };

        ItemChangesWrapper(ItemChanges {
            content: params.content,
            is_completed: params.is_completed,
            target_date,
        })
    }
}

impl ParamsError for add_item::InvalidParams {}
impl ParamsError for get_items::InvalidParams {}
impl ParamsError for update_item::InvalidParams {}
impl ParamsError for delete_item::InvalidParams {}
impl ParamsError for reorder_items::InvalidParams {}
impl ParamsError for get_item_suggestions::InvalidParams {}
