use crate::{
    app::{AppResult, ParamsError},
    AppError,
};
use database::{List as DbList, ListDatabase};
use model::{
    access::Caller,
    list::{create_list, delete_list, get_lists, update_list, List, ListType},
    JsonRpcRequest,
};
use std::{convert::TryFrom, str::FromStr};

pub struct ListController {
    db: ListDatabase,
    max_lists: u32,
}

impl ListController {
    pub fn new(db: ListDatabase, max_lists: u32) -> Self {
        Self { db, max_lists }
    }

    pub async fn create_list(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<create_list::MethodResult> {
        use create_list::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let list = self
            .db
            .insert_list(
                caller,
                params.list_type.as_str(),
                &params.title,
                params.is_private,
                self.max_lists,
            )
            .await?;

        Ok(MethodResult::new(ListWrapper::try_from(list)?.0))
    }

    pub async fn get_lists(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<get_lists::MethodResult> {
        use get_lists::{MethodResult, Params};
        let _params = Params::try_from(request)?;

        let lists = self
            .db
            .get_lists(caller)
            .await?
            .into_iter()
            .map(|list| ListWrapper::try_from(list).map(|w| w.0))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(MethodResult::new(lists))
    }

    pub async fn update_list(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<update_list::MethodResult> {
        use update_list::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let list = self
            .db
            .update_list(caller, params.id, params.title.as_deref(), params.is_private)
            .await?;

        Ok(MethodResult::new(ListWrapper::try_from(list)?.0))
    }

    pub async fn delete_list(
        &self,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<delete_list::MethodResult> {
        use delete_list::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let deleted = self.db.delete_list(caller, params.id).await?;

        Ok(MethodResult::new(deleted))
    }
}

/// Used in order to convert from `database::List` to `model::List` (orphan rule).
struct ListWrapper(List);

impl TryFrom<DbList> for ListWrapper {
    type Error = AppError;

    fn try_from(list: DbList) -> Result<Self, Self::Error> {
        let list_type = ListType::from_str(&list.list_type).map_err(|_| {
            AppError::internal_error()
                .with_context(&format!("invalid list type '{}' stored", list.list_type))
        })?;

        Ok(ListWrapper(List::new(
            list.id,
            list.owner_id,
            list_type,
            list.title,
            list.is_private,
            list.created_at,
            list.updated_at,
        )))
    }
}

impl ParamsError for create_list::InvalidParams {}
impl ParamsError for get_lists::InvalidParams {}
impl ParamsError for update_list::InvalidParams {}
impl ParamsError for delete_list::InvalidParams {}
