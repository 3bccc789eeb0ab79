use crate::{
    auth::{self, Claims},
    controller::{ItemController, LinkController, ListController, ShareController},
    AppSettings,
};
use chrono::{DateTime, Utc};
use database::{
    Database, DatabaseError, PgPool, Request as DbRequest, RequestLog as DbRequestLog,
    Response as DbResponse,
};
use model::{access::Caller, *};
use std::{
    convert::TryFrom,
    error::Error,
    fmt::{Debug, Display},
    str::FromStr,
};
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

pub struct App {
    settings: AppSettings,
    request_log_db: Database<DbRequestLog>,
    link_controller: LinkController,
    list_controller: ListController,
    item_controller: ItemController,
    share_controller: ShareController,
}

impl App {
    pub fn new(settings: AppSettings, pool: PgPool) -> Self {
        let link_controller =
            LinkController::new(Database::with_pool(pool.clone()), settings.child_limit);
        let list_controller =
            ListController::new(Database::with_pool(pool.clone()), settings.max_lists_per_user);
        let item_controller = ItemController::new(
            Database::with_pool(pool.clone()),
            Database::with_pool(pool.clone()),
            settings.max_items_per_list,
        );
        let share_controller =
            ShareController::new(Database::with_pool(pool.clone()), settings.max_share_days);
        let request_log_db = Database::with_pool(pool);

        Self {
            settings,
            request_log_db,
            link_controller,
            list_controller,
            item_controller,
            share_controller,
        }
    }

    /// Handle a single JSON RPC request
    pub async fn handle_single(
        &self,
        request: JsonRpcRequest,
        claims: &Option<Claims>,
    ) -> JsonRpcResponse {
        let timer = std::time::Instant::now();
        let id = request.id.clone();
        let request_log_clone = request.clone();
        let request_ts = Utc::now();

        let method = request.method.to_owned();
        info!(
            "handling request with id {:?} with method: '{}'",
            id, request.method
        );

        let result = match Method::from_str(&method) {
            Err(_) => Err(AppError::from(JsonRpcError::method_not_found())),
            Ok(method) => {
                trace!("request: {:?}", request);
                match auth::authenticate(claims) {
                    Ok(caller) => self.dispatch(method, &caller, request).await,
                    Err(e) => Err(e),
                }
            }
        };

        let elapsed = timer.elapsed();
        info!(
            "handled request with id {:?} and method: '{}' in {:?}",
            id, method, elapsed
        );

        let (response, error_context) = match result {
            Ok(ok) => (ok, None),
            Err(err) => {
                let rpc_error = err.rpc_error.with_status_data();
                match err.context {
                    Some(context) => {
                        error!(
                            "error in '{}' with context: {} ({})",
                            method, rpc_error.message, context
                        );
                        (JsonRpcResponse::error(rpc_error, id.clone()), Some(context))
                    }
                    None => (JsonRpcResponse::error(rpc_error, id.clone()), None),
                }
            }
        };

        self.save_request_log(
            request_log_clone,
            request_ts,
            &response,
            error_context,
            elapsed.as_millis() as i64,
        );

        response
    }

    async fn dispatch(
        &self,
        method: Method,
        caller: &Caller,
        request: JsonRpcRequest,
    ) -> AppResult<JsonRpcResponse> {
        let id = request.id.clone();
        match method {
            Method::CreateParentChildLink => self
                .link_controller
                .create_parent_child_link(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::RemoveParentChildLink => self
                .link_controller
                .remove_parent_child_link(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::ValidateLinkCreation => self
                .link_controller
                .validate_link_creation(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::GetChildItems => self
                .link_controller
                .get_child_items(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::GetParentItems => self
                .link_controller
                .get_parent_items(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::CreateList => self
                .list_controller
                .create_list(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::GetLists => self
                .list_controller
                .get_lists(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::UpdateList => self
                .list_controller
                .update_list(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::DeleteList => self
                .list_controller
                .delete_list(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::AddItem => self
                .item_controller
                .add_item(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::GetItems => self
                .item_controller
                .get_items(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::UpdateItem => self
                .item_controller
                .update_item(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::DeleteItem => self
                .item_controller
                .delete_item(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::ReorderItems => self
                .item_controller
                .reorder_items(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::GetItemSuggestions => self
                .item_controller
                .get_item_suggestions(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::CreateShare => self
                .share_controller
                .create_share(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::GetShares => self
                .share_controller
                .get_shares(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            Method::RevokeShares => self
                .share_controller
                .revoke_shares(caller, request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
        }
    }

    fn save_request_log(
        &self,
        request: JsonRpcRequest,
        request_ts: DateTime<Utc>,
        response: &JsonRpcResponse,
        error_context: Option<String>,
        duration_ms: i64,
    ) {
        if !self.settings.publish_request_log {
            return;
        }

        let db_request = match DbRequestWrapper::try_from((request, request_ts)) {
            Ok(ok) => ok.0,
            Err(e) => {
                error!("{}", e);
                return;
            }
        };
        let db_response = match DbResponseWrapper::try_from(response) {
            Ok(ok) => ok.0,
            Err(err) => {
                error!("{}", err);
                return;
            }
        };
        let log = DbRequestLog::new(
            Uuid::new_v4(),
            db_request,
            db_response,
            error_context,
            duration_ms,
        );

        let db = self.request_log_db.clone();
        tokio::spawn(async move {
            match db.insert_log(&log).await {
                Ok(ok) => {
                    trace!("successfully inserted request log with result: '{:?}'", ok);
                }
                Err(err) => {
                    error!("failed to insert request log with error: '{:?}'", err);
                }
            }
        });
    }
}

#[derive(Debug)]
pub struct AppError {
    pub rpc_error: JsonRpcError,
    pub context: Option<String>,
}

impl AppError {
    pub fn with_context<T>(mut self, value: &T) -> Self
    where
        T: Debug,
    {
        self.context = Some(format!("{:?}", value));
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.rpc_error.message = message.to_owned();
        self
    }

    pub fn parse_error() -> Self {
        Self::from(JsonRpcError::parse_error())
    }

    pub fn invalid_request() -> Self {
        Self::from(JsonRpcError::invalid_request())
    }

    pub fn invalid_params() -> Self {
        Self::from(JsonRpcError::invalid_params())
    }

    pub fn internal_error() -> Self {
        Self::from(JsonRpcError::internal_error())
    }

    pub fn database_error() -> Self {
        Self::from(JsonRpcError::database_error())
    }

    pub fn unauthenticated() -> Self {
        Self::from(JsonRpcError::unauthenticated())
    }

    pub fn forbidden() -> Self {
        Self::from(JsonRpcError::forbidden())
    }

    pub fn not_found() -> Self {
        Self::from(JsonRpcError::not_found())
    }

    pub fn conflict() -> Self {
        Self::from(JsonRpcError::conflict())
    }

    pub fn limit_exceeded() -> Self {
        Self::from(JsonRpcError::limit_exceeded())
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rpc_error.message)
    }
}

impl Error for AppError {}

impl From<JsonRpcError> for AppError {
    fn from(rpc_error: JsonRpcError) -> Self {
        Self {
            rpc_error,
            context: None,
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(db_error: DatabaseError) -> Self {
        match db_error {
            DatabaseError::NotFound => AppError::not_found(),
            DatabaseError::Forbidden => AppError::forbidden(),
            DatabaseError::Conflict => AppError::conflict(),
            DatabaseError::LimitExceeded(message) => AppError::limit_exceeded().with_message(&message),
            DatabaseError::Invalid(message) => AppError::invalid_params().with_message(&message),
            DatabaseError::Migrate(_) => AppError::internal_error().with_context(&db_error),
            DatabaseError::Sqlx(_) => AppError::database_error().with_context(&db_error),
        }
    }
}

impl From<hyper::http::Error> for AppError {
    fn from(e: hyper::http::Error) -> Self {
        AppError::internal_error().with_context(&e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::internal_error().with_context(&e)
    }
}

pub trait ParamsError: Error {}

impl<T> From<T> for AppError
where
    T: ParamsError,
{
    fn from(err: T) -> Self {
        AppError::invalid_params()
            .with_message(&err.to_string())
            .with_context(&err)
    }
}

struct DbRequestWrapper(DbRequest);

impl TryFrom<(JsonRpcRequest, DateTime<Utc>)> for DbRequestWrapper {
    type Error = String;

    fn try_from((request, ts): (JsonRpcRequest, DateTime<Utc>)) -> Result<Self, Self::Error> {
        let id = request.id;
        let method = request.method;
        let params = serde_json::to_string(&request.params)
            .map_err(|_| "failed to serialize params".to_string())?;
        Ok(DbRequestWrapper(DbRequest::new(id, method, params, ts)))
    }
}

struct DbResponseWrapper(DbResponse);

impl TryFrom<&JsonRpcResponse> for DbResponseWrapper {
    type Error = String;

    fn try_from(value: &JsonRpcResponse) -> Result<Self, Self::Error> {
        let response = match value.kind() {
            ResponseKind::Success(s) => {
                DbResponse::Success(serde_json::to_string(s).map_err(|e| e.to_string())?)
            }
            ResponseKind::Error(e) => {
                DbResponse::Error(serde_json::to_string(e).map_err(|e| e.to_string())?)
            }
        };

        Ok(DbResponseWrapper(response))
    }
}
