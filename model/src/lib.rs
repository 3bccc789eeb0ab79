#![allow(clippy::new_without_default)]

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    convert::{Infallible, TryFrom},
    error::Error,
    fmt::{Debug, Display},
    str::FromStr,
};

pub use methods::*;

pub mod access;
pub mod links;
mod methods;
pub mod status;

#[macro_use]
extern crate log;

mod method_names {
    pub const CREATE_PARENT_CHILD_LINK: &str = "create_parent_child_link";
    pub const REMOVE_PARENT_CHILD_LINK: &str = "remove_parent_child_link";
    pub const VALIDATE_LINK_CREATION: &str = "validate_link_creation";
    pub const GET_CHILD_ITEMS: &str = "get_child_items";
    pub const GET_PARENT_ITEMS: &str = "get_parent_items";

    pub const CREATE_LIST: &str = "create_list";
    pub const GET_LISTS: &str = "get_lists";
    pub const UPDATE_LIST: &str = "update_list";
    pub const DELETE_LIST: &str = "delete_list";

    pub const ADD_ITEM: &str = "add_item";
    pub const GET_ITEMS: &str = "get_items";
    pub const UPDATE_ITEM: &str = "update_item";
    pub const DELETE_ITEM: &str = "delete_item";
    pub const REORDER_ITEMS: &str = "reorder_items";
    pub const GET_ITEM_SUGGESTIONS: &str = "get_item_suggestions";

    pub const CREATE_SHARE: &str = "create_share";
    pub const GET_SHARES: &str = "get_shares";
    pub const REVOKE_SHARES: &str = "revoke_shares";
}

pub mod error_codes {
    pub mod standard {
        pub const PARSE_ERROR: i32 = -32700;
        pub const INVALID_REQUEST: i32 = -32600;
        pub const METHOD_NOT_FOUND: i32 = -32601;
        pub const INVALID_PARAMS: i32 = -32602;
        pub const INTERNAL_ERROR: i32 = -32603;
    }

    pub mod application {
        pub const NOT_FOUND: i32 = -31999;
        pub const FORBIDDEN: i32 = -31998;
        pub const UNAUTHENTICATED: i32 = -31996;
        pub const CONFLICT: i32 = -31995;
        pub const LIMIT_EXCEEDED: i32 = -31994;
    }
}

/// A JSONRPC method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Link a parent item to one or more child items
    CreateParentChildLink,
    /// Remove a single parent/child link
    RemoveParentChildLink,
    /// Check which children could be linked to a parent, without linking them
    ValidateLinkCreation,
    /// Get the direct children of an item
    GetChildItems,
    /// Get the direct parents of an item
    GetParentItems,

    /// Create a list
    CreateList,
    /// Get all lists the caller owns or has been shared
    GetLists,
    /// Change the title or privacy of a list
    UpdateList,
    /// Delete a list with all of its items and shares
    DeleteList,

    /// Add an item to a list
    AddItem,
    /// Get all items of a list
    GetItems,
    /// Edit an item, including toggling its completion
    UpdateItem,
    /// Delete an item
    DeleteItem,
    /// Rewrite the order of the items in a list
    ReorderItems,
    /// Get frequently used item contents for a list
    GetItemSuggestions,

    /// Share a list with someone
    CreateShare,
    /// Get the active shares of a list
    GetShares,
    /// Revoke every share of a list
    RevokeShares,
}

impl FromStr for Method {
    type Err = (); // any failure means the method simply doesn't exist
    fn from_str(s: &str) -> Result<Method, Self::Err> {
        use method_names::*;
        use Method::*;
        match s {
            CREATE_PARENT_CHILD_LINK => Ok(CreateParentChildLink),
            REMOVE_PARENT_CHILD_LINK => Ok(RemoveParentChildLink),
            VALIDATE_LINK_CREATION => Ok(ValidateLinkCreation),
            GET_CHILD_ITEMS => Ok(GetChildItems),
            GET_PARENT_ITEMS => Ok(GetParentItems),
            CREATE_LIST => Ok(CreateList),
            GET_LISTS => Ok(GetLists),
            UPDATE_LIST => Ok(UpdateList),
            DELETE_LIST => Ok(DeleteList),
            ADD_ITEM => Ok(AddItem),
            GET_ITEMS => Ok(GetItems),
            UPDATE_ITEM => Ok(UpdateItem),
            DELETE_ITEM => Ok(DeleteItem),
            REORDER_ITEMS => Ok(ReorderItems),
            GET_ITEM_SUGGESTIONS => Ok(GetItemSuggestions),
            CREATE_SHARE => Ok(CreateShare),
            GET_SHARES => Ok(GetShares),
            REVOKE_SHARES => Ok(RevokeShares),
            _ => Err(()),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use method_names::*;
        use Method::*;
        let output = match self {
            CreateParentChildLink => CREATE_PARENT_CHILD_LINK,
            RemoveParentChildLink => REMOVE_PARENT_CHILD_LINK,
            ValidateLinkCreation => VALIDATE_LINK_CREATION,
            GetChildItems => GET_CHILD_ITEMS,
            GetParentItems => GET_PARENT_ITEMS,
            CreateList => CREATE_LIST,
            GetLists => GET_LISTS,
            UpdateList => UPDATE_LIST,
            DeleteList => DELETE_LIST,
            AddItem => ADD_ITEM,
            GetItems => GET_ITEMS,
            UpdateItem => UPDATE_ITEM,
            DeleteItem => DELETE_ITEM,
            ReorderItems => REORDER_ITEMS,
            GetItemSuggestions => GET_ITEM_SUGGESTIONS,
            CreateShare => CREATE_SHARE,
            GetShares => GET_SHARES,
            RevokeShares => REVOKE_SHARES,
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Copy)]
pub enum JsonRpcVersion {
    #[serde(alias = "2.0", rename = "2.0")]
    Two,
}

/// A JSONRPC request.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
#[non_exhaustive]
pub struct JsonRpcRequest {
    /// JSONRPC version.
    pub jsonrpc: JsonRpcVersion,
    /// RPC method to call.
    pub method: String,
    /// Parameters to pass to the method.
    #[serde(default)]
    pub params: Value,
    /// A response to this request should contain this same id (provided by the requester).
    /// If the request is a notification, then `id` is `None`.
    pub id: Option<String>,
}

impl JsonRpcRequest {
    pub fn new<T>(method: String, params: T, id: Option<String>) -> Self
    where
        T: Serialize,
    {
        Self {
            jsonrpc: JsonRpcVersion::Two,
            method,
            params: serde_json::to_value(params).expect("params serialize to json"),
            id,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug)]
pub struct JsonRpcRequestBuilder {
    jsonrpc: Option<JsonRpcVersion>,
    method: Option<String>,
    params: Option<Value>,
    id: Option<String>,
}

impl JsonRpcRequestBuilder {
    pub fn new() -> Self {
        Self {
            jsonrpc: None,
            method: None,
            params: None,
            id: None,
        }
    }

    pub fn build(self) -> Result<JsonRpcRequest, JsonRpcRequestBuilderError> {
        let jsonrpc = self.jsonrpc.unwrap_or(JsonRpcVersion::Two);
        let method = self
            .method
            .ok_or(JsonRpcRequestBuilderError::MissingMethod)?;
        let params = self
            .params
            .ok_or(JsonRpcRequestBuilderError::MissingParams)?;
        let id = self.id;

        Ok(JsonRpcRequest {
            jsonrpc,
            method,
            params,
            id,
        })
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_params<T>(mut self, params: T) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    pub fn with_id(mut self, id: String) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug)]
pub enum JsonRpcRequestBuilderError {
    MissingMethod,
    MissingParams,
}

impl Display for JsonRpcRequestBuilderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            JsonRpcRequestBuilderError::MissingMethod => "missing 'method' property",
            JsonRpcRequestBuilderError::MissingParams => "missing 'params' property",
        };
        write!(f, "{}", output)
    }
}

impl Error for JsonRpcRequestBuilderError {}

/// A JSONRPC response object. Contains _either_ a `result` (in case of success) or `error` (in case of failure).
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct JsonRpcResponse {
    /// JSONRPC version of the response.
    pub jsonrpc: JsonRpcVersion,
    /// Optional data to be returned in case of success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Optional data to be returned in case of failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Id corresponding to `id` property of request (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl JsonRpcResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Deserialize the contained json result (if any)
    pub fn result_as<T>(self) -> Result<Option<T>, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        Ok(match self.result {
            Some(r) => {
                let deserialized: T = serde_json::from_value(r)?;
                Some(deserialized)
            }
            None => None,
        })
    }

    /// Says whether the response indicates a success or an error.
    pub fn kind(&self) -> ResponseKind {
        match (&self.result, &self.error) {
            (_, Some(error)) => ResponseKind::Error(error),
            (Some(result), None) => ResponseKind::Success(result),
            (None, None) => ResponseKind::Success(&Value::Null),
        }
    }

    /// Create a `JsonRpcResponse` from a `Result`.
    pub fn from_result<T>(result: Result<T, JsonRpcError>, id: Option<String>) -> Self
    where
        T: Serialize,
    {
        match result {
            Ok(s) => Self::success(s, id),
            Err(e) => Self::error(e, id),
        }
    }

    /// Create a `JsonRpcResponse` with a `result` property (indicating success).
    pub fn success<T: Serialize>(result: T, id: Option<String>) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self {
                jsonrpc: JsonRpcVersion::Two,
                result: Some(result),
                error: None,
                id,
            },
            Err(e) => Self::error(
                JsonRpcError::internal_error().with_message(format!("unserializable result: {}", e)),
                id,
            ),
        }
    }

    /// Create a `JsonRpcResponse` with an `error` property (indicating failure).
    pub fn error(error: JsonRpcError, id: Option<String>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion::Two,
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[derive(Debug)]
pub enum ResponseKind<'a> {
    Success(&'a Value),
    Error(&'a JsonRpcError),
}

/// Error object to be returned in a `JsonRpcResponse` if something failed.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct JsonRpcError {
    /// JSONRPC error code.
    pub code: i32,
    /// Short description of what went wrong.
    pub message: String,
    /// Optional field containing structured error information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code: code.into(),
            message,
            data: None,
        }
    }

    /// Set the `message` property on `self`.
    pub fn with_message<T>(mut self, message: T) -> Self
    where
        T: Into<String>,
    {
        self.message = message.into();
        self
    }

    /// Set the `data` property on `self`.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Constructor for a "Parse error" JSONRPC error.
    ///
    /// ## Definition
    /// Invalid JSON was received by the server.
    pub fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError, "Parse error".to_owned())
    }

    /// Constructor for a "Method not found" JSONRPC error.
    ///
    /// ## Definition
    /// The method does not exist / is not available.
    pub fn method_not_found() -> Self {
        Self::new(ErrorCode::MethodNotFound, "Method not found".to_owned())
    }

    /// Constructor for a "Invalid request" JSONRPC error.
    ///
    /// ## Definition
    /// The JSON sent is not a valid Request object.
    pub fn invalid_request() -> Self {
        Self::new(ErrorCode::InvalidRequest, "Invalid request".to_owned())
    }

    /// Constructor for an "Invalid params" JSONRPC error.
    ///
    /// ## Definition
    /// Invalid method parameter(s).
    pub fn invalid_params() -> Self {
        Self::new(ErrorCode::InvalidParams, "Invalid params".to_owned())
    }

    /// Constructor for an "Internal error" JSONRPC error.
    ///
    /// ## Definition
    /// Internal JSON-RPC error.
    pub fn internal_error() -> Self {
        Self::new(ErrorCode::InternalError, "Internal error".to_owned())
    }

    /// Constructor for an "Application error" error.
    ///
    /// This error means your request could not be processed due to a failure in the application level logic.
    ///
    /// # Panics
    /// If `code` is a reserved error code according to the JSON-RPC specs. See the [JSONRPC specification](https://www.jsonrpc.org/specification#error_object) for more information.
    pub fn application_error(code: i32, message: &str) -> Self {
        if ErrorCode::is_reserved(code) {
            panic!("error code '{}' is reserved by the JSON-RPC spec", code);
        }
        Self {
            code,
            message: message.to_owned(),
            data: None,
        }
    }

    /// The caller did not present a valid bearer token.
    pub fn unauthenticated() -> Self {
        Self::application_error(error_codes::application::UNAUTHENTICATED, "not authenticated")
    }

    /// The caller is authenticated but may not touch the resource.
    pub fn forbidden() -> Self {
        Self::application_error(error_codes::application::FORBIDDEN, "not permitted")
    }

    pub fn not_found() -> Self {
        Self::application_error(error_codes::application::NOT_FOUND, "not found")
    }

    pub fn conflict() -> Self {
        Self::application_error(error_codes::application::CONFLICT, "conflict")
    }

    /// A business rule such as a list or item cap was violated.
    pub fn limit_exceeded() -> Self {
        Self::application_error(error_codes::application::LIMIT_EXCEEDED, "limit exceeded")
    }

    pub fn database_error() -> Self {
        Self::internal_error().with_message("database error")
    }

    /// HTTP status equivalent to this error.
    pub fn http_status(&self) -> u16 {
        use error_codes::{application::*, standard::*};
        match self.code {
            PARSE_ERROR | INVALID_REQUEST | INVALID_PARAMS | LIMIT_EXCEEDED => 400,
            UNAUTHENTICATED => 401,
            FORBIDDEN => 403,
            NOT_FOUND | METHOD_NOT_FOUND => 404,
            CONFLICT => 409,
            _ => 500,
        }
    }

    /// Records [`http_status`](Self::http_status) as `data.status`. Non-object data is left
    /// untouched.
    pub fn with_status_data(mut self) -> Self {
        let status = Value::from(self.http_status());
        match &mut self.data {
            Some(Value::Object(data)) => {
                data.insert("status".to_owned(), status);
            }
            Some(_) => (),
            None => {
                let mut data = serde_json::Map::new();
                data.insert("status".to_owned(), status);
                self.data = Some(Value::Object(data));
            }
        }
        self
    }
}

impl From<Infallible> for JsonRpcError {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

/// Code identifying which type of error has occurred.
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The JSON received was not a valid JSONRPC request object.
    InvalidRequest,
    /// The method does not exist / is not available.
    MethodNotFound,
    /// Invalid method parameter(s).
    InvalidParams,
    /// Internal JSONRPC error.
    InternalError,
}

impl ErrorCode {
    pub fn is_reserved(code: i32) -> bool {
        (-32768..=-32000).contains(&code)
    }
}

impl From<ErrorCode> for i32 {
    fn from(error_code: ErrorCode) -> Self {
        match error_code {
            ErrorCode::ParseError => error_codes::standard::PARSE_ERROR,
            ErrorCode::InvalidRequest => error_codes::standard::INVALID_REQUEST,
            ErrorCode::MethodNotFound => error_codes::standard::METHOD_NOT_FOUND,
            ErrorCode::InvalidParams => error_codes::standard::INVALID_PARAMS,
            ErrorCode::InternalError => error_codes::standard::INTERNAL_ERROR,
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            error_codes::standard::PARSE_ERROR => ErrorCode::ParseError,
            error_codes::standard::INVALID_REQUEST => ErrorCode::InvalidRequest,
            error_codes::standard::INTERNAL_ERROR => ErrorCode::InternalError,
            error_codes::standard::INVALID_PARAMS => ErrorCode::InvalidParams,
            error_codes::standard::METHOD_NOT_FOUND => ErrorCode::MethodNotFound,
            _ => return Err(()),
        })
    }
}

fn invalid_params_serde_message(err: &serde_json::Error) -> String {
    format!("invalid format of params object: '{}'", err)
}

fn generic_invalid_value_message(param_name: &str) -> String {
    format!("invalid value of '{}'", param_name)
}

fn invalid_value_because_message(param_name: &str, clarification: String) -> String {
    format!(
        "{}, {}",
        generic_invalid_value_message(param_name),
        clarification
    )
}

/// Trims `value` and checks that the result holds between 1 and `max_len` characters.
fn bounded_text(value: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > max_len {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
