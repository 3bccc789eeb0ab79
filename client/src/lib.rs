use isahc::{http::method, AsyncReadResponseExt};
use model::{
    link::{
        create_parent_child_link, get_child_items, get_parent_items, remove_parent_child_link,
        validate_link_creation,
    },
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, Method,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{error::Error, fmt::Display};
use uuid::Uuid;

pub use queue::ReplayQueue;

mod queue;

#[macro_use]
extern crate log;

pub struct ListsClient {
    url: String,
    token: String,
    client: isahc::HttpClient,
}

impl ListsClient {
    pub fn new(url: String, token: String) -> ListsClientBuilder {
        ListsClientBuilder::new(url, token)
    }

    fn from_builder(builder: ListsClientBuilder) -> Result<Self, BuilderError> {
        let mut url = builder.url.trim();
        if let Some(without_trailing_slash) = url.strip_suffix('/') {
            url = without_trailing_slash;
        }
        if url.is_empty() {
            return Err(BuilderError::InvalidUrl);
        }

        let token = builder.token.trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            return Err(BuilderError::InvalidToken);
        }

        let client = isahc::HttpClient::new().map_err(BuilderError::Isahc)?;

        Ok(Self {
            url: url.to_owned(),
            token: token.to_owned(),
            client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/api", self.url)
    }

    /// Swaps the bearer token, e.g. after the identity provider issued a new one.
    pub fn set_token(&mut self, token: &str) {
        self.token = token.trim().to_owned();
    }

    /// Sends one request. Fails with [`ClientError::NoResponse`] for notifications.
    pub async fn send_request(
        &self,
        request: JsonRpcRequest,
    ) -> Result<JsonRpcResponse, ClientError> {
        let body = self.post(serde_json::to_vec(&request)?).await?;
        if body.is_empty() {
            return Err(ClientError::NoResponse);
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends the requests as one batch. Notifications get no entry in the returned responses.
    pub async fn send_batch(
        &self,
        requests: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, ClientError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let body = self.post(serde_json::to_vec(&requests)?).await?;
        if body.is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, ClientError> {
        let http_request = isahc::Request::builder()
            .uri(self.api_url())
            .method(method::Method::POST)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .body(body)?;

        let mut response = self.client.send_async(http_request).await?;
        trace!("api responded with status {}", response.status());

        Ok(response.bytes().await?)
    }

    /// Calls `method` and deserializes its result.
    pub async fn call<P, R>(&self, method: Method, params: P) -> Result<R, ClientError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest::new(
            method.to_string(),
            serde_json::to_value(params)?,
            Some(Uuid::new_v4().to_string()),
        );

        let response = self.send_request(request).await?;
        if let Some(error) = response.error.clone() {
            return Err(ClientError::Rpc(error));
        }

        response.result_as()?.ok_or(ClientError::NoResponse)
    }

    pub async fn create_parent_child_link(
        &self,
        parent_item_id: Uuid,
        child_item_ids: Vec<Uuid>,
    ) -> Result<create_parent_child_link::MethodResult, ClientError> {
        let params = create_parent_child_link::Params::new(parent_item_id, child_item_ids)
            .map_err(|e| ClientError::InvalidParams(e.to_string()))?;
        self.call(Method::CreateParentChildLink, params).await
    }

    pub async fn validate_link_creation(
        &self,
        parent_item_id: Uuid,
        child_item_ids: Vec<Uuid>,
    ) -> Result<validate_link_creation::MethodResult, ClientError> {
        let params = validate_link_creation::Params::new(parent_item_id, child_item_ids)
            .map_err(|e| ClientError::InvalidParams(e.to_string()))?;
        self.call(Method::ValidateLinkCreation, params).await
    }

    pub async fn remove_parent_child_link(
        &self,
        parent_item_id: Uuid,
        child_item_id: Uuid,
    ) -> Result<remove_parent_child_link::MethodResult, ClientError> {
        let params = remove_parent_child_link::Params::new(parent_item_id, child_item_id);
        self.call(Method::RemoveParentChildLink, params).await
    }

    pub async fn get_child_items(
        &self,
        parent_item_id: Uuid,
    ) -> Result<get_child_items::MethodResult, ClientError> {
        let params = get_child_items::Params::new(parent_item_id);
        self.call(Method::GetChildItems, params).await
    }

    pub async fn get_parent_items(
        &self,
        child_item_id: Uuid,
    ) -> Result<get_parent_items::MethodResult, ClientError> {
        let params = get_parent_items::Params::new(child_item_id);
        self.call(Method::GetParentItems, params).await
    }
}

pub struct ListsClientBuilder {
    url: String,
    token: String,
}

impl ListsClientBuilder {
    fn new(url: String, token: String) -> Self {
        Self { url, token }
    }

    pub fn build(self) -> Result<ListsClient, BuilderError> {
        ListsClient::from_builder(self)
    }
}

#[derive(Debug)]
pub enum BuilderError {
    InvalidUrl,
    InvalidToken,
    Isahc(isahc::Error),
}

impl Display for BuilderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuilderError::InvalidUrl => write!(f, "invalid url"),
            BuilderError::InvalidToken => write!(f, "invalid token"),
            BuilderError::Isahc(e) => write!(f, "could not create http client: '{}'", e),
        }
    }
}

impl Error for BuilderError {}

#[derive(Debug)]
pub enum ClientError {
    IsahcError(isahc::Error),
    HttpError(isahc::http::Error),
    IoError(std::io::Error),
    SerdeError(serde_json::Error),
    Rpc(JsonRpcError),
    InvalidParams(String),
    NoResponse,
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            ClientError::IsahcError(e) => format!("isahc error: '{}'", e),
            ClientError::HttpError(e) => format!("isahc http error: '{}'", e),
            ClientError::IoError(e) => format!("io error: '{}'", e),
            ClientError::SerdeError(serde_error) => format!("serde error: '{}'", serde_error),
            ClientError::Rpc(e) => format!("server error {}: '{}'", e.code, e.message),
            ClientError::InvalidParams(message) => format!("invalid params: '{}'", message),
            ClientError::NoResponse => "the server sent no response".to_owned(),
        };

        write!(f, "{}", output)
    }
}

impl From<isahc::Error> for ClientError {
    fn from(e: isahc::Error) -> Self {
        Self::IsahcError(e)
    }
}

impl From<isahc::http::Error> for ClientError {
    fn from(e: isahc::http::Error) -> Self {
        Self::HttpError(e)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerdeError(e)
    }
}

impl From<JsonRpcError> for ClientError {
    fn from(e: JsonRpcError) -> Self {
        Self::Rpc(e)
    }
}

impl Error for ClientError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_trims_the_url() {
        let client = ListsClient::new("http://localhost:3000/".to_owned(), " token ".to_owned())
            .build()
            .unwrap();
        assert_eq!(client.api_url(), "http://localhost:3000/api");
        assert_eq!(client.token, "token");
    }

    #[test]
    fn builder_rejects_blank_input() {
        assert!(matches!(
            ListsClient::new("  ".to_owned(), "token".to_owned()).build(),
            Err(BuilderError::InvalidUrl)
        ));
        assert!(matches!(
            ListsClient::new("http://localhost".to_owned(), "".to_owned()).build(),
            Err(BuilderError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn empty_batches_are_not_sent() {
        let client = ListsClient::new("http://localhost:1".to_owned(), "token".to_owned())
            .build()
            .unwrap();
        assert!(client.send_batch(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_link_params_fail_before_sending() {
        let client = ListsClient::new("http://localhost:1".to_owned(), "token".to_owned())
            .build()
            .unwrap();
        let result = client
            .create_parent_child_link(Uuid::new_v4(), Vec::new())
            .await;
        assert!(matches!(result, Err(ClientError::InvalidParams(_))));
    }
}
