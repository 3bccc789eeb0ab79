use crate::{Database, DatabaseResult, InsertionResult};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type RequestLogDatabase = Database<RequestLog>;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RequestLog {
    id: Uuid,
    request: Request,
    response: Response,
    error_context: Option<String>,
    duration_ms: i64,
}

impl RequestLog {
    pub fn new(
        id: Uuid,
        request: Request,
        response: Response,
        error_context: Option<String>,
        duration_ms: i64,
    ) -> Self {
        Self {
            id,
            request,
            response,
            error_context,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Request {
    id: Option<String>,
    method: String,
    params: String,
    ts: DateTime<Utc>,
}

impl Request {
    pub fn new(id: Option<String>, method: String, params: String, ts: DateTime<Utc>) -> Self {
        Self {
            id,
            method,
            params,
            ts,
        }
    }
}

/// Serialized outcome of a request: either `result` or `error` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success(String),
    Error(String),
}

impl RequestLogDatabase {
    pub async fn insert_log(
        &self,
        RequestLog {
            id,
            request,
            response,
            error_context,
            duration_ms,
        }: &RequestLog,
    ) -> DatabaseResult<InsertionResult> {
        let mut db = self.get_connection().await?;

        let (result, error) = match response {
            Response::Success(result) => (Some(result), None),
            Response::Error(error) => (None, Some(error)),
        };

        let query_result = sqlx::query(
            "
            INSERT INTO request_log (id,
                request_id,
                request_method,
                request_params,
                request_ts,
                response_result,
                response_error,
                response_error_context,
                duration_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(&request.id)
        .bind(&request.method)
        .bind(&request.params)
        .bind(request.ts)
        .bind(result)
        .bind(error)
        .bind(error_context)
        .bind(duration_ms)
        .execute(&mut *db)
        .await?;

        Ok(InsertionResult::from_changed_rows(
            query_result.rows_affected(),
        ))
    }
}
