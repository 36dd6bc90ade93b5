/// Error handling for the API server
///
/// All handlers return `ApiResult<T>`. `ApiError` wraps the core
/// [`DepotError`] taxonomy and renders it as
///
/// ```json
/// { "description": "Unknown project", "code": "unknown_project" }
/// ```
///
/// with any diagnostic detail merged into the same object.
///
/// # Example
///
/// ```no_run
/// use depot_api::error::{ApiError, ApiResult};
/// use depot_shared::error::DepotError;
/// use axum::Json;
/// use serde_json::Value;
///
/// async fn handler() -> ApiResult<Json<Value>> {
///     Err(ApiError::from(DepotError::unknown("project")))
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use depot_shared::auth::jwt::JwtError;
use depot_shared::error::DepotError;
use serde_json::{json, Map, Value};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub DepotError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.0.status()
    }

    pub fn code(&self) -> String {
        self.0.code()
    }

    /// Response body: description and code, plus the error's detail
    pub fn body(&self) -> Value {
        let mut body = Map::new();

        match self.0.detail() {
            Some(Value::Object(fields)) => {
                body.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(other) => {
                body.insert("detail".to_string(), other.clone());
            }
            None => {}
        }

        body.insert("description".to_string(), Value::String(self.0.to_string()));
        body.insert("code".to_string(), Value::String(self.0.code()));
        Value::Object(body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            if self.0.is_integrity_violation() {
                tracing::error!(integrity_violation = true, code = %code, error = %self.0, "Data integrity violation");
            } else {
                tracing::error!(code = %code, error = %self.0, "Request failed");
            }
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(status = status.as_u16(), code = %code, "Request denied");
        } else {
            tracing::debug!(status = status.as_u16(), code = %code, "Request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError(DepotError::Sql(err))
    }
}

/// Bodies that are absent or not JSON are `json_required`; JSON of the wrong
/// shape is `invalid_body`
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError(DepotError::invalid(
                "body",
                Some(json!({ "reason": e.body_text() })),
            )),
            _ => ApiError(DepotError::JsonRequired),
        }
    }
}

/// Malformed query strings are `invalid_query`
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(DepotError::invalid(
            "query",
            Some(json!({ "reason": rejection.body_text() })),
        ))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError(DepotError::Internal(msg)),
            _ => ApiError(DepotError::Forbidden),
        }
    }
}
