/// Common error type for the depot core
///
/// Every mutator, gate and helper in this crate returns `Result<T, DepotError>`.
/// Each variant maps to exactly one HTTP status and one machine-readable error
/// code of the form `<kind>_<key>` (e.g. `unknown_project`, `missing_projectCode`).
///
/// # Status mapping
///
/// | Variant | Status | Code |
/// |---|---|---|
/// | `MissingParam` | 400 | `missing_<param>` |
/// | `InconsistentParam` | 400 | `inconsistent_<param>` |
/// | `JsonRequired` | 400 | `json_required` |
/// | `Invalid` | 400 | `invalid_<key>` |
/// | `BasicAuthRequired` | 401 | `basic_auth_required` |
/// | `AuthTokenRequired` | 401 | `auth_token_required` |
/// | `Forbidden` | 403 | `forbidden` |
/// | `Unknown` | 404 | `unknown_<key>` |
/// | `CannotModify` | 409 | `cannot_modify_<key>` |
/// | `Duplicate` | 500 | `duplicate_<key>` |
/// | `Sql` | 500 | `sql_error` |
/// | `Internal` | 500 | `internal_server_error` |
///
/// # Example
///
/// ```
/// use depot_shared::error::DepotError;
/// use axum::http::StatusCode;
///
/// let err = DepotError::unknown("project");
/// assert_eq!(err.status(), StatusCode::NOT_FOUND);
/// assert_eq!(err.code(), "unknown_project");
/// ```

use axum::http::StatusCode;
use serde_json::Value;

use crate::db::query::is_transient;

/// Error kinds produced by the depot core
#[derive(Debug, thiserror::Error)]
pub enum DepotError {
    /// A required parameter was not supplied
    #[error("Missing required parameter: {0}")]
    MissingParam(String),

    /// Path and body disagree about a parameter
    #[error("Inconsistent values for parameter: {0}")]
    InconsistentParam(String),

    /// The request body is absent or not JSON
    #[error("A JSON request body is required")]
    JsonRequired,

    /// A value was present but malformed
    #[error("Invalid {key}")]
    Invalid {
        key: String,
        detail: Option<Value>,
    },

    /// Endpoint needs HTTP Basic credentials and none were sent
    #[error("Basic authentication required")]
    BasicAuthRequired,

    /// Endpoint needs a bearer token and none was sent
    #[error("Authentication token required")]
    AuthTokenRequired,

    /// Credentials were present but do not grant access
    #[error("Forbidden")]
    Forbidden,

    /// Zero rows where exactly one was expected
    #[error("Unknown {0}")]
    Unknown(String),

    /// The request tries to change something that cannot change
    #[error("Cannot modify {0}")]
    CannotModify(String),

    /// More than one row where uniqueness was assumed
    #[error("Duplicate {0}: data integrity violation")]
    Duplicate(String),

    /// Store failure
    #[error("Database error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Anything else, including misconfiguration discovered at request time
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl DepotError {
    pub fn missing(param: &str) -> Self {
        DepotError::MissingParam(param.to_string())
    }

    pub fn inconsistent(param: &str) -> Self {
        DepotError::InconsistentParam(param.to_string())
    }

    pub fn invalid(key: &str, detail: Option<Value>) -> Self {
        DepotError::Invalid {
            key: key.to_string(),
            detail,
        }
    }

    pub fn unknown(key: &str) -> Self {
        DepotError::Unknown(key.to_string())
    }

    pub fn cannot_modify(key: &str) -> Self {
        DepotError::CannotModify(key.to_string())
    }

    pub fn duplicate(key: &str) -> Self {
        DepotError::Duplicate(key.to_string())
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            DepotError::MissingParam(_)
            | DepotError::InconsistentParam(_)
            | DepotError::JsonRequired
            | DepotError::Invalid { .. } => StatusCode::BAD_REQUEST,
            DepotError::BasicAuthRequired | DepotError::AuthTokenRequired => {
                StatusCode::UNAUTHORIZED
            }
            DepotError::Forbidden => StatusCode::FORBIDDEN,
            DepotError::Unknown(_) => StatusCode::NOT_FOUND,
            DepotError::CannotModify(_) => StatusCode::CONFLICT,
            DepotError::Duplicate(_) | DepotError::Sql(_) | DepotError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> String {
        match self {
            DepotError::MissingParam(param) => format!("missing_{}", param),
            DepotError::InconsistentParam(param) => format!("inconsistent_{}", param),
            DepotError::JsonRequired => "json_required".to_string(),
            DepotError::Invalid { key, .. } => format!("invalid_{}", key),
            DepotError::BasicAuthRequired => "basic_auth_required".to_string(),
            DepotError::AuthTokenRequired => "auth_token_required".to_string(),
            DepotError::Forbidden => "forbidden".to_string(),
            DepotError::Unknown(key) => format!("unknown_{}", key),
            DepotError::CannotModify(key) => format!("cannot_modify_{}", key),
            DepotError::Duplicate(key) => format!("duplicate_{}", key),
            DepotError::Sql(_) => "sql_error".to_string(),
            DepotError::Internal(_) => "internal_server_error".to_string(),
        }
    }

    /// Diagnostic payload attached to the error, if any
    pub fn detail(&self) -> Option<&Value> {
        match self {
            DepotError::Invalid { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    /// True for store failures that are expected to clear up on retry
    pub fn is_transient(&self) -> bool {
        match self {
            DepotError::Sql(err) => is_transient(err),
            _ => false,
        }
    }

    /// True when the error signals a broken uniqueness invariant
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, DepotError::Duplicate(_))
    }
}

impl From<validator::ValidationErrors> for DepotError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Report the first failing field; the rest travel in the detail
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();

        let key = fields.first().cloned().unwrap_or_else(|| "body".to_string());
        let detail = serde_json::to_value(&errors).ok();

        DepotError::Invalid { key, detail }
    }
}
