/// Credential verification for HTTP Basic and Bearer authentication
///
/// Both verifiers answer with an [`Authentication`]:
///
/// - `Missing(scheme)`: the request carried no credentials for `scheme`
///   (401 with `basic_auth_required` / `auth_token_required`)
/// - `Rejected`: credentials were supplied and are wrong (403)
/// - `Authenticated(user)`: the user row, freshly read from the store
///
/// User lookups run under the store's retry policy. A transient failure that
/// outlasts the retries degrades to `Missing`, since the store never gave a
/// definite answer. Other store failures are returned as errors.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use depot_shared::auth::credentials::{verify_basic, Authentication};
/// use depot_shared::db::store::Store;
///
/// # async fn example(store: &Store, headers: &HeaderMap) -> Result<(), depot_shared::error::DepotError> {
/// match verify_basic(store, headers).await? {
///     Authentication::Authenticated(user) => println!("hello {}", user.username),
///     Authentication::Rejected => println!("bad credentials"),
///     Authentication::Missing(scheme) => println!("no {:?} credentials", scheme),
/// }
/// # Ok(())
/// # }
/// ```

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sqlx::PgPool;
use tracing::{debug, warn};

use super::jwt::{validate_token, JwtSettings};
use super::password::verify_password;
use crate::db::store::Store;
use crate::error::DepotError;
use crate::models::user::User;

/// Authentication scheme a request is expected to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Bearer,
}

/// Outcome of credential verification
#[derive(Debug, Clone)]
pub enum Authentication {
    Missing(AuthScheme),
    Rejected,
    Authenticated(User),
}

impl Authentication {
    pub fn user(&self) -> Option<&User> {
        match self {
            Authentication::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// The authenticated user, or the error a request without one gets
    pub fn into_user(self) -> Result<User, DepotError> {
        match self {
            Authentication::Authenticated(user) => Ok(user),
            Authentication::Rejected => Err(DepotError::Forbidden),
            Authentication::Missing(AuthScheme::Basic) => Err(DepotError::BasicAuthRequired),
            Authentication::Missing(AuthScheme::Bearer) => Err(DepotError::AuthTokenRequired),
        }
    }
}

/// Value of the `Authorization` header after `scheme`, if it uses that scheme
pub fn authorization_value<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (presented, rest) = value.split_once(' ')?;

    if presented.eq_ignore_ascii_case(scheme) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Decodes `base64(username:password)`
pub fn decode_basic(encoded: &str) -> Option<(String, String)> {
    let bytes = STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (username, password) = text.split_once(':')?;

    if username.is_empty() {
        return None;
    }

    Some((username.to_string(), password.to_string()))
}

/// Verifies `Authorization: Basic ...` against the stored password
pub async fn verify_basic(store: &Store, headers: &HeaderMap) -> Result<Authentication, DepotError> {
    let Some(encoded) = authorization_value(headers, "Basic") else {
        return Ok(Authentication::Missing(AuthScheme::Basic));
    };

    let Some((username, password)) = decode_basic(encoded) else {
        debug!("Malformed Basic credentials");
        return Ok(Authentication::Rejected);
    };

    let rows = match store.retrying(|| users_named(store.pool(), &username)).await {
        Ok(rows) => rows,
        Err(e) if e.is_transient() => {
            warn!(error = %e, "User lookup failed after retries, treating credentials as absent");
            return Ok(Authentication::Missing(AuthScheme::Basic));
        }
        Err(e) => return Err(e),
    };

    Ok(match single(rows) {
        Some(user) if verify_password(&user, &password) => Authentication::Authenticated(user),
        _ => {
            debug!(username = %username, "Basic credentials rejected");
            Authentication::Rejected
        }
    })
}

/// Verifies `Authorization: Bearer <jwt>` and re-reads the named user
pub async fn verify_bearer(
    store: &Store,
    headers: &HeaderMap,
    jwt: &JwtSettings,
) -> Result<Authentication, DepotError> {
    let Some(token) = authorization_value(headers, "Bearer") else {
        return Ok(Authentication::Missing(AuthScheme::Bearer));
    };

    let claims = match validate_token(token, jwt) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Bearer token rejected");
            return Ok(Authentication::Rejected);
        }
    };

    let rows = match store.retrying(|| users_named(store.pool(), &claims.sub)).await {
        Ok(rows) => rows,
        Err(e) if e.is_transient() => {
            warn!(error = %e, "User lookup failed after retries, treating token as absent");
            return Ok(Authentication::Missing(AuthScheme::Bearer));
        }
        Err(e) => return Err(e),
    };

    Ok(match single(rows) {
        Some(user) => Authentication::Authenticated(user),
        None => {
            debug!(username = %claims.sub, "Token subject does not resolve to one user");
            Authentication::Rejected
        }
    })
}

async fn users_named(pool: &PgPool, username: &str) -> Result<Vec<User>, DepotError> {
    let mut conn = pool.acquire().await?;
    Ok(User::select_by_username(&mut conn, username).await?)
}

fn single(mut rows: Vec<User>) -> Option<User> {
    if rows.len() == 1 {
        rows.pop()
    } else {
        None
    }
}
