/// Request extractors
///
/// - [`Selected`]: the store chosen by the `private` query flag
/// - [`Caller`]: the selected store plus bearer-token authentication
/// - [`Reader`]: like `Caller`, with the optional Basic fallback for reads
///
/// Credential extraction never fails on missing or bad credentials; it
/// records the outcome as an [`Authentication`] and leaves the decision to
/// the gates, so that absence is reported as 401 before any resource rule.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{request::Parts, Uri},
};
use depot_shared::auth::credentials::{verify_basic, verify_bearer, AuthScheme, Authentication};
use depot_shared::db::store::Store;
use serde::Deserialize;

use crate::{app::AppState, error::ApiError};

#[derive(Debug, Deserialize)]
struct StoreFlag {
    private: Option<String>,
}

/// True when the query string carries `private` set to `true`/`1`/`yes`/`on`
/// or with no value at all
pub fn wants_private(uri: &Uri) -> bool {
    match Query::<StoreFlag>::try_from_uri(uri) {
        Ok(Query(StoreFlag {
            private: Some(value),
        })) => matches!(
            value.to_ascii_lowercase().as_str(),
            "" | "true" | "1" | "yes" | "on"
        ),
        _ => false,
    }
}

/// The store a request operates on
pub struct Selected(pub Store);

#[async_trait]
impl FromRequestParts<AppState> for Selected {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Selected(state.store(wants_private(&parts.uri)).clone()))
    }
}

/// Store plus bearer authentication
pub struct Caller {
    pub store: Store,
    pub auth: Authentication,
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Selected(store) = Selected::from_request_parts(parts, state).await?;
        let auth = verify_bearer(&store, &parts.headers, &state.jwt).await?;
        Ok(Caller { store, auth })
    }
}

/// Store plus authentication for read endpoints
///
/// With `AUTH_BASIC_ON_READS` enabled, a request that sends no bearer token
/// may authenticate with Basic credentials instead.
pub struct Reader {
    pub store: Store,
    pub auth: Authentication,
}

#[async_trait]
impl FromRequestParts<AppState> for Reader {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Caller { store, auth } = Caller::from_request_parts(parts, state).await?;

        let auth = match auth {
            Authentication::Missing(AuthScheme::Bearer) if state.config.auth.basic_on_reads => {
                match verify_basic(&store, &parts.headers).await? {
                    Authentication::Missing(_) => Authentication::Missing(AuthScheme::Bearer),
                    other => other,
                }
            }
            other => other,
        };

        Ok(Reader { store, auth })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_private_flag_values() {
        assert!(wants_private(&uri("/projects/x?private")));
        assert!(wants_private(&uri("/projects/x?private=")));
        assert!(wants_private(&uri("/projects/x?private=true")));
        assert!(wants_private(&uri("/projects/x?private=1")));
        assert!(wants_private(&uri("/projects/x?limit=5&private=YES")));
        assert!(wants_private(&uri("/projects/x?private=on")));
    }

    #[test]
    fn test_private_flag_is_percent_decoded() {
        assert!(wants_private(&uri("/projects/x?private=%74rue")));
        assert!(wants_private(&uri("/projects/x?private=%31")));
        assert!(wants_private(&uri("/projects/x?%70rivate=on")));
        assert!(!wants_private(&uri("/projects/x?private=%66alse")));
    }

    #[test]
    fn test_public_by_default() {
        assert!(!wants_private(&uri("/projects/x")));
        assert!(!wants_private(&uri("/projects/x?private=false")));
        assert!(!wants_private(&uri("/projects/x?private=0")));
        assert!(!wants_private(&uri("/projects/x?privacy=true")));
    }
}
