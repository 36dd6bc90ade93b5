/// Login endpoint
///
/// Exchanges HTTP Basic credentials for a signed JWT.
///
/// # Endpoint
///
/// ```text
/// GET /login
/// Authorization: Basic base64(username:password)
/// ```
///
/// # Response
///
/// ```json
/// {
///   "access_token": "eyJ...",
///   "token_type": "JWT",
///   "expires_in": 604800
/// }
/// ```
///
/// # Errors
///
/// - `401 basic_auth_required`: no Basic credentials
/// - `403 forbidden`: wrong username or password

use crate::{app::AppState, error::ApiResult, extract::Selected};
use axum::{extract::State, http::HeaderMap, Json};
use depot_shared::auth::{
    credentials::verify_basic,
    jwt::{create_token, Claims},
};
use serde::{Deserialize, Serialize};

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,

    /// Always `JWT`
    pub token_type: String,

    /// Seconds until the token expires
    pub expires_in: i64,
}

pub async fn login(
    State(state): State<AppState>,
    Selected(store): Selected,
    headers: HeaderMap,
) -> ApiResult<Json<LoginResponse>> {
    let user = verify_basic(&store, &headers).await?.into_user()?;

    let claims = Claims::new(&user.username, &state.jwt);
    let access_token = create_token(&claims, &state.jwt.secret)?;

    tracing::info!(username = %user.username, store = %store.kind(), "Issued access token");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "JWT".to_string(),
        expires_in: claims.expires_in(),
    }))
}
