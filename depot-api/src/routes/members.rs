/// Single-membership endpoints
///
/// - `GET    /projects/:code/user/:username` - the member's role
/// - `POST   /projects/:code/user/:username` - add or reassign (manager or admin)
/// - `DELETE /projects/:code/user/:username` - remove; a non-member is still 204
///
/// GET and DELETE admit the user themselves, managers of the project and
/// admins.
///
/// The role for POST comes from the body's `role` (name, id, or
/// `{id, name}` object) or the `role` query parameter, defaulting to
/// Contributor.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use depot_shared::canonical::canonicalize_record;
use depot_shared::models::membership::MembershipDetail;
use depot_shared::models::role::RoleKey;
use depot_shared::mutations::membership as mutate;
use depot_shared::queries;
use serde_json::{json, Value};

use super::{require_manager_or_admin, require_same_user_or_project_manager_or_admin};
use crate::error::ApiResult;
use crate::extract::Caller;

/// Role requested for `username`, body first, then query
pub fn requested_role(
    username: &str,
    body: Option<&Value>,
    query: &HashMap<String, String>,
) -> ApiResult<RoleKey> {
    if let Some(role) = body.and_then(|body| body.get("role")) {
        let spec = canonicalize_record(&json!({ "user": username, "role": role }))?;
        return Ok(spec.role);
    }

    Ok(query
        .get("role")
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| RoleKey::parse(raw))
        .unwrap_or_default())
}

pub async fn get_member(
    Caller { store, auth }: Caller,
    Path((code, username)): Path<(String, String)>,
) -> ApiResult<Json<MembershipDetail>> {
    require_same_user_or_project_manager_or_admin(&store, &username, Some(&code), &auth).await?;
    Ok(Json(queries::get_membership(&store, &code, &username).await?))
}

pub async fn add_member(
    Caller { store, auth }: Caller,
    Path((code, username)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> ApiResult<StatusCode> {
    require_manager_or_admin(&store, &code, &auth).await?;

    let role = requested_role(&username, body.as_ref().map(|Json(body)| body), &query)?;
    mutate::add_member(&store, &code, &username, &role).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_member(
    Caller { store, auth }: Caller,
    Path((code, username)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    require_same_user_or_project_manager_or_admin(&store, &username, Some(&code), &auth).await?;
    mutate::remove_member(&store, &code, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}
