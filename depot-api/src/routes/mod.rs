/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Basic login issuing JWTs
/// - `projects`: project CRUD
/// - `members`: single memberships of a project
/// - `users`: user CRUD and per-user project listings

pub mod auth;
pub mod health;
pub mod members;
pub mod projects;
pub mod users;

use depot_shared::auth::authorization::{
    allow_manager_or_admin, allow_same_user_or_project_manager_or_admin,
};
use depot_shared::auth::credentials::Authentication;
use depot_shared::db::store::Store;

use crate::error::ApiResult;

/// Gates that read the store run on a pooled connection under the retry policy
pub(crate) async fn require_manager_or_admin(
    store: &Store,
    project_code: &str,
    auth: &Authentication,
) -> ApiResult<()> {
    let decision = store
        .retrying(|| async move {
            let mut conn = store.pool().acquire().await?;
            allow_manager_or_admin(&mut conn, project_code, auth).await
        })
        .await?;

    Ok(decision.into_result()?)
}

pub(crate) async fn require_same_user_or_project_manager_or_admin(
    store: &Store,
    username: &str,
    project_code: Option<&str>,
    auth: &Authentication,
) -> ApiResult<()> {
    let decision = store
        .retrying(|| async move {
            let mut conn = store.pool().acquire().await?;
            allow_same_user_or_project_manager_or_admin(&mut conn, username, project_code, auth)
                .await
        })
        .await?;

    Ok(decision.into_result()?)
}
