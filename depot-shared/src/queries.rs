/// Read operations
///
/// Plain reads on a pooled connection, no transaction and no locks. They may
/// observe a state another request is about to change. Each read runs under
/// the store's retry policy.
///
/// # Example
///
/// ```no_run
/// use depot_shared::db::store::Store;
/// use depot_shared::queries::{get_project_with_members, project_exists};
///
/// # async fn example(store: &Store) -> Result<(), depot_shared::error::DepotError> {
/// if project_exists(store, "demo").await? {
///     let project = get_project_with_members(store, "demo").await?;
///     println!("{} has {} members", project.project.name, project.members.len());
/// }
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;

use crate::db::query::{at_most_one, exactly_one};
use crate::db::store::Store;
use crate::error::DepotError;
use crate::models::membership::{MembershipDetail, UserProject};
use crate::models::project::{Project, ProjectWithMembers};
use crate::models::role::RoleKey;
use crate::models::user::User;

/// Upper bound on `limit` for listings
pub const MAX_PAGE_SIZE: i64 = 1000;

/// `unknown_project` (404) when absent
pub async fn get_project_with_members(
    store: &Store,
    project_code: &str,
) -> Result<ProjectWithMembers, DepotError> {
    store
        .retrying(|| project_with_members(store.pool(), project_code))
        .await
}

async fn project_with_members(
    pool: &PgPool,
    project_code: &str,
) -> Result<ProjectWithMembers, DepotError> {
    let mut conn = pool.acquire().await?;
    let project = exactly_one(Project::select_by_code(&mut conn, project_code).await?, "project")?;
    Ok(project.with_members(&mut conn).await?)
}

pub async fn project_exists(store: &Store, project_code: &str) -> Result<bool, DepotError> {
    store
        .retrying(|| async move {
            let mut conn = store.pool().acquire().await?;
            let rows = Project::select_by_code(&mut conn, project_code).await?;
            Ok(at_most_one(rows, "project")?.is_some())
        })
        .await
}

/// Projects ordered by code; `limit` is clamped to `1..=MAX_PAGE_SIZE`
pub async fn list_projects(
    store: &Store,
    limit: i64,
    offset: i64,
) -> Result<Vec<Project>, DepotError> {
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let offset = offset.max(0);

    store
        .retrying(|| async move {
            let mut conn = store.pool().acquire().await?;
            Ok(Project::list(&mut conn, limit, offset).await?)
        })
        .await
}

/// `unknown_user` (404) when absent
pub async fn get_user(store: &Store, username: &str) -> Result<User, DepotError> {
    store
        .retrying(|| async move {
            let mut conn = store.pool().acquire().await?;
            exactly_one(User::select_by_username(&mut conn, username).await?, "user")
        })
        .await
}

pub async fn user_is_admin(store: &Store, username: &str) -> Result<bool, DepotError> {
    Ok(get_user(store, username).await?.admin)
}

/// Projects `username` belongs to, optionally filtered by role
pub async fn list_user_projects(
    store: &Store,
    username: &str,
    role: Option<&RoleKey>,
) -> Result<Vec<UserProject>, DepotError> {
    store
        .retrying(|| async move {
            let mut conn = store.pool().acquire().await?;
            Ok(UserProject::for_user(&mut conn, username, role).await?)
        })
        .await
}

/// `unknown_membership` (404) when the user is not in the project
pub async fn get_membership(
    store: &Store,
    project_code: &str,
    username: &str,
) -> Result<MembershipDetail, DepotError> {
    store
        .retrying(|| async move {
            let mut conn = store.pool().acquire().await?;
            let rows = MembershipDetail::select(&mut conn, project_code, username).await?;
            exactly_one(rows, "membership")
        })
        .await
}
