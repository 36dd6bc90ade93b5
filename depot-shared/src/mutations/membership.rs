/// Membership primitives
///
/// [`assign_role`] and [`remove_user_from_project`] operate on a connection
/// that is already inside a transaction holding the project's row lock; the
/// project mutators call them once per requested change. [`add_member`] and
/// [`remove_member`] wrap a single change in a transaction of their own.

use sqlx::PgConnection;
use tracing::info;

use crate::db::query::{at_most_one, exactly_one};
use crate::db::store::Store;
use crate::error::DepotError;
use crate::models::membership::{MemberRole, Membership};
use crate::models::project::Project;
use crate::models::role::{Role, RoleKey};
use crate::models::user::User;

/// Gives `username` the role `role_key` in `project`
///
/// Inserts the membership if missing and the member role if missing;
/// otherwise repoints the existing member role row. A membership never gains
/// a second role row.
///
/// # Errors
///
/// - `unknown_role` (404) / `duplicate_role` (500)
/// - `unknown_user` (404) / `duplicate_user` (500)
/// - `duplicate_membership` / `duplicate_member_role` (500)
pub async fn assign_role(
    conn: &mut PgConnection,
    project: &Project,
    username: &str,
    role_key: &RoleKey,
) -> Result<(), DepotError> {
    let role = exactly_one(Role::select_by_key(conn, role_key).await?, "role")?;
    let user = exactly_one(User::select_by_username(conn, username).await?, "user")?;

    let existing = at_most_one(Membership::lock_for(conn, project.id, user.id).await?, "membership")?;
    let membership = match existing {
        Some(membership) => membership,
        None => Membership::insert(conn, project.id, user.id).await?,
    };

    match at_most_one(MemberRole::lock_for_member(conn, membership.id).await?, "member_role")? {
        Some(member_role) if member_role.role_id == role.id => {}
        Some(member_role) => MemberRole::set_role(conn, member_role.id, role.id).await?,
        None => {
            MemberRole::insert(conn, membership.id, role.id).await?;
        }
    }

    info!(
        project = %project.code,
        username = %username,
        role = %role.name,
        "Assigned project role"
    );

    Ok(())
}

/// Removes `username` from `project`; a non-member is a no-op
///
/// # Errors
///
/// `duplicate_membership` (500) if more than one membership matches.
pub async fn remove_user_from_project(
    conn: &mut PgConnection,
    project: &Project,
    username: &str,
) -> Result<(), DepotError> {
    let rows = Membership::lock_by_username(conn, project.id, username).await?;

    if let Some(membership) = at_most_one(rows, "membership")? {
        Membership::delete_with_roles(conn, membership.id).await?;
        info!(project = %project.code, username = %username, "Removed project member");
    }

    Ok(())
}

/// Transactional [`assign_role`] on the project named `project_code`
pub async fn add_member(
    store: &Store,
    project_code: &str,
    username: &str,
    role_key: &RoleKey,
) -> Result<(), DepotError> {
    store
        .retrying(|| add_member_once(store, project_code, username, role_key))
        .await
}

async fn add_member_once(
    store: &Store,
    project_code: &str,
    username: &str,
    role_key: &RoleKey,
) -> Result<(), DepotError> {
    let mut tx = store.begin().await?;

    let project = exactly_one(Project::lock_by_code(&mut tx, project_code).await?, "project")?;
    assign_role(&mut tx, &project, username, role_key).await?;

    tx.commit().await?;
    Ok(())
}

/// Transactional [`remove_user_from_project`] on the project named `project_code`
pub async fn remove_member(
    store: &Store,
    project_code: &str,
    username: &str,
) -> Result<(), DepotError> {
    store
        .retrying(|| remove_member_once(store, project_code, username))
        .await
}

async fn remove_member_once(
    store: &Store,
    project_code: &str,
    username: &str,
) -> Result<(), DepotError> {
    let mut tx = store.begin().await?;

    let project = exactly_one(Project::lock_by_code(&mut tx, project_code).await?, "project")?;
    remove_user_from_project(&mut tx, &project, username).await?;

    tx.commit().await?;
    Ok(())
}
