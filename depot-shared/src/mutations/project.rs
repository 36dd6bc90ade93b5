/// Project mutators
///
/// - [`create_or_update_project`]: PUT/POST; inserts and makes the requester
///   Manager, or updates after a manager-or-admin check inside the transaction
/// - [`patch_project`]: membership changes plus scalar fields, all or nothing
/// - [`delete_project`]: idempotent cascade delete

use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use validator::Validate;

use super::membership::{assign_role, remove_user_from_project};
use super::{check_consistent, Upsert};
use crate::auth::authorization::allow_manager_or_admin;
use crate::auth::credentials::Authentication;
use crate::canonical::{parse_members_patch, MembersPatch};
use crate::db::query::{at_most_one, exactly_one};
use crate::db::store::Store;
use crate::error::DepotError;
use crate::models::project::{NewProject, Project, ProjectChanges, ProjectStatus, ProjectWithMembers};
use crate::models::role::{RoleKey, MANAGER_ROLE_ID};

/// Project request body
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProjectPayload {
    #[serde(rename = "projectCode")]
    #[validate(length(min = 1, max = 100))]
    pub project_code: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    pub description: Option<String>,

    pub status: Option<ProjectStatus>,

    /// Membership changes; only honoured by PATCH
    pub members: Option<Value>,
}

impl ProjectPayload {
    fn changes(&self) -> ProjectChanges {
        ProjectChanges {
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
        }
    }
}

/// Creates the project `project_code` or updates it in place
///
/// On insert the requesting user becomes the project's Manager. On update the
/// requester must be a manager of the project or an admin.
///
/// # Errors
///
/// - `inconsistent_projectCode` / `missing_name` / `invalid_<field>` (400)
///   before any store access
/// - `forbidden` (403) on the update branch
/// - `invalid_user` (400) if the requester's user row is gone
/// - `internal_server_error` (500) if the Manager role is not seeded
pub async fn create_or_update_project(
    store: &Store,
    project_code: &str,
    payload: &ProjectPayload,
    auth: &Authentication,
) -> Result<Upsert<ProjectWithMembers>, DepotError> {
    check_consistent("projectCode", project_code, payload.project_code.as_deref())?;
    payload.validate()?;
    if payload.name.is_none() {
        return Err(DepotError::missing("name"));
    }

    store
        .retrying(|| create_or_update_project_once(store, project_code, payload, auth))
        .await
}

async fn create_or_update_project_once(
    store: &Store,
    project_code: &str,
    payload: &ProjectPayload,
    auth: &Authentication,
) -> Result<Upsert<ProjectWithMembers>, DepotError> {
    let mut tx = store.begin().await?;

    let existing = at_most_one(Project::lock_by_code(&mut tx, project_code).await?, "project")?;

    let outcome = match existing {
        None => {
            let requester = auth.clone().into_user()?;
            let project = Project::insert(
                &mut tx,
                &NewProject {
                    code: project_code.to_string(),
                    name: payload.name.clone().unwrap_or_default(),
                    description: payload.description.clone().unwrap_or_default(),
                    status: payload.status.unwrap_or_default(),
                },
            )
            .await?;

            assign_role(&mut tx, &project, &requester.username, &RoleKey::Id(MANAGER_ROLE_ID))
                .await
                .map_err(|e| match e {
                    DepotError::Unknown(key) if key == "role" => {
                        DepotError::Internal("Manager role is not configured".to_string())
                    }
                    DepotError::Unknown(key) if key == "user" => DepotError::invalid("user", None),
                    other => other,
                })?;

            info!(project = %project.code, manager = %requester.username, "Created project");
            Upsert::Created(project)
        }
        Some(project) => {
            allow_manager_or_admin(&mut tx, project_code, auth)
                .await?
                .into_result()?;

            let project = Project::update(&mut tx, project.id, &payload.changes()).await?;

            info!(project = %project.code, "Updated project");
            Upsert::Updated(project)
        }
    };

    let outcome = match outcome {
        Upsert::Created(project) => Upsert::Created(project.with_members(&mut tx).await?),
        Upsert::Updated(project) => Upsert::Updated(project.with_members(&mut tx).await?),
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Applies membership changes and scalar fields to an existing project
///
/// `members` resolves to exactly one of an add-list, a remove-list or a
/// single `removeUser`. Changes apply in order; the first failure aborts the
/// transaction and is returned unchanged, so nothing (scalar fields
/// included) is committed.
///
/// # Errors
///
/// - `inconsistent_projectCode` / `invalid_membership` / `invalid_<field>`
///   (400) before any store access
/// - `unknown_project` (404)
/// - any error of [`assign_role`] / [`remove_user_from_project`]
pub async fn patch_project(
    store: &Store,
    project_code: &str,
    payload: &ProjectPayload,
) -> Result<ProjectWithMembers, DepotError> {
    check_consistent("projectCode", project_code, payload.project_code.as_deref())?;
    payload.validate()?;

    let members = payload
        .members
        .as_ref()
        .map(parse_members_patch)
        .transpose()?;

    store
        .retrying(|| patch_project_once(store, project_code, payload, members.as_ref()))
        .await
}

async fn patch_project_once(
    store: &Store,
    project_code: &str,
    payload: &ProjectPayload,
    members: Option<&MembersPatch>,
) -> Result<ProjectWithMembers, DepotError> {
    let mut tx = store.begin().await?;

    let project = exactly_one(Project::lock_by_code(&mut tx, project_code).await?, "project")?;

    match members {
        Some(MembersPatch::Add(specs)) => {
            for spec in specs {
                assign_role(&mut tx, &project, &spec.user, &spec.role).await?;
            }
        }
        Some(MembersPatch::Remove(specs)) => {
            for spec in specs {
                remove_user_from_project(&mut tx, &project, &spec.user).await?;
            }
        }
        Some(MembersPatch::RemoveUser(username)) => {
            remove_user_from_project(&mut tx, &project, username).await?;
        }
        None => {}
    }

    let project = Project::update(&mut tx, project.id, &payload.changes()).await?;
    let project = project.with_members(&mut tx).await?;

    tx.commit().await?;

    info!(project = %project_code, "Patched project");
    Ok(project)
}

/// Deletes the project and its memberships; a missing project is a no-op
pub async fn delete_project(store: &Store, project_code: &str) -> Result<(), DepotError> {
    store
        .retrying(|| delete_project_once(store, project_code))
        .await
}

async fn delete_project_once(store: &Store, project_code: &str) -> Result<(), DepotError> {
    let mut tx = store.begin().await?;

    if let Some(project) = at_most_one(Project::lock_by_code(&mut tx, project_code).await?, "project")? {
        Project::delete_cascade(&mut tx, project.id).await?;
        info!(project = %project_code, "Deleted project");
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_deserializes_project_code() {
        let payload: ProjectPayload = serde_json::from_value(json!({
            "projectCode": "demo",
            "name": "Demo",
            "status": "closed",
            "members": {"add": ["alice"]}
        }))
        .unwrap();

        assert_eq!(payload.project_code.as_deref(), Some("demo"));
        assert_eq!(payload.status, Some(ProjectStatus::Closed));
        assert!(payload.members.is_some());
    }

    #[test]
    fn test_payload_validation() {
        let payload = ProjectPayload {
            name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(DepotError::from(payload.validate().unwrap_err()).code(), "invalid_name");

        let payload = ProjectPayload {
            project_code: Some("x".repeat(101)),
            name: Some("ok".into()),
            ..Default::default()
        };
        assert!(DepotError::from(payload.validate().unwrap_err())
            .code()
            .starts_with("invalid_"));
    }

    #[test]
    fn test_changes_only_carry_present_fields() {
        let payload = ProjectPayload {
            description: Some("new".into()),
            ..Default::default()
        };
        let changes = payload.changes();
        assert_eq!(changes.description.as_deref(), Some("new"));
        assert!(changes.name.is_none());
        assert!(changes.status.is_none());
    }
}
