/// Transactional mutators
///
/// Every public mutator follows the same shape:
///
/// 1. validate the payload (400s happen here, before any store access)
/// 2. under the store's retry policy, open a SERIALIZABLE transaction
/// 3. lock-select the target row (`FOR UPDATE`)
/// 4. branch on presence, doing every dependent write on the same transaction
/// 5. commit only after the whole sequence succeeded
///
/// Any error drops the transaction, which rolls it back. A serialization
/// failure or deadlock between competing requests is transient, so the
/// losing request is replayed from step 2 and sees the winner's commit.
///
/// # Modules
///
/// - `project`: create/update, patch (including membership changes), delete
/// - `membership`: `assign_role` / `remove_user_from_project` primitives and
///   their single-membership wrappers
/// - `user`: create/update, registration, patch, delete
///
/// # Example
///
/// ```no_run
/// use depot_shared::auth::credentials::Authentication;
/// use depot_shared::db::store::Store;
/// use depot_shared::mutations::project::{create_or_update_project, ProjectPayload};
/// use depot_shared::mutations::Upsert;
///
/// # async fn example(store: &Store, auth: Authentication) -> Result<(), depot_shared::error::DepotError> {
/// let payload = ProjectPayload {
///     name: Some("Demo".to_string()),
///     ..Default::default()
/// };
///
/// match create_or_update_project(store, "demo", &payload, &auth).await? {
///     Upsert::Created(project) => println!("created {}", project.project.code),
///     Upsert::Updated(project) => println!("updated {}", project.project.code),
/// }
/// # Ok(())
/// # }
/// ```

pub mod membership;
pub mod project;
pub mod user;

use crate::error::DepotError;

/// Outcome of a create-or-update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert<T> {
    /// The row did not exist and was inserted (201)
    Created(T),

    /// The row existed and was updated (200)
    Updated(T),
}

impl<T> Upsert<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Upsert::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Upsert::Created(value) | Upsert::Updated(value) => value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Upsert<U> {
        match self {
            Upsert::Created(value) => Upsert::Created(f(value)),
            Upsert::Updated(value) => Upsert::Updated(f(value)),
        }
    }
}

/// Rejects a body identifier that disagrees with the path
pub(crate) fn check_consistent(
    param: &str,
    path_value: &str,
    body_value: Option<&str>,
) -> Result<(), DepotError> {
    match body_value {
        Some(body_value) if body_value != path_value => Err(DepotError::inconsistent(param)),
        _ => Ok(()),
    }
}
