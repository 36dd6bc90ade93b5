/// Role reference data
///
/// Roles are a fixed set seeded by the memberships migration:
///
/// | id | name |
/// |---|---|
/// | 3 | Manager |
/// | 4 | Contributor |
/// | 6 | TechSupport |
///
/// Clients may refer to a role by id or by name; [`RoleKey`] carries either.
///
/// # Example
///
/// ```
/// use depot_shared::models::role::{RoleKey, CONTRIBUTOR_ROLE_ID};
///
/// assert_eq!(RoleKey::parse("4"), RoleKey::Id(CONTRIBUTOR_ROLE_ID));
/// assert_eq!(RoleKey::parse("Manager"), RoleKey::Name("Manager".to_string()));
/// ```

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

pub const MANAGER_ROLE_ID: i32 = 3;
pub const CONTRIBUTOR_ROLE_ID: i32 = 4;
pub const TECH_SUPPORT_ROLE_ID: i32 = 6;

/// Role assigned when a membership request names none
pub const DEFAULT_ROLE_ID: i32 = CONTRIBUTOR_ROLE_ID;

/// A row of the `roles` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i32,
    pub name: String,
}

/// Reference to a role by id or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleKey {
    Id(i32),
    Name(String),
}

impl RoleKey {
    /// Numeric strings are ids, anything else is a name
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i32>() {
            Ok(id) => RoleKey::Id(id),
            Err(_) => RoleKey::Name(raw.to_string()),
        }
    }
}

impl Default for RoleKey {
    fn default() -> Self {
        RoleKey::Id(DEFAULT_ROLE_ID)
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleKey::Id(id) => write!(f, "{}", id),
            RoleKey::Name(name) => write!(f, "{}", name),
        }
    }
}

impl Role {
    /// True for the Manager role
    pub fn is_manager(&self) -> bool {
        self.id == MANAGER_ROLE_ID
    }

    /// True for Manager or TechSupport
    pub fn has_manager_rights(&self) -> bool {
        self.id == MANAGER_ROLE_ID || self.id == TECH_SUPPORT_ROLE_ID
    }

    /// All roles matching `key`
    ///
    /// Callers enforce the result shape with `exactly_one(rows, "role")`.
    pub async fn select_by_key(
        conn: &mut PgConnection,
        key: &RoleKey,
    ) -> Result<Vec<Role>, sqlx::Error> {
        match key {
            RoleKey::Id(id) => {
                sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
                    .bind(id)
                    .fetch_all(conn)
                    .await
            }
            RoleKey::Name(name) => {
                sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
                    .bind(name)
                    .fetch_all(conn)
                    .await
            }
        }
    }

    /// Roles held by `username` in the project `project_code`
    ///
    /// Zero rows when the project does not exist or the user is not a member.
    /// More than one row means the (user, project) uniqueness invariant is
    /// broken.
    pub async fn in_project(
        conn: &mut PgConnection,
        project_code: &str,
        username: &str,
    ) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.name
            FROM projects p
            JOIN members m ON m.project_id = p.id
            JOIN users u ON u.id = m.user_id
            JOIN member_roles mr ON mr.member_id = m.id
            JOIN roles r ON r.id = mr.role_id
            WHERE p.identifier = $1 AND u.username = $2
            "#,
        )
        .bind(project_code)
        .bind(username)
        .fetch_all(conn)
        .await
    }
}
