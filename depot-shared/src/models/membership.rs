/// Membership model and database operations
///
/// A membership links one user to one project. The role travels in a
/// separate `member_roles` row so the schema could carry several roles per
/// membership, but the application keeps exactly one.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE members (
///     id SERIAL PRIMARY KEY,
///     user_id INTEGER NOT NULL REFERENCES users(id),
///     project_id INTEGER NOT NULL REFERENCES projects(id),
///     created_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, project_id)
/// );
///
/// CREATE TABLE member_roles (
///     id SERIAL PRIMARY KEY,
///     member_id INTEGER NOT NULL REFERENCES members(id),
///     role_id INTEGER NOT NULL REFERENCES roles(id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use depot_shared::models::membership::UserProject;
/// use depot_shared::models::role::RoleKey;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut conn = pool.acquire().await?;
/// let managed = UserProject::for_user(&mut conn, "alice", Some(&RoleKey::parse("Manager"))).await?;
/// for project in managed {
///     println!("{} ({})", project.project_code, project.role);
/// }
/// # Ok(())
/// # }
/// ```

use serde::Serialize;
use sqlx::PgConnection;

use crate::models::role::{Role, RoleKey};

/// A row of `members`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Membership {
    pub id: i32,
    pub user_id: i32,
    pub project_id: i32,
}

/// A row of `member_roles`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MemberRole {
    pub id: i32,
    pub member_id: i32,
    pub role_id: i32,
}

/// The public face of a member inside a project body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MemberUser {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
}

/// One entry of a project's member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProjectMember {
    #[sqlx(flatten)]
    pub user: MemberUser,

    #[sqlx(flatten)]
    pub role: Role,
}

/// A single (project, user) membership as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MembershipDetail {
    #[serde(rename = "projectCode")]
    pub project_code: String,

    pub username: String,

    #[sqlx(flatten)]
    pub role: Role,
}

/// A project the user belongs to, with the user's role name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserProject {
    #[serde(rename = "projectCode")]
    pub project_code: String,

    pub name: String,
    pub role: String,
}

impl Membership {
    /// Memberships of `user_id` in `project_id`, row-locked
    pub async fn lock_for(
        conn: &mut PgConnection,
        project_id: i32,
        user_id: i32,
    ) -> Result<Vec<Membership>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, user_id, project_id
            FROM members
            WHERE project_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_all(conn)
        .await
    }

    /// Memberships of the user named `username` in `project_id`, row-locked
    pub async fn lock_by_username(
        conn: &mut PgConnection,
        project_id: i32,
        username: &str,
    ) -> Result<Vec<Membership>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT m.id, m.user_id, m.project_id
            FROM members m
            JOIN users u ON u.id = m.user_id
            WHERE m.project_id = $1 AND u.username = $2
            FOR UPDATE OF m
            "#,
        )
        .bind(project_id)
        .bind(username)
        .fetch_all(conn)
        .await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        project_id: i32,
        user_id: i32,
    ) -> Result<Membership, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO members (project_id, user_id)
            VALUES ($1, $2)
            RETURNING id, user_id, project_id
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(conn)
        .await
    }

    /// Deletes the membership's role rows, then the membership
    pub async fn delete_with_roles(conn: &mut PgConnection, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM member_roles WHERE member_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

impl MemberRole {
    pub async fn lock_for_member(
        conn: &mut PgConnection,
        member_id: i32,
    ) -> Result<Vec<MemberRole>, sqlx::Error> {
        sqlx::query_as::<_, MemberRole>(
            "SELECT id, member_id, role_id FROM member_roles WHERE member_id = $1 FOR UPDATE",
        )
        .bind(member_id)
        .fetch_all(conn)
        .await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        member_id: i32,
        role_id: i32,
    ) -> Result<MemberRole, sqlx::Error> {
        sqlx::query_as::<_, MemberRole>(
            r#"
            INSERT INTO member_roles (member_id, role_id)
            VALUES ($1, $2)
            RETURNING id, member_id, role_id
            "#,
        )
        .bind(member_id)
        .bind(role_id)
        .fetch_one(conn)
        .await
    }

    /// Points an existing member role row at `role_id`
    pub async fn set_role(conn: &mut PgConnection, id: i32, role_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE member_roles SET role_id = $2 WHERE id = $1")
            .bind(id)
            .bind(role_id)
            .execute(conn)
            .await?;

        Ok(())
    }
}

impl ProjectMember {
    /// Members of `project_id` ordered by username
    pub async fn for_project(
        conn: &mut PgConnection,
        project_id: i32,
    ) -> Result<Vec<ProjectMember>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT u.username, u.firstname, u.lastname, r.id, r.name
            FROM members m
            JOIN users u ON u.id = m.user_id
            JOIN member_roles mr ON mr.member_id = m.id
            JOIN roles r ON r.id = mr.role_id
            WHERE m.project_id = $1
            ORDER BY u.username
            "#,
        )
        .bind(project_id)
        .fetch_all(conn)
        .await
    }
}

impl MembershipDetail {
    pub async fn select(
        conn: &mut PgConnection,
        project_code: &str,
        username: &str,
    ) -> Result<Vec<MembershipDetail>, sqlx::Error> {
        sqlx::query_as::<_, MembershipDetail>(
            r#"
            SELECT p.identifier AS project_code, u.username, r.id, r.name
            FROM members m
            JOIN projects p ON p.id = m.project_id
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

impl UserProject {
    /// Projects `username` belongs to, optionally only those where they hold `role`
    pub async fn for_user(
        conn: &mut PgConnection,
        username: &str,
        role: Option<&RoleKey>,
    ) -> Result<Vec<UserProject>, sqlx::Error> {
        let (role_id, role_name) = match role {
            Some(RoleKey::Id(id)) => (Some(*id), None),
            Some(RoleKey::Name(name)) => (None, Some(name.as_str())),
            None => (None, None),
        };

        sqlx::query_as::<_, UserProject>(
            r#"
            SELECT p.identifier AS project_code, p.name, r.name AS role
            FROM members m
            JOIN projects p ON p.id = m.project_id
            JOIN users u ON u.id = m.user_id
            JOIN member_roles mr ON mr.member_id = m.id
            JOIN roles r ON r.id = mr.role_id
            WHERE u.username = $1
              AND ($2::INTEGER IS NULL OR r.id = $2)
              AND ($3::TEXT IS NULL OR r.name = $3)
            ORDER BY p.identifier
            "#,
        )
        .bind(username)
        .bind(role_id)
        .bind(role_name)
        .fetch_all(conn)
        .await
    }
}
