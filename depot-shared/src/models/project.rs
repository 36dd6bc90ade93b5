/// Project model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM ('active', 'closed', 'archived');
///
/// CREATE TABLE projects (
///     id SERIAL PRIMARY KEY,
///     identifier VARCHAR(100) NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status project_status NOT NULL DEFAULT 'active',
///     created_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The `identifier` column is exposed to clients as `projectCode`; the
/// numeric `id` stays internal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::models::membership::ProjectMember;

const SELECT_PROJECT: &str = r#"
    SELECT id, identifier AS code, name, description, status, created_on, updated_on
    FROM projects
"#;

/// Project lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Closed,
    Archived,
}

/// A project row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    #[serde(skip)]
    pub id: i32,

    #[serde(rename = "projectCode")]
    pub code: String,

    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// A project together with its members and their roles
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithMembers {
    #[serde(flatten)]
    pub project: Project,

    pub members: Vec<ProjectMember>,
}

/// Columns for a new project row
#[derive(Debug, Clone)]
pub struct NewProject {
    pub code: String,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
}

/// Column changes for an existing project; `None` leaves the column alone
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

impl Project {
    pub async fn select_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Vec<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!("{} WHERE identifier = $1", SELECT_PROJECT))
            .bind(code)
            .fetch_all(conn)
            .await
    }

    /// Row-locking variant of [`Project::select_by_code`]
    pub async fn lock_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Vec<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "{} WHERE identifier = $1 FOR UPDATE",
            SELECT_PROJECT
        ))
        .bind(code)
        .fetch_all(conn)
        .await
    }

    /// Projects ordered by code
    pub async fn list(
        conn: &mut PgConnection,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "{} ORDER BY identifier LIMIT $1 OFFSET $2",
            SELECT_PROJECT
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await
    }

    pub async fn insert(conn: &mut PgConnection, data: &NewProject) -> Result<Project, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (identifier, name, description, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, identifier AS code, name, description, status, created_on, updated_on
            "#,
        )
        .bind(&data.code)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.status)
        .fetch_one(conn)
        .await
    }

    /// Applies `changes` and returns the updated row
    pub async fn update(
        conn: &mut PgConnection,
        id: i32,
        changes: &ProjectChanges,
    ) -> Result<Project, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE projects SET updated_on = NOW()");

        if let Some(name) = &changes.name {
            builder.push(", name = ").push_bind(name.clone());
        }
        if let Some(description) = &changes.description {
            builder.push(", description = ").push_bind(description.clone());
        }
        if let Some(status) = changes.status {
            builder.push(", status = ").push_bind(status);
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder.push(
            " RETURNING id, identifier AS code, name, description, status, created_on, updated_on",
        );

        builder.build_query_as::<Project>().fetch_one(conn).await
    }

    /// Deletes the project after its member roles and memberships
    pub async fn delete_cascade(conn: &mut PgConnection, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM member_roles WHERE member_id IN (SELECT id FROM members WHERE project_id = $1)",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM members WHERE project_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Loads the member list for this project
    pub async fn with_members(self, conn: &mut PgConnection) -> Result<ProjectWithMembers, sqlx::Error> {
        let members = ProjectMember::for_project(conn, self.id).await?;
        Ok(ProjectWithMembers {
            project: self,
            members,
        })
    }
}
