/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id SERIAL PRIMARY KEY,
///     username VARCHAR(255) NOT NULL UNIQUE,
///     hashed_password VARCHAR(255) NOT NULL DEFAULT '',
///     salt VARCHAR(64) NOT NULL DEFAULT '',
///     firstname VARCHAR(255) NOT NULL DEFAULT '',
///     lastname VARCHAR(255) NOT NULL DEFAULT '',
///     language VARCHAR(16) NOT NULL DEFAULT '',
///     admin BOOLEAN NOT NULL DEFAULT FALSE,
///     created_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The user's default e-mail address lives in `email_addresses` and is
/// surfaced as `mail`.
///
/// Lookups return every matching row; callers decide whether zero or many is
/// an error (see `db::query::exactly_one`). The `lock_*` variants take a
/// `FOR UPDATE` row lock and must run inside a transaction.
///
/// # Example
///
/// ```no_run
/// use depot_shared::db::query::exactly_one;
/// use depot_shared::models::user::User;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), depot_shared::error::DepotError> {
/// let mut conn = pool.acquire().await?;
/// let user = exactly_one(User::select_by_username(&mut conn, "alice").await?, "user")?;
/// println!("{} admin={}", user.username, user.admin);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::auth::password::StoredPassword;

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.hashed_password, u.salt,
           u.firstname, u.lastname, u.language, u.admin,
           (SELECT e.address FROM email_addresses e
            WHERE e.user_id = u.id AND e.is_default
            ORDER BY e.id LIMIT 1) AS mail,
           u.created_on, u.updated_on
    FROM users u
"#;

/// A user account
///
/// Credential columns are never serialized.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    #[serde(skip)]
    pub id: i32,

    pub username: String,

    #[serde(skip)]
    pub hashed_password: String,

    #[serde(skip)]
    pub salt: String,

    pub firstname: String,
    pub lastname: String,
    pub language: String,

    /// Global authorization bypass
    pub admin: bool,

    /// Default e-mail address
    pub mail: Option<String>,

    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Columns for a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: StoredPassword,
    pub firstname: String,
    pub lastname: String,
    pub language: String,
    pub admin: bool,
}

/// Column changes for an existing user; `None` leaves the column alone
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub password: Option<StoredPassword>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub language: Option<String>,
    pub admin: Option<bool>,
}

impl User {
    /// Users named `username` (zero or one under a healthy schema)
    pub async fn select_by_username(
        conn: &mut PgConnection,
        username: &str,
    ) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("{} WHERE u.username = $1", SELECT_USER))
            .bind(username)
            .fetch_all(conn)
            .await
    }

    /// Same as [`User::select_by_username`] but row-locks the result
    pub async fn lock_by_username(
        conn: &mut PgConnection,
        username: &str,
    ) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "{} WHERE u.username = $1 FOR UPDATE OF u",
            SELECT_USER
        ))
        .bind(username)
        .fetch_all(conn)
        .await
    }

    pub async fn select_by_id(conn: &mut PgConnection, id: i32) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("{} WHERE u.id = $1", SELECT_USER))
            .bind(id)
            .fetch_all(conn)
            .await
    }

    /// Inserts a user row and returns its id
    ///
    /// # Errors
    ///
    /// Returns a unique-violation database error if the username is taken.
    pub async fn insert(conn: &mut PgConnection, data: &NewUser) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO users (username, hashed_password, salt, firstname, lastname, language, admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&data.username)
        .bind(&data.password.hashed_password)
        .bind(&data.password.salt)
        .bind(&data.firstname)
        .bind(&data.lastname)
        .bind(&data.language)
        .bind(data.admin)
        .fetch_one(conn)
        .await
    }

    /// Applies `changes` to the user row `id`
    ///
    /// `updated_on` is bumped even when `changes` is empty.
    pub async fn update(
        conn: &mut PgConnection,
        id: i32,
        changes: &UserChanges,
    ) -> Result<(), sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE users SET updated_on = NOW()");

        if let Some(username) = &changes.username {
            builder.push(", username = ").push_bind(username.clone());
        }
        if let Some(password) = &changes.password {
            builder
                .push(", hashed_password = ")
                .push_bind(password.hashed_password.clone())
                .push(", salt = ")
                .push_bind(password.salt.clone());
        }
        if let Some(firstname) = &changes.firstname {
            builder.push(", firstname = ").push_bind(firstname.clone());
        }
        if let Some(lastname) = &changes.lastname {
            builder.push(", lastname = ").push_bind(lastname.clone());
        }
        if let Some(language) = &changes.language {
            builder.push(", language = ").push_bind(language.clone());
        }
        if let Some(admin) = changes.admin {
            builder.push(", admin = ").push_bind(admin);
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder.build().execute(conn).await?;

        Ok(())
    }

    /// Makes `address` the user's default e-mail address
    pub async fn set_default_email(
        conn: &mut PgConnection,
        user_id: i32,
        address: &str,
    ) -> Result<(), sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE email_addresses SET address = $2 WHERE user_id = $1 AND is_default",
        )
        .bind(user_id)
        .bind(address)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO email_addresses (user_id, address, is_default) VALUES ($1, $2, TRUE)",
            )
            .bind(user_id)
            .bind(address)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Deletes the user and everything that references it
    ///
    /// Order: member roles, memberships, e-mail addresses, then the user row.
    pub async fn delete_cascade(conn: &mut PgConnection, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM member_roles WHERE member_id IN (SELECT id FROM members WHERE user_id = $1)",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM members WHERE user_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("DELETE FROM email_addresses WHERE user_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
