/// Authorization gates
///
/// Every gate turns an [`Authentication`] plus a resource context into a
/// [`Decision`]. Authentication is settled first: absent credentials always
/// deny with `NoCredentials` (401) and rejected credentials with `Forbidden`
/// (403), before any resource lookup runs. Only an authenticated user reaches
/// the resource-specific rule.
///
/// Gates that need membership data take a `&mut PgConnection`, so they can
/// run inside an open transaction and see its uncommitted writes.
///
/// # Permission model
///
/// - **admin**: the user's `admin` flag; passes every gate
/// - **manager rights**: Manager or TechSupport role in the project
/// - **same user**: the authenticated username equals the target username
///
/// # Example
///
/// ```no_run
/// use depot_shared::auth::authorization::allow_manager_or_admin;
/// use depot_shared::auth::credentials::Authentication;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, auth: Authentication) -> Result<(), depot_shared::error::DepotError> {
/// let mut conn = pool.acquire().await?;
/// allow_manager_or_admin(&mut conn, "demo", &auth).await?.into_result()?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgConnection;

use super::credentials::{AuthScheme, Authentication};
use crate::db::query::at_most_one;
use crate::error::DepotError;
use crate::models::role::Role;
use crate::models::user::User;

/// Why a gate refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// No credentials were presented (401)
    NoCredentials(AuthScheme),

    /// Credentials were presented but are wrong or insufficient (403)
    Forbidden,

    /// The gate needed a request parameter that was absent (400)
    MissingParam(String),
}

/// Gate outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// `Ok(())` when allowed, the matching `DepotError` otherwise
    pub fn into_result(self) -> Result<(), DepotError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(denial.into()),
        }
    }
}

impl From<Denial> for DepotError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::NoCredentials(AuthScheme::Basic) => DepotError::BasicAuthRequired,
            Denial::NoCredentials(AuthScheme::Bearer) => DepotError::AuthTokenRequired,
            Denial::Forbidden => DepotError::Forbidden,
            Denial::MissingParam(param) => DepotError::MissingParam(param),
        }
    }
}

pub fn is_admin(user: &User) -> bool {
    user.admin
}

/// The authenticated user, or the denial for its absence
fn authenticated(auth: &Authentication) -> Result<&User, Decision> {
    match auth {
        Authentication::Authenticated(user) => Ok(user),
        Authentication::Missing(scheme) => Err(Decision::Deny(Denial::NoCredentials(*scheme))),
        Authentication::Rejected => Err(Decision::Deny(Denial::Forbidden)),
    }
}

fn allow_if(condition: bool) -> Decision {
    if condition {
        Decision::Allow
    } else {
        Decision::Deny(Denial::Forbidden)
    }
}

/// Role of `username` in the project `project_code`
///
/// `None` for a missing project or a non-member.
///
/// # Errors
///
/// `duplicate_membership` when more than one membership matches.
pub async fn role_in_project(
    conn: &mut PgConnection,
    project_code: &str,
    username: &str,
) -> Result<Option<Role>, DepotError> {
    let rows = Role::in_project(conn, project_code, username).await?;
    at_most_one(rows, "membership")
}

pub async fn is_manager_of(
    conn: &mut PgConnection,
    project_code: &str,
    username: &str,
) -> Result<bool, DepotError> {
    Ok(role_in_project(conn, project_code, username)
        .await?
        .map(|role| role.is_manager())
        .unwrap_or(false))
}

pub async fn has_manager_or_support_rights_on(
    conn: &mut PgConnection,
    project_code: &str,
    username: &str,
) -> Result<bool, DepotError> {
    Ok(role_in_project(conn, project_code, username)
        .await?
        .map(|role| role.has_manager_rights())
        .unwrap_or(false))
}

/// Admits admins and holders of manager rights on the project
pub async fn allow_manager_or_admin(
    conn: &mut PgConnection,
    project_code: &str,
    auth: &Authentication,
) -> Result<Decision, DepotError> {
    let user = match authenticated(auth) {
        Ok(user) => user,
        Err(denial) => return Ok(denial),
    };

    if is_admin(user) {
        return Ok(Decision::Allow);
    }

    let rights = has_manager_or_support_rights_on(conn, project_code, &user.username).await?;
    Ok(allow_if(rights))
}

/// Admits admins and the user named `username`
pub fn allow_same_user_or_admin(username: &str, auth: &Authentication) -> Decision {
    match authenticated(auth) {
        Ok(user) => allow_if(is_admin(user) || user.username == username),
        Err(denial) => denial,
    }
}

/// Admits admins, the user named `username`, or managers of `project_code`
///
/// The manager fallback needs a project; without one the request is a 400
/// `missing_projectCode`.
pub async fn allow_same_user_or_project_manager_or_admin(
    conn: &mut PgConnection,
    username: &str,
    project_code: Option<&str>,
    auth: &Authentication,
) -> Result<Decision, DepotError> {
    let decision = allow_same_user_or_admin(username, auth);
    if decision != Decision::Deny(Denial::Forbidden) || auth.user().is_none() {
        return Ok(decision);
    }

    match project_code {
        Some(code) => allow_manager_or_admin(conn, code, auth).await,
        None => Ok(Decision::Deny(Denial::MissingParam("projectCode".to_string()))),
    }
}

/// Admits any authenticated user
pub fn allow_authenticated(auth: &Authentication) -> Decision {
    match authenticated(auth) {
        Ok(_) => Decision::Allow,
        Err(denial) => denial,
    }
}

/// Admits admins only
pub fn allow_admin_only(auth: &Authentication) -> Decision {
    match authenticated(auth) {
        Ok(user) => allow_if(is_admin(user)),
        Err(denial) => denial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(username: &str, admin: bool) -> Authentication {
        Authentication::Authenticated(User {
            id: 1,
            username: username.to_string(),
            hashed_password: String::new(),
            salt: String::new(),
            firstname: String::new(),
            lastname: String::new(),
            language: String::new(),
            admin,
            mail: None,
            created_on: Utc::now(),
            updated_on: Utc::now(),
        })
    }

    #[test]
    fn test_same_user_or_admin() {
        assert_eq!(allow_same_user_or_admin("alice", &user("alice", false)), Decision::Allow);
        assert_eq!(allow_same_user_or_admin("alice", &user("root", true)), Decision::Allow);
        assert_eq!(
            allow_same_user_or_admin("alice", &user("bob", false)),
            Decision::Deny(Denial::Forbidden)
        );
    }

    #[test]
    fn test_absence_precedes_resource_rules() {
        assert_eq!(
            allow_same_user_or_admin("alice", &Authentication::Missing(AuthScheme::Bearer)),
            Decision::Deny(Denial::NoCredentials(AuthScheme::Bearer))
        );
        assert_eq!(
            allow_admin_only(&Authentication::Missing(AuthScheme::Basic)),
            Decision::Deny(Denial::NoCredentials(AuthScheme::Basic))
        );
        assert_eq!(
            allow_admin_only(&Authentication::Rejected),
            Decision::Deny(Denial::Forbidden)
        );
    }

    #[test]
    fn test_authenticated_admits_any_user() {
        assert!(allow_authenticated(&user("alice", false)).is_allowed());
        assert_eq!(
            allow_authenticated(&Authentication::Missing(AuthScheme::Bearer)),
            Decision::Deny(Denial::NoCredentials(AuthScheme::Bearer))
        );
        assert_eq!(
            allow_authenticated(&Authentication::Rejected),
            Decision::Deny(Denial::Forbidden)
        );
    }

    #[test]
    fn test_admin_only() {
        assert!(allow_admin_only(&user("root", true)).is_allowed());
        assert!(!allow_admin_only(&user("alice", false)).is_allowed());
    }

    #[test]
    fn test_denials_map_to_errors() {
        let cases = vec![
            (Denial::NoCredentials(AuthScheme::Basic), 401, "basic_auth_required"),
            (Denial::NoCredentials(AuthScheme::Bearer), 401, "auth_token_required"),
            (Denial::Forbidden, 403, "forbidden"),
            (Denial::MissingParam("projectCode".into()), 400, "missing_projectCode"),
        ];

        for (denial, status, code) in cases {
            let err = Decision::Deny(denial).into_result().unwrap_err();
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.code(), code);
        }

        assert!(Decision::Allow.into_result().is_ok());
    }
}
