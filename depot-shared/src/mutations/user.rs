/// User mutators
///
/// Cleartext passwords never reach the store: a non-empty `password` is run
/// through `hash_for_storage` and only the resulting hash and salt are
/// written. An empty or absent password on update leaves the stored
/// credential as it is.
///
/// Only admins may rename a user (409 `cannot_modify_username` otherwise) or
/// change the `admin` flag (403 otherwise).

use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::{check_consistent, Upsert};
use crate::auth::authorization::{allow_same_user_or_admin, is_admin};
use crate::auth::credentials::Authentication;
use crate::auth::password::{hash_for_storage, StoredPassword};
use crate::db::query::{at_most_one, exactly_one};
use crate::db::store::{Store, Tx};
use crate::error::DepotError;
use crate::models::user::{NewUser, User, UserChanges};

/// User request body
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserPayload {
    #[validate(length(min = 1, max = 255))]
    pub username: Option<String>,

    /// Cleartext; hashed before storage
    pub password: Option<String>,

    #[validate(length(max = 255))]
    pub firstname: Option<String>,

    #[validate(length(max = 255))]
    pub lastname: Option<String>,

    #[validate(length(max = 16))]
    pub language: Option<String>,

    pub admin: Option<bool>,

    #[validate(email)]
    pub mail: Option<String>,
}

fn stored_password(password: Option<&str>) -> Result<Option<StoredPassword>, DepotError> {
    match password {
        Some(password) if !password.is_empty() => hash_for_storage(password)
            .map(Some)
            .map_err(|_| DepotError::missing("password")),
        _ => Ok(None),
    }
}

/// Row for a brand new user
///
/// A password is required. Setting `admin` requires an admin requester.
pub fn new_user(
    username: &str,
    payload: &UserPayload,
    requester: Option<&User>,
) -> Result<NewUser, DepotError> {
    let password = stored_password(payload.password.as_deref())?
        .ok_or_else(|| DepotError::missing("password"))?;

    let admin = payload.admin.unwrap_or(false);
    if admin && !requester.map(is_admin).unwrap_or(false) {
        return Err(DepotError::Forbidden);
    }

    Ok(NewUser {
        username: username.to_string(),
        password,
        firstname: payload.firstname.clone().unwrap_or_default(),
        lastname: payload.lastname.clone().unwrap_or_default(),
        language: payload.language.clone().unwrap_or_default(),
        admin,
    })
}

/// Column changes `requester` may make to `existing`
pub fn user_changes(
    existing: &User,
    payload: &UserPayload,
    requester: &User,
) -> Result<UserChanges, DepotError> {
    let username = match &payload.username {
        Some(username) if *username != existing.username => {
            if !is_admin(requester) {
                return Err(DepotError::cannot_modify("username"));
            }
            Some(username.clone())
        }
        _ => None,
    };

    let admin = match payload.admin {
        Some(admin) if admin != existing.admin => {
            if !is_admin(requester) {
                return Err(DepotError::Forbidden);
            }
            Some(admin)
        }
        _ => None,
    };

    Ok(UserChanges {
        username,
        password: stored_password(payload.password.as_deref())?,
        firstname: payload.firstname.clone(),
        lastname: payload.lastname.clone(),
        language: payload.language.clone(),
        admin,
    })
}

/// Inserts `data`, records its e-mail, and returns the stored row
async fn insert_user(tx: &mut Tx, data: &NewUser, mail: Option<&str>) -> Result<User, DepotError> {
    let id = User::insert(tx, data).await?;
    if let Some(mail) = mail {
        User::set_default_email(tx, id, mail).await?;
    }

    info!(username = %data.username, admin = data.admin, "Created user");
    exactly_one(User::select_by_id(tx, id).await?, "user")
}

/// Applies `changes` to `existing` and returns the stored row
async fn update_user(
    tx: &mut Tx,
    existing: &User,
    changes: &UserChanges,
    mail: Option<&str>,
) -> Result<User, DepotError> {
    if let Some(new_name) = &changes.username {
        if !User::lock_by_username(tx, new_name).await?.is_empty() {
            return Err(DepotError::cannot_modify("username"));
        }
    }

    User::update(tx, existing.id, changes).await?;
    if let Some(mail) = mail {
        User::set_default_email(tx, existing.id, mail).await?;
    }

    info!(
        username = %existing.username,
        renamed_to = ?changes.username,
        password_changed = changes.password.is_some(),
        "Updated user"
    );
    exactly_one(User::select_by_id(tx, existing.id).await?, "user")
}

/// Creates the user `username` or updates it in place
///
/// Both creating and updating require the same user or an admin, so only
/// an admin can create a user here. Self-signup goes through
/// [`register_user`].
///
/// # Errors
///
/// - `auth_token_required` (401) / `forbidden` (403) before any store access
/// - `invalid_<field>` (400) before any store access
/// - `inconsistent_username` (400) when creating with a different body name
/// - `missing_password` (400) when creating without a password
/// - `cannot_modify_username` (409) on update
pub async fn create_or_update_user(
    store: &Store,
    username: &str,
    payload: &UserPayload,
    auth: &Authentication,
) -> Result<Upsert<User>, DepotError> {
    allow_same_user_or_admin(username, auth).into_result()?;
    payload.validate()?;

    store
        .retrying(|| create_or_update_user_once(store, username, payload, auth))
        .await
}

async fn create_or_update_user_once(
    store: &Store,
    username: &str,
    payload: &UserPayload,
    auth: &Authentication,
) -> Result<Upsert<User>, DepotError> {
    let mut tx = store.begin().await?;

    let outcome = match at_most_one(User::lock_by_username(&mut tx, username).await?, "user")? {
        None => {
            check_consistent("username", username, payload.username.as_deref())?;
            let data = new_user(username, payload, auth.user())?;
            Upsert::Created(insert_user(&mut tx, &data, payload.mail.as_deref()).await?)
        }
        Some(existing) => {
            let requester = auth.clone().into_user()?;
            let changes = user_changes(&existing, payload, &requester)?;
            Upsert::Updated(update_user(&mut tx, &existing, &changes, payload.mail.as_deref()).await?)
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Registers a new user named by the body's `username`
///
/// # Errors
///
/// - `missing_username` / `missing_password` (400)
/// - `cannot_modify_username` (409) if the name is taken
pub async fn register_user(
    store: &Store,
    payload: &UserPayload,
    auth: &Authentication,
) -> Result<User, DepotError> {
    payload.validate()?;
    let username = payload
        .username
        .as_deref()
        .ok_or_else(|| DepotError::missing("username"))?;
    let data = new_user(username, payload, auth.user())?;

    store
        .retrying(|| register_user_once(store, &data, payload.mail.as_deref()))
        .await
}

async fn register_user_once(
    store: &Store,
    data: &NewUser,
    mail: Option<&str>,
) -> Result<User, DepotError> {
    let mut tx = store.begin().await?;

    if !User::lock_by_username(&mut tx, &data.username).await?.is_empty() {
        return Err(DepotError::cannot_modify("username"));
    }
    let user = insert_user(&mut tx, data, mail).await?;

    tx.commit().await?;
    Ok(user)
}

/// Applies the fields present in `payload` to the user `username`
///
/// # Errors
///
/// - `invalid_<field>` (400)
/// - `unknown_user` (404)
/// - `forbidden` (403) / `cannot_modify_username` (409)
pub async fn patch_user(
    store: &Store,
    username: &str,
    payload: &UserPayload,
    requester: &User,
) -> Result<User, DepotError> {
    payload.validate()?;

    store
        .retrying(|| patch_user_once(store, username, payload, requester))
        .await
}

async fn patch_user_once(
    store: &Store,
    username: &str,
    payload: &UserPayload,
    requester: &User,
) -> Result<User, DepotError> {
    let mut tx = store.begin().await?;

    let existing = exactly_one(User::lock_by_username(&mut tx, username).await?, "user")?;
    let changes = user_changes(&existing, payload, requester)?;
    let user = update_user(&mut tx, &existing, &changes, payload.mail.as_deref()).await?;

    tx.commit().await?;
    Ok(user)
}

/// Deletes the user with memberships and e-mails; a missing user is a no-op
pub async fn delete_user(store: &Store, username: &str) -> Result<(), DepotError> {
    store
        .retrying(|| delete_user_once(store, username))
        .await
}

async fn delete_user_once(store: &Store, username: &str) -> Result<(), DepotError> {
    let mut tx = store.begin().await?;

    if let Some(user) = at_most_one(User::lock_by_username(&mut tx, username).await?, "user")? {
        User::delete_cascade(&mut tx, user.id).await?;
        info!(username = %username, "Deleted user");
    }

    tx.commit().await?;
    Ok(())
}
