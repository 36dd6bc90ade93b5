/// User endpoints
///
/// - `POST   /users` - registration, no credentials needed
/// - `GET    /users/:username` - same user or admin
/// - `PUT    /users/:username` - create (admin) or update (same user or admin)
/// - `PATCH  /users/:username` - same user or admin
/// - `DELETE /users/:username` - same user or admin; a missing user is still 204
/// - `GET    /users/:username/isAdmin` - no credentials needed
/// - `GET    /users/:username/projects[/withRole/:role]` - same user or admin

use axum::{
    extract::{rejection::JsonRejection, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use depot_shared::auth::authorization::allow_same_user_or_admin;
use depot_shared::models::membership::UserProject;
use depot_shared::models::role::RoleKey;
use depot_shared::models::user::User;
use depot_shared::mutations::user::{self as mutate, UserPayload};
use depot_shared::mutations::Upsert;
use depot_shared::queries;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::extract::{Caller, Reader, Selected};

#[derive(Debug, Serialize, Deserialize)]
pub struct IsAdminResponse {
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

fn created(user: User) -> Response {
    let location = format!("/users/{}", user.username);
    (
        StatusCode::CREATED,
        [(header::CONTENT_LOCATION, location)],
        Json(user),
    )
        .into_response()
}

pub async fn register(
    Caller { store, auth }: Caller,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = body?;
    let user = mutate::register_user(&store, &payload, &auth).await?;
    Ok(created(user))
}

pub async fn get_user(
    Reader { store, auth }: Reader,
    Path(username): Path<String>,
) -> ApiResult<Json<User>> {
    allow_same_user_or_admin(&username, &auth).into_result()?;
    Ok(Json(queries::get_user(&store, &username).await?))
}

pub async fn put_user(
    Caller { store, auth }: Caller,
    Path(username): Path<String>,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = body?;

    Ok(match mutate::create_or_update_user(&store, &username, &payload, &auth).await? {
        Upsert::Created(user) => created(user),
        Upsert::Updated(user) => (StatusCode::OK, Json(user)).into_response(),
    })
}

pub async fn patch_user(
    Caller { store, auth }: Caller,
    Path(username): Path<String>,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Json<User>> {
    allow_same_user_or_admin(&username, &auth).into_result()?;
    let requester = auth.into_user()?;
    let Json(payload) = body?;

    Ok(Json(mutate::patch_user(&store, &username, &payload, &requester).await?))
}

pub async fn delete_user(
    Caller { store, auth }: Caller,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    allow_same_user_or_admin(&username, &auth).into_result()?;
    mutate::delete_user(&store, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn is_admin(
    Selected(store): Selected,
    Path(username): Path<String>,
) -> ApiResult<Json<IsAdminResponse>> {
    Ok(Json(IsAdminResponse {
        is_admin: queries::user_is_admin(&store, &username).await?,
    }))
}

pub async fn list_projects(
    Reader { store, auth }: Reader,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<UserProject>>> {
    allow_same_user_or_admin(&username, &auth).into_result()?;
    Ok(Json(queries::list_user_projects(&store, &username, None).await?))
}

pub async fn list_projects_with_role(
    Reader { store, auth }: Reader,
    Path((username, role)): Path<(String, String)>,
) -> ApiResult<Json<Vec<UserProject>>> {
    allow_same_user_or_admin(&username, &auth).into_result()?;
    let role = RoleKey::parse(&role);
    Ok(Json(
        queries::list_user_projects(&store, &username, Some(&role)).await?,
    ))
}
