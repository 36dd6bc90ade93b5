/// Project endpoints
///
/// - `GET    /projects?limit=&offset=` - list projects (admin only)
/// - `POST   /projects` - create or update the project named in the body
/// - `GET    /projects/:code` - project with members (manager or admin)
/// - `HEAD   /projects/:code` - existence check, no credentials needed
/// - `PUT    /projects/:code` - create (any user) or update (manager or admin)
/// - `PATCH  /projects/:code` - partial update and membership changes
/// - `DELETE /projects/:code` - delete; a missing project is still 204

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use depot_shared::auth::authorization::{allow_admin_only, allow_authenticated};
use depot_shared::error::DepotError;
use depot_shared::models::project::{Project, ProjectWithMembers};
use depot_shared::mutations::project::{self as mutate, ProjectPayload};
use depot_shared::mutations::Upsert;
use depot_shared::queries;
use serde::Deserialize;

use super::require_manager_or_admin;
use crate::error::ApiResult;
use crate::extract::{Caller, Selected};

/// Page size when `limit` is not given
pub const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 201 with `Content-Location` on create, 200 on update
fn upsert_response(outcome: Upsert<ProjectWithMembers>) -> Response {
    match outcome {
        Upsert::Created(project) => {
            let location = format!("/projects/{}", project.project.code);
            (
                StatusCode::CREATED,
                [(header::CONTENT_LOCATION, location)],
                Json(project),
            )
                .into_response()
        }
        Upsert::Updated(project) => (StatusCode::OK, Json(project)).into_response(),
    }
}

pub async fn list_projects(
    Caller { store, auth }: Caller,
    page: Result<Query<Pagination>, QueryRejection>,
) -> ApiResult<Json<Vec<Project>>> {
    allow_admin_only(&auth).into_result()?;
    let Query(page) = page?;

    let projects = queries::list_projects(
        &store,
        page.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        page.offset.unwrap_or(0),
    )
    .await?;

    Ok(Json(projects))
}

pub async fn create_project(
    Caller { store, auth }: Caller,
    body: Result<Json<ProjectPayload>, JsonRejection>,
) -> ApiResult<Response> {
    allow_authenticated(&auth).into_result()?;
    let Json(payload) = body?;
    let code = payload
        .project_code
        .clone()
        .ok_or_else(|| DepotError::missing("projectCode"))?;

    let outcome = mutate::create_or_update_project(&store, &code, &payload, &auth).await?;
    Ok(upsert_response(outcome))
}

pub async fn get_project(
    Caller { store, auth }: Caller,
    Path(code): Path<String>,
) -> ApiResult<Json<ProjectWithMembers>> {
    require_manager_or_admin(&store, &code, &auth).await?;
    Ok(Json(queries::get_project_with_members(&store, &code).await?))
}

pub async fn head_project(Selected(store): Selected, Path(code): Path<String>) -> ApiResult<StatusCode> {
    if queries::project_exists(&store, &code).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

pub async fn put_project(
    Caller { store, auth }: Caller,
    Path(code): Path<String>,
    body: Result<Json<ProjectPayload>, JsonRejection>,
) -> ApiResult<Response> {
    allow_authenticated(&auth).into_result()?;
    let Json(payload) = body?;
    let outcome = mutate::create_or_update_project(&store, &code, &payload, &auth).await?;
    Ok(upsert_response(outcome))
}

pub async fn patch_project(
    Caller { store, auth }: Caller,
    Path(code): Path<String>,
    body: Result<Json<ProjectPayload>, JsonRejection>,
) -> ApiResult<Json<ProjectWithMembers>> {
    require_manager_or_admin(&store, &code, &auth).await?;
    let Json(payload) = body?;
    Ok(Json(mutate::patch_project(&store, &code, &payload).await?))
}

pub async fn delete_project(
    Caller { store, auth }: Caller,
    Path(code): Path<String>,
) -> ApiResult<StatusCode> {
    require_manager_or_admin(&store, &code, &auth).await?;
    mutate::delete_project(&store, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}
