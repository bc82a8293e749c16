use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{ApiResult, AppState};
use crate::models::users::{NewUser, User, UserStatus};
use crate::services::call;
use crate::services::users::{UserFilter, UserRequest};
use crate::utils::{Page, Paged};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
    pub status: Option<UserStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: UserStatus,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> ApiResult<Json<Paged<User>>> {
    let filter = UserFilter {
        query: params.q,
        status: params.status,
        page: Page::new(params.limit, params.offset),
    };

    let users = call(&state.channels.users, |response| UserRequest::ListUsers {
        filter,
        response,
    })
    .await?;

    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let user = call(&state.channels.users, |response| UserRequest::GetUser {
        id,
        response,
    })
    .await?;

    Ok(Json(user))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(user): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = call(&state.channels.users, |response| UserRequest::CreateUser {
        user,
        response,
    })
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn set_user_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<User>> {
    let user = call(&state.channels.users, |response| UserRequest::SetStatus {
        id,
        status: body.status,
        response,
    })
    .await?;

    Ok(Json(user))
}

pub async fn toggle_user_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let user = call(&state.channels.users, |response| UserRequest::ToggleStatus {
        id,
        response,
    })
    .await?;

    Ok(Json(user))
}
