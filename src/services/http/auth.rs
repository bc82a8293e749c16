use axum::{extract::State, http::StatusCode, Extension, Json};

use super::{ApiResult, AppState, BearerToken};
use crate::models::admins::{AdminIdentity, Credentials, ProfileUpdate, SessionToken};
use crate::services::auth::AuthRequest;
use crate::services::call;

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<SessionToken>> {
    let session = call(&state.channels.auth, |response| AuthRequest::Login {
        credentials,
        response,
    })
    .await?;

    Ok(Json(session))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> ApiResult<StatusCode> {
    call(&state.channels.auth, |response| AuthRequest::Logout {
        token,
        response,
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(Extension(admin): Extension<AdminIdentity>) -> Json<AdminIdentity> {
    Json(admin)
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<AdminIdentity>> {
    let identity = call(&state.channels.auth, |response| AuthRequest::UpdateProfile {
        admin_id: admin.admin_id,
        update,
        response,
    })
    .await?;

    Ok(Json(identity))
}
