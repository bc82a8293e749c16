use axum::{extract::State, Json};

use super::{ApiResult, AppState};
use crate::models::dashboard::DashboardSnapshot;
use crate::services::call;
use crate::services::dashboard::DashboardRequest;

pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardSnapshot>> {
    let snapshot = call(&state.channels.dashboard, |response| {
        DashboardRequest::GetSnapshot { response }
    })
    .await?;

    Ok(Json(snapshot))
}
