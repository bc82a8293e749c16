use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use super::{ApiResult, AppState};
use crate::models::admins::AdminIdentity;
use crate::models::deposits::{DepositStatus, DepositView, NewDeposit, Settlement};
use crate::services::call;
use crate::services::deposits::{DepositFilter, DepositRequest};
use crate::utils::{Page, Paged};

#[derive(Debug, Deserialize)]
pub struct DepositQuery {
    pub q: Option<String>,
    pub status: Option<DepositStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list_deposits(
    State(state): State<AppState>,
    Query(params): Query<DepositQuery>,
) -> ApiResult<Json<Paged<DepositView>>> {
    let filter = DepositFilter {
        query: params.q,
        status: params.status,
        page: Page::new(params.limit, params.offset),
    };

    let deposits = call(&state.channels.deposits, |response| {
        DepositRequest::ListDeposits { filter, response }
    })
    .await?;

    Ok(Json(deposits))
}

pub async fn get_deposit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DepositView>> {
    let deposit = call(&state.channels.deposits, |response| {
        DepositRequest::GetDeposit { id, response }
    })
    .await?;

    Ok(Json(deposit))
}

pub async fn create_deposit(
    State(state): State<AppState>,
    Json(deposit): Json<NewDeposit>,
) -> ApiResult<(StatusCode, Json<DepositView>)> {
    let deposit = call(&state.channels.deposits, |response| {
        DepositRequest::CreateDeposit { deposit, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(deposit)))
}

pub async fn approve_deposit(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Path(id): Path<String>,
) -> ApiResult<Json<Settlement>> {
    let settlement = call(&state.channels.deposits, |response| {
        DepositRequest::ApproveDeposit {
            id,
            admin,
            response,
        }
    })
    .await?;

    Ok(Json(settlement))
}

pub async fn reject_deposit(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Path(id): Path<String>,
) -> ApiResult<Json<Settlement>> {
    let settlement = call(&state.channels.deposits, |response| {
        DepositRequest::RejectDeposit {
            id,
            admin,
            response,
        }
    })
    .await?;

    Ok(Json(settlement))
}
