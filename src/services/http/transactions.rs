use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{ApiResult, AppState};
use crate::models::transactions::{
    Purchase, PurchaseRequest, TransactionKind, TransactionStatus, TransactionView,
};
use crate::services::call;
use crate::services::transactions::{TransactionFilter, TransactionRequest};
use crate::utils::{Page, Paged};

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub q: Option<String>,
    pub status: Option<TransactionStatus>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<TransactionQuery>,
) -> ApiResult<Json<Paged<TransactionView>>> {
    let filter = TransactionFilter {
        query: params.q,
        status: params.status,
        kind: params.kind,
        page: Page::new(params.limit, params.offset),
    };

    let transactions = call(&state.channels.transactions, |response| {
        TransactionRequest::ListTransactions { filter, response }
    })
    .await?;

    Ok(Json(transactions))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TransactionView>> {
    let transaction = call(&state.channels.transactions, |response| {
        TransactionRequest::GetTransaction { id, response }
    })
    .await?;

    Ok(Json(transaction))
}

pub async fn record_purchase(
    State(state): State<AppState>,
    Json(purchase): Json<PurchaseRequest>,
) -> ApiResult<(StatusCode, Json<Purchase>)> {
    let purchase = call(&state.channels.transactions, |response| {
        TransactionRequest::RecordPurchase { purchase, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(purchase)))
}
