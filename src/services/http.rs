use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use super::auth::AuthRequest;
use super::{call, ServiceChannels, ServiceError};

mod auth;
mod dashboard;
mod deposits;
mod events;
mod qr_codes;
mod stations;
mod transactions;
mod users;

#[derive(Clone)]
pub struct AppState {
    pub channels: ServiceChannels,
}

/// The raw bearer token of the current request, kept so logout can end the
/// session it arrived with.
#[derive(Clone)]
pub struct BearerToken(pub String);

#[derive(Debug)]
pub struct ApiError(ServiceError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Repository(_)
        | ServiceError::Communication(..)
        | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;

    let session_token = token.clone();
    let identity = call(&state.channels.auth, |response| AuthRequest::Authenticate {
        token: session_token,
        response,
    })
    .await?;

    req.extensions_mut().insert(identity);
    req.extensions_mut().insert(BearerToken(token));

    Ok(next.run(req).await)
}

pub fn router(channels: ServiceChannels) -> Router {
    let state = AppState { channels };

    let api = Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/status", put(users::set_user_status))
        .route("/users/{id}/toggle-status", post(users::toggle_user_status))
        .route(
            "/deposits",
            get(deposits::list_deposits).post(deposits::create_deposit),
        )
        .route("/deposits/{id}", get(deposits::get_deposit))
        .route("/deposits/{id}/approve", post(deposits::approve_deposit))
        .route("/deposits/{id}/reject", post(deposits::reject_deposit))
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/purchase", post(transactions::record_purchase))
        .route("/transactions/{id}", get(transactions::get_transaction))
        .route(
            "/stations",
            get(stations::list_stations).post(stations::create_station),
        )
        .route(
            "/stations/{id}",
            get(stations::get_station)
                .put(stations::update_station)
                .delete(stations::delete_station),
        )
        .route("/stations/{id}/status", put(stations::set_station_status))
        .route(
            "/stations/{id}/toggle-status",
            post(stations::toggle_station_status),
        )
        .route(
            "/qr-codes",
            get(qr_codes::list_qr_codes).post(qr_codes::create_qr_code),
        )
        .route("/qr-codes/preview", post(qr_codes::preview_qr_code))
        .route(
            "/qr-codes/{id}",
            axum::routing::delete(qr_codes::delete_qr_code),
        )
        .route(
            "/qr-codes/{id}/toggle-status",
            post(qr_codes::toggle_qr_status),
        )
        .route("/qr-codes/{id}/payload", get(qr_codes::get_payload))
        .route("/qr-codes/{id}/svg", get(qr_codes::get_svg))
        .route("/qr-codes/{id}/png", get(qr_codes::get_png))
        .route("/events", get(events::stream_events))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let session = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/auth/login", post(auth::login))
        .merge(session)
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    channels: ServiceChannels,
    listen: &str,
) -> Result<(), anyhow::Error> {
    let app = router(channels);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
