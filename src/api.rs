//! REST router for the exchange core.
//!
//! Used by the binary and by integration tests; create with [`create_router`].
//! Identity is resolved by the auth middleware before any handler runs; the
//! admin routes additionally require the admin role. Typed core errors map
//! onto HTTP statuses (NotFound 404, InvalidArgument 400, InsufficientBalance
//! 400, Conflict 409, Unauthorized 401, Storage 500).

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::audit::{AuditEvent, AuditSink};
use crate::auth::{require_admin, resolve_user, AuthConfig, AuthUser};
use crate::error::ExchangeError;
use crate::types::{OrderBody, OrderId, UserId};
use crate::Exchange;

/// Shared app state: one exchange per process plus the audit sink.
#[derive(Clone)]
pub struct AppState {
    pub exchange: Arc<Exchange>,
    pub audit: Arc<dyn AuditSink>,
}

/// Builds the router. Returns `Router<()>` so the caller can use
/// `.into_make_service()` with `axum::serve`.
pub fn create_router(
    exchange: Arc<Exchange>,
    auth: AuthConfig,
    audit: Arc<dyn AuditSink>,
) -> Router<()> {
    let state = AppState { exchange, audit };
    let protected = Router::new()
        .route("/order", post(submit_order).get(list_orders))
        .route("/order/:order_id", get(get_order).delete(cancel_order))
        .route("/balance", get(get_balances))
        .route("/admin/instrument", post(add_instrument))
        .route("/admin/instrument/:ticker", delete(remove_instrument))
        .route("/admin/balance/deposit", post(admin_deposit))
        .route("/admin/balance/withdraw", post(admin_withdraw))
        .layer(middleware::from_fn(move |req, next| {
            resolve_user(req, next, auth.clone())
        }));
    Router::new()
        .route("/health", get(health))
        .route("/public/instrument", get(list_instruments))
        .route("/public/orderbook/:ticker", get(order_book))
        .route("/public/transactions/:ticker", get(trade_history))
        .merge(protected)
        .layer(Extension(state))
}

fn error_response(err: &ExchangeError) -> Response {
    let status = match err {
        ExchangeError::NotFound(_) => StatusCode::NOT_FOUND,
        ExchangeError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ExchangeError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
        ExchangeError::Conflict(_) => StatusCode::CONFLICT,
        ExchangeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ExchangeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(serde::Deserialize)]
struct SubmitOrderRequest {
    ticker: String,
    #[serde(flatten)]
    body: OrderBody,
}

async fn submit_order(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SubmitOrderRequest>,
) -> Response {
    let result = state
        .exchange
        .submit_order(user.user_id, &req.ticker, req.body);
    state.audit.emit(&AuditEvent::now(
        format!("user-{}", user.user_id.0),
        "order_submit",
        Some(serde_json::json!({ "ticker": req.ticker })),
        if result.is_ok() { "success" } else { "rejected" },
    ));
    match result {
        Ok(submit) => {
            #[derive(serde::Serialize)]
            struct Out {
                success: bool,
                order_id: OrderId,
                status: crate::types::Status,
                filled: Decimal,
            }
            (
                StatusCode::OK,
                Json(Out {
                    success: true,
                    order_id: submit.order_id,
                    status: submit.status,
                    filled: submit.filled,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn list_orders(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    (StatusCode::OK, Json(state.exchange.list_orders(user.user_id))).into_response()
}

async fn get_order(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<u64>,
) -> Response {
    match state.exchange.get_order(user.user_id, OrderId(order_id)) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn cancel_order(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<u64>,
) -> Response {
    let result = state.exchange.cancel_order(user.user_id, OrderId(order_id));
    state.audit.emit(&AuditEvent::now(
        format!("user-{}", user.user_id.0),
        "order_cancel",
        Some(serde_json::json!({ "order_id": order_id })),
        if result.is_ok() { "success" } else { "rejected" },
    ));
    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn get_balances(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    (StatusCode::OK, Json(state.exchange.balances(user.user_id))).into_response()
}

#[derive(serde::Deserialize)]
struct BookParams {
    limit: Option<usize>,
}

async fn order_book(
    Extension(state): Extension<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<BookParams>,
) -> Response {
    match state.exchange.order_book(&ticker, params.limit.unwrap_or(10)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn trade_history(
    Extension(state): Extension<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<BookParams>,
) -> Response {
    match state
        .exchange
        .trade_history(&ticker, params.limit.unwrap_or(10))
    {
        Ok(trades) => (StatusCode::OK, Json(trades)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn list_instruments(Extension(state): Extension<AppState>) -> Response {
    (StatusCode::OK, Json(state.exchange.instruments())).into_response()
}

#[derive(serde::Deserialize)]
struct AddInstrumentRequest {
    ticker: String,
    name: String,
}

async fn add_instrument(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AddInstrumentRequest>,
) -> Response {
    if let Err(resp) = require_admin(&user) {
        return resp;
    }
    match state.exchange.register_instrument(&req.ticker, &req.name) {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn remove_instrument(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ticker): Path<String>,
) -> Response {
    if let Err(resp) = require_admin(&user) {
        return resp;
    }
    match state.exchange.remove_instrument(&ticker) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(serde::Deserialize)]
struct BalanceChangeRequest {
    user_id: u64,
    ticker: String,
    amount: Decimal,
}

async fn admin_deposit(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<BalanceChangeRequest>,
) -> Response {
    if let Err(resp) = require_admin(&user) {
        return resp;
    }
    let result = state
        .exchange
        .deposit(UserId(req.user_id), &req.ticker, req.amount);
    state.audit.emit(&AuditEvent::now(
        format!("user-{}", user.user_id.0),
        "deposit",
        Some(serde_json::json!({ "user_id": req.user_id, "ticker": req.ticker, "amount": req.amount })),
        if result.is_ok() { "success" } else { "rejected" },
    ));
    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn admin_withdraw(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<BalanceChangeRequest>,
) -> Response {
    if let Err(resp) = require_admin(&user) {
        return resp;
    }
    let result = state
        .exchange
        .withdraw(UserId(req.user_id), &req.ticker, req.amount);
    state.audit.emit(&AuditEvent::now(
        format!("user-{}", user.user_id.0),
        "withdraw",
        Some(serde_json::json!({ "user_id": req.user_id, "ticker": req.ticker, "amount": req.amount })),
        if result.is_ok() { "success" } else { "rejected" },
    ));
    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(e) => error_response(&e),
    }
}
