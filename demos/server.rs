//! Simple REST API server example for the bank ledger.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /accounts` - Create an account
//! - `GET /accounts` - List all accounts
//! - `GET /accounts/:id` - Get an account by id
//! - `POST /transfers` - Move funds between two accounts atomically
//!
//! ## Example Usage
//!
//! ```bash
//! # Create two accounts
//! curl -X POST http://localhost:3000/accounts \
//!   -H "Content-Type: application/json" \
//!   -d '{"owner": "alice", "currency": "USD", "balance": 10000}'
//! curl -X POST http://localhost:3000/accounts \
//!   -H "Content-Type: application/json" \
//!   -d '{"owner": "bob", "currency": "USD", "balance": 5000}'
//!
//! # Transfer
//! curl -X POST http://localhost:3000/transfers \
//!   -H "Content-Type: application/json" \
//!   -d '{"from_account_id": 1, "to_account_id": 2, "amount": 2500}'
//!
//! # Inspect
//! curl http://localhost:3000/accounts/1
//! curl http://localhost:3000/accounts
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bank_ledger_rs::{
    Account, AccountId, CreateAccountParams, Ledger, LedgerError, TransferRequest, TransferResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub owner: String,
    pub currency: String,
    #[serde(default)]
    pub balance: i64,
}

/// Request body for a transfer.
#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            LedgerError::SelfTransfer => (StatusCode::BAD_REQUEST, "SELF_TRANSFER"),
            LedgerError::AccountNotFound => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            LedgerError::EntryNotFound => (StatusCode::NOT_FOUND, "ENTRY_NOT_FOUND"),
            LedgerError::TransferNotFound => (StatusCode::NOT_FOUND, "TRANSFER_NOT_FOUND"),
            LedgerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            LedgerError::Canceled => (StatusCode::REQUEST_TIMEOUT, "CANCELED"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /accounts - Create a new account.
async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> (StatusCode, Json<Account>) {
    let account = state.ledger.store().create_account(CreateAccountParams {
        owner: request.owner,
        balance: request.balance,
        currency: request.currency,
    });
    (StatusCode::CREATED, Json(account))
}

/// GET /accounts/:id - Get account by id.
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let account = state.ledger.store().get_account(AccountId(id))?;
    Ok(Json(account))
}

/// GET /accounts - List all accounts.
async fn list_accounts(State(state): State<AppState>) -> Json<Vec<Account>> {
    Json(state.ledger.store().list_accounts(usize::MAX, 0))
}

/// POST /transfers - Move funds between two accounts.
async fn create_transfer(
    State(state): State<AppState>,
    Json(body): Json<TransferBody>,
) -> Result<(StatusCode, Json<TransferResult>), AppError> {
    let result = state.ledger.transfer(TransferRequest {
        from_account_id: AccountId(body.from_account_id),
        to_account_id: AccountId(body.to_account_id),
        amount: body.amount,
    })?;
    Ok((StatusCode::CREATED, Json(result)))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/{id}", get(get_account))
        .route("/transfers", post(create_transfer))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let state = AppState {
        ledger: Arc::new(Ledger::new()),
    };
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000")
        .await
        .expect("failed to bind 127.0.0.1:3000");
    println!("Bank ledger listening on http://127.0.0.1:3000");

    axum::serve(listener, app).await.expect("server error");
}
