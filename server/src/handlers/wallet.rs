use axum::extract::State;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Serialize;

use super::extract::ApiQuery;
use super::UserScope;
use crate::auth::SessionUser;
use crate::models::{WalletTransactionStatus, WalletTransactionType};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletBalance {
    balance: Decimal,
    pending: Decimal,
    total_credited: Decimal,
}

pub async fn get_balance(
    State(state): State<AppState>,
    session: SessionUser,
    ApiQuery(scope): ApiQuery<UserScope>,
) -> Result<Response, AppError> {
    let user_id = scope.authorize(&session)?;
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let transactions = state.store.list_wallet_transactions(user_id).await?;

    let credits = transactions
        .iter()
        .filter(|tx| tx.kind == WalletTransactionType::Credit);
    let pending: Decimal = credits
        .clone()
        .filter(|tx| tx.status == WalletTransactionStatus::Pending)
        .map(|tx| tx.amount)
        .sum();
    let total_credited: Decimal = credits
        .filter(|tx| tx.status == WalletTransactionStatus::Completed)
        .map(|tx| tx.amount)
        .sum();

    let body = WalletBalance {
        balance: user.wallet_balance,
        pending,
        total_credited,
    };
    Ok(success(body, "Wallet balance retrieved successfully").into_response())
}

pub async fn list_transactions(
    State(state): State<AppState>,
    session: SessionUser,
    ApiQuery(scope): ApiQuery<UserScope>,
) -> Result<Response, AppError> {
    let user_id = scope.authorize(&session)?;
    let transactions = state.store.list_wallet_transactions(user_id).await?;
    Ok(success(transactions, "Wallet transactions retrieved successfully").into_response())
}
