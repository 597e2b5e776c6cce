use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletTransactionType {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletTransactionStatus {
    Pending,
    Completed,
}

/// Append-only ledger entry. Balances are derived from these rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: WalletTransactionType,
    pub amount: Decimal,
    pub description: String,
    pub status: WalletTransactionStatus,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// Signed contribution of this entry to the balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            WalletTransactionType::Credit => self.amount,
            WalletTransactionType::Debit => -self.amount,
        }
    }
}

/// Balance over completed entries only.
pub fn ledger_balance<'a>(entries: impl IntoIterator<Item = &'a WalletTransaction>) -> Decimal {
    entries
        .into_iter()
        .filter(|tx| tx.status == WalletTransactionStatus::Completed)
        .map(WalletTransaction::signed_amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        kind: WalletTransactionType,
        amount: Decimal,
        status: WalletTransactionStatus,
    ) -> WalletTransaction {
        WalletTransaction {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            kind,
            amount,
            description: String::new(),
            status,
            reference: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn balance_ignores_pending_entries() {
        let entries = vec![
            entry(WalletTransactionType::Credit, Decimal::from(5000), WalletTransactionStatus::Completed),
            entry(WalletTransactionType::Debit, Decimal::from(1200), WalletTransactionStatus::Completed),
            entry(WalletTransactionType::Credit, Decimal::from(900), WalletTransactionStatus::Pending),
        ];
        assert_eq!(ledger_balance(&entries), Decimal::from(3800));
    }
}
