//! Data access layer.
//!
//! Handlers talk to storage through [`Store`]. Single-row lookups return
//! `Ok(None)` when nothing matches; unique-key violations surface as
//! [`StoreError::Conflict`]. There are no multi-table transactions, so callers
//! writing tickets and purchases must handle a failure between the two writes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, Purchase, Ticket, TicketType, User, WalletTransaction};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_event(&self, event: &Event) -> StoreResult<Event>;
    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    async fn get_published_event_by_slug(&self, slug: &str) -> StoreResult<Option<Event>>;
    /// Newest first.
    async fn list_events_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Event>>;
    /// Newest first.
    async fn list_published_events(&self) -> StoreResult<Vec<Event>>;
    async fn update_event(&self, event: &Event) -> StoreResult<Event>;
    async fn delete_event(&self, id: Uuid) -> StoreResult<()>;

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> StoreResult<TicketType>;
    async fn get_ticket_type(&self, id: Uuid) -> StoreResult<Option<TicketType>>;
    /// Cheapest first.
    async fn list_ticket_types_by_events(&self, event_ids: &[Uuid]) -> StoreResult<Vec<TicketType>>;
    async fn update_ticket_type(&self, ticket_type: &TicketType) -> StoreResult<TicketType>;
    async fn delete_ticket_type(&self, id: Uuid) -> StoreResult<()>;
    /// Atomically bumps `quantity_sold` by one. Returns `false` when the sale
    /// pushed the count past `quantity_available`.
    async fn record_ticket_sale(&self, ticket_type_id: Uuid) -> StoreResult<bool>;

    async fn insert_ticket(&self, ticket: &Ticket) -> StoreResult<Ticket>;
    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>>;
    async fn get_ticket_by_code(&self, ticket_code: &str) -> StoreResult<Option<Ticket>>;
    async fn mark_ticket_oversold(&self, id: Uuid) -> StoreResult<()>;
    /// Newest first.
    async fn list_tickets_by_events(&self, event_ids: &[Uuid]) -> StoreResult<Vec<Ticket>>;
    /// Tickets that are not cancelled.
    async fn count_issued_tickets(&self, event_id: Uuid) -> StoreResult<i64>;

    async fn insert_purchase(&self, purchase: &Purchase) -> StoreResult<Purchase>;
    async fn find_purchase_by_reference(&self, reference: &str) -> StoreResult<Option<Purchase>>;
    async fn list_completed_purchases_by_events(
        &self,
        event_ids: &[Uuid],
    ) -> StoreResult<Vec<Purchase>>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn insert_wallet_transaction(
        &self,
        transaction: &WalletTransaction,
    ) -> StoreResult<WalletTransaction>;
    /// Newest first.
    async fn list_wallet_transactions(&self, user_id: Uuid) -> StoreResult<Vec<WalletTransaction>>;
    /// Recomputes the cached `users.wallet_balance` from the ledger.
    async fn refresh_wallet_balance(&self, user_id: Uuid) -> StoreResult<Decimal>;
}
