use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::wallet::ledger_balance;
use crate::models::{
    Event, PaymentStatus, Purchase, Ticket, TicketStatus, TicketType, User, WalletTransaction,
};

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    ticket_types: HashMap<Uuid, TicketType>,
    tickets: HashMap<Uuid, Ticket>,
    purchases: HashMap<Uuid, Purchase>,
    users: HashMap<Uuid, User>,
    wallet_transactions: Vec<WalletTransaction>,
}

/// In-process [`Store`] with the same unique keys as the Postgres schema.
///
/// Every call yields to the scheduler once before touching the tables, the
/// way a round-trip to a remote database would, so concurrent requests
/// interleave as they do in production.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_next_purchase: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users are provisioned by the auth provider; this stands in for that.
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn purchase_count(&self) -> usize {
        self.tables.read().await.purchases.len()
    }

    pub async fn ticket_count(&self) -> usize {
        self.tables.read().await.tickets.len()
    }

    /// Makes the next `insert_purchase` fail as if the database dropped the
    /// connection.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn fail_next_purchase_insert(&self) {
        self.fail_next_purchase.store(true, Ordering::SeqCst);
    }
}

fn not_found(what: &str, id: Uuid) -> StoreError {
    StoreError::NotFound(format!("{what} '{id}' was not found"))
}

fn newest_first<T>(rows: &mut [T], created: impl Fn(&T) -> chrono::DateTime<Utc>) {
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<Event> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        if tables.events.values().any(|e| e.slug == event.slug) {
            return Err(StoreError::Conflict(
                "An event with this slug already exists".to_string(),
            ));
        }
        tables.events.insert(event.id, event.clone());
        Ok(event.clone())
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        tokio::task::yield_now().await;
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn get_published_event_by_slug(&self, slug: &str) -> StoreResult<Option<Event>> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .values()
            .find(|e| e.slug == slug && e.is_published)
            .cloned())
    }

    async fn list_events_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut events, |e| e.created_at);
        Ok(events)
    }

    async fn list_published_events(&self) -> StoreResult<Vec<Event>> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.is_published)
            .cloned()
            .collect();
        newest_first(&mut events, |e| e.created_at);
        Ok(events)
    }

    async fn update_event(&self, event: &Event) -> StoreResult<Event> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        if tables
            .events
            .values()
            .any(|e| e.slug == event.slug && e.id != event.id)
        {
            return Err(StoreError::Conflict(
                "An event with this slug already exists".to_string(),
            ));
        }
        let slot = tables
            .events
            .get_mut(&event.id)
            .ok_or_else(|| not_found("Event", event.id))?;
        *slot = event.clone();
        Ok(event.clone())
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        tables
            .events
            .remove(&id)
            .ok_or_else(|| not_found("Event", id))?;
        tables.ticket_types.retain(|_, tt| tt.event_id != id);
        Ok(())
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> StoreResult<TicketType> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        tables.ticket_types.insert(ticket_type.id, ticket_type.clone());
        Ok(ticket_type.clone())
    }

    async fn get_ticket_type(&self, id: Uuid) -> StoreResult<Option<TicketType>> {
        tokio::task::yield_now().await;
        Ok(self.tables.read().await.ticket_types.get(&id).cloned())
    }

    async fn list_ticket_types_by_events(
        &self,
        event_ids: &[Uuid],
    ) -> StoreResult<Vec<TicketType>> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        let mut types: Vec<TicketType> = tables
            .ticket_types
            .values()
            .filter(|tt| event_ids.contains(&tt.event_id))
            .cloned()
            .collect();
        types.sort_by(|a, b| a.price.cmp(&b.price).then(a.created_at.cmp(&b.created_at)));
        Ok(types)
    }

    async fn update_ticket_type(&self, ticket_type: &TicketType) -> StoreResult<TicketType> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        let slot = tables
            .ticket_types
            .get_mut(&ticket_type.id)
            .ok_or_else(|| not_found("Ticket type", ticket_type.id))?;
        // Sales are counted by record_ticket_sale only.
        let sold = slot.quantity_sold;
        *slot = ticket_type.clone();
        slot.quantity_sold = sold;
        Ok(slot.clone())
    }

    async fn delete_ticket_type(&self, id: Uuid) -> StoreResult<()> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        match tables.ticket_types.get(&id).map(|tt| tt.quantity_sold) {
            None => Err(not_found("Ticket type", id)),
            Some(sold) if sold > 0 => Err(StoreError::Conflict(
                "Cannot delete a ticket type that has sales".to_string(),
            )),
            Some(_) => {
                tables.ticket_types.remove(&id);
                Ok(())
            }
        }
    }

    async fn record_ticket_sale(&self, ticket_type_id: Uuid) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        let tt = tables
            .ticket_types
            .get_mut(&ticket_type_id)
            .ok_or_else(|| not_found("Ticket type", ticket_type_id))?;
        tt.quantity_sold += 1;
        tt.updated_at = Utc::now();
        Ok(tt.quantity_sold <= tt.quantity_available)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> StoreResult<Ticket> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        if tables
            .tickets
            .values()
            .any(|t| t.ticket_code == ticket.ticket_code)
        {
            return Err(StoreError::Conflict(
                "A ticket with this code already exists".to_string(),
            ));
        }
        tables.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket.clone())
    }

    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        tokio::task::yield_now().await;
        Ok(self.tables.read().await.tickets.get(&id).cloned())
    }

    async fn get_ticket_by_code(&self, ticket_code: &str) -> StoreResult<Option<Ticket>> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .values()
            .find(|t| t.ticket_code == ticket_code)
            .cloned())
    }

    async fn mark_ticket_oversold(&self, id: Uuid) -> StoreResult<()> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        let ticket = tables
            .tickets
            .get_mut(&id)
            .ok_or_else(|| not_found("Ticket", id))?;
        ticket.oversold = true;
        Ok(())
    }

    async fn list_tickets_by_events(&self, event_ids: &[Uuid]) -> StoreResult<Vec<Ticket>> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .values()
            .filter(|t| event_ids.contains(&t.event_id))
            .cloned()
            .collect();
        newest_first(&mut tickets, |t| t.created_at);
        Ok(tickets)
    }

    async fn count_issued_tickets(&self, event_id: Uuid) -> StoreResult<i64> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        let count = tables
            .tickets
            .values()
            .filter(|t| t.event_id == event_id && t.status != TicketStatus::Cancelled)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> StoreResult<Purchase> {
        tokio::task::yield_now().await;
        if self.fail_next_purchase.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        let mut tables = self.tables.write().await;
        if tables
            .purchases
            .values()
            .any(|p| p.payment_reference == purchase.payment_reference)
        {
            return Err(StoreError::Conflict(
                "A purchase with this payment reference already exists".to_string(),
            ));
        }
        tables.purchases.insert(purchase.id, purchase.clone());
        Ok(purchase.clone())
    }

    async fn find_purchase_by_reference(&self, reference: &str) -> StoreResult<Option<Purchase>> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .values()
            .find(|p| p.payment_reference == reference)
            .cloned())
    }

    async fn list_completed_purchases_by_events(
        &self,
        event_ids: &[Uuid],
    ) -> StoreResult<Vec<Purchase>> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        let mut purchases: Vec<Purchase> = tables
            .purchases
            .values()
            .filter(|p| {
                event_ids.contains(&p.event_id) && p.payment_status == PaymentStatus::Completed
            })
            .cloned()
            .collect();
        newest_first(&mut purchases, |p| p.created_at);
        Ok(purchases)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        tokio::task::yield_now().await;
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert_wallet_transaction(
        &self,
        transaction: &WalletTransaction,
    ) -> StoreResult<WalletTransaction> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        if transaction.reference.is_some()
            && tables
                .wallet_transactions
                .iter()
                .any(|tx| tx.reference == transaction.reference)
        {
            return Err(StoreError::Conflict(
                "A wallet transaction with this reference already exists".to_string(),
            ));
        }
        tables.wallet_transactions.push(transaction.clone());
        Ok(transaction.clone())
    }

    async fn list_wallet_transactions(&self, user_id: Uuid) -> StoreResult<Vec<WalletTransaction>> {
        tokio::task::yield_now().await;
        let tables = self.tables.read().await;
        let mut entries: Vec<WalletTransaction> = tables
            .wallet_transactions
            .iter()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut entries, |tx| tx.created_at);
        Ok(entries)
    }

    async fn refresh_wallet_balance(&self, user_id: Uuid) -> StoreResult<Decimal> {
        tokio::task::yield_now().await;
        let mut tables = self.tables.write().await;
        let balance = ledger_balance(
            tables
                .wallet_transactions
                .iter()
                .filter(|tx| tx.user_id == user_id),
        );
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| not_found("User", user_id))?;
        user.wallet_balance = balance;
        user.updated_at = Utc::now();
        Ok(balance)
    }
}
