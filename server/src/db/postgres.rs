use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{Event, Purchase, Ticket, TicketType, User, WalletTransaction};

/// Postgres-backed [`Store`]. Uniqueness of slugs, ticket codes and payment
/// references is enforced by the schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn write_error(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(format!("{what} already exists"));
        }
    }
    StoreError::Database(err)
}

fn require_row<T>(row: Option<T>, what: &str, id: Uuid) -> StoreResult<T> {
    row.ok_or_else(|| StoreError::NotFound(format!("{what} '{id}' was not found")))
}

#[async_trait]
impl Store for PgStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<Event> {
        sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (
                id, user_id, title, description, category, event_type,
                start_date, end_date, start_time, end_time, timezone,
                is_online, venue_name, venue_address, city, state, country, meeting_link,
                max_capacity, is_published, slug, banner_image, gallery_images,
                requires_approval, allow_guest_registration, custom_fields,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.category)
        .bind(event.event_type)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.timezone)
        .bind(event.is_online)
        .bind(&event.venue_name)
        .bind(&event.venue_address)
        .bind(&event.city)
        .bind(&event.state)
        .bind(&event.country)
        .bind(&event.meeting_link)
        .bind(event.max_capacity)
        .bind(event.is_published)
        .bind(&event.slug)
        .bind(&event.banner_image)
        .bind(&event.gallery_images)
        .bind(event.requires_approval)
        .bind(event.allow_guest_registration)
        .bind(&event.custom_fields)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "An event with this slug"))
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_published_event_by_slug(&self, slug: &str) -> StoreResult<Option<Event>> {
        Ok(sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE slug = $1 AND is_published = TRUE",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_events_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        Ok(sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_published_events(&self) -> StoreResult<Vec<Event>> {
        Ok(sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE is_published = TRUE ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_event(&self, event: &Event) -> StoreResult<Event> {
        let row = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events SET
                title = $2, description = $3, category = $4, event_type = $5,
                start_date = $6, end_date = $7, start_time = $8, end_time = $9, timezone = $10,
                is_online = $11, venue_name = $12, venue_address = $13, city = $14,
                state = $15, country = $16, meeting_link = $17, max_capacity = $18,
                is_published = $19, slug = $20, banner_image = $21, gallery_images = $22,
                requires_approval = $23, allow_guest_registration = $24, custom_fields = $25,
                updated_at = $26
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.category)
        .bind(event.event_type)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.timezone)
        .bind(event.is_online)
        .bind(&event.venue_name)
        .bind(&event.venue_address)
        .bind(&event.city)
        .bind(&event.state)
        .bind(&event.country)
        .bind(&event.meeting_link)
        .bind(event.max_capacity)
        .bind(event.is_published)
        .bind(&event.slug)
        .bind(&event.banner_image)
        .bind(&event.gallery_images)
        .bind(event.requires_approval)
        .bind(event.allow_guest_registration)
        .bind(&event.custom_fields)
        .bind(event.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, "An event with this slug"))?;
        require_row(row, "Event", event.id)
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        require_row((result.rows_affected() > 0).then_some(()), "Event", id)
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> StoreResult<TicketType> {
        Ok(sqlx::query_as::<_, TicketType>(
            r#"
            INSERT INTO ticket_types (
                id, event_id, name, description, price, quantity_available, quantity_sold,
                sale_start, sale_end, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(ticket_type.id)
        .bind(ticket_type.event_id)
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.price)
        .bind(ticket_type.quantity_available)
        .bind(ticket_type.quantity_sold)
        .bind(ticket_type.sale_start)
        .bind(ticket_type.sale_end)
        .bind(ticket_type.is_active)
        .bind(ticket_type.created_at)
        .bind(ticket_type.updated_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_ticket_type(&self, id: Uuid) -> StoreResult<Option<TicketType>> {
        Ok(
            sqlx::query_as::<_, TicketType>("SELECT * FROM ticket_types WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_ticket_types_by_events(
        &self,
        event_ids: &[Uuid],
    ) -> StoreResult<Vec<TicketType>> {
        Ok(sqlx::query_as::<_, TicketType>(
            "SELECT * FROM ticket_types WHERE event_id = ANY($1) ORDER BY price ASC, created_at ASC",
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_ticket_type(&self, ticket_type: &TicketType) -> StoreResult<TicketType> {
        let row = sqlx::query_as::<_, TicketType>(
            r#"
            UPDATE ticket_types SET
                name = $2, description = $3, price = $4, quantity_available = $5,
                sale_start = $6, sale_end = $7, is_active = $8, updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ticket_type.id)
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.price)
        .bind(ticket_type.quantity_available)
        .bind(ticket_type.sale_start)
        .bind(ticket_type.sale_end)
        .bind(ticket_type.is_active)
        .bind(ticket_type.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        require_row(row, "Ticket type", ticket_type.id)
    }

    async fn delete_ticket_type(&self, id: Uuid) -> StoreResult<()> {
        // Sales recorded after the handler's check still block the delete.
        let result =
            sqlx::query("DELETE FROM ticket_types WHERE id = $1 AND quantity_sold = 0")
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() > 0 {
            return Ok(());
        }
        match self.get_ticket_type(id).await? {
            Some(_) => Err(StoreError::Conflict(
                "Cannot delete a ticket type that has sales".to_string(),
            )),
            None => Err(StoreError::NotFound(format!("Ticket type '{id}' was not found"))),
        }
    }

    async fn record_ticket_sale(&self, ticket_type_id: Uuid) -> StoreResult<bool> {
        let within = sqlx::query_scalar::<_, bool>(
            r#"
            UPDATE ticket_types
            SET quantity_sold = quantity_sold + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING quantity_sold <= quantity_available
            "#,
        )
        .bind(ticket_type_id)
        .fetch_optional(&self.pool)
        .await?;
        require_row(within, "Ticket type", ticket_type_id)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> StoreResult<Ticket> {
        sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (
                id, event_id, ticket_type_id, attendee_info, ticket_code, qr_code_url,
                status, amount, oversold, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(ticket.ticket_type_id)
        .bind(&ticket.attendee_info)
        .bind(&ticket.ticket_code)
        .bind(&ticket.qr_code_url)
        .bind(ticket.status)
        .bind(ticket.amount)
        .bind(ticket.oversold)
        .bind(ticket.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "A ticket with this code"))
    }

    async fn get_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        Ok(sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_ticket_by_code(&self, ticket_code: &str) -> StoreResult<Option<Ticket>> {
        Ok(
            sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE ticket_code = $1")
                .bind(ticket_code)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn mark_ticket_oversold(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("UPDATE tickets SET oversold = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        require_row((result.rows_affected() > 0).then_some(()), "Ticket", id)
    }

    async fn list_tickets_by_events(&self, event_ids: &[Uuid]) -> StoreResult<Vec<Ticket>> {
        Ok(sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE event_id = ANY($1) ORDER BY created_at DESC",
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_issued_tickets(&self, event_id: Uuid) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status <> 'cancelled'",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> StoreResult<Purchase> {
        sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (
                id, event_id, ticket_id, email, amount, expected_amount, flagged,
                payment_reference, payment_status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(purchase.id)
        .bind(purchase.event_id)
        .bind(purchase.ticket_id)
        .bind(&purchase.email)
        .bind(purchase.amount)
        .bind(purchase.expected_amount)
        .bind(purchase.flagged)
        .bind(&purchase.payment_reference)
        .bind(purchase.payment_status)
        .bind(purchase.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "A purchase with this payment reference"))
    }

    async fn find_purchase_by_reference(&self, reference: &str) -> StoreResult<Option<Purchase>> {
        Ok(sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE payment_reference = $1",
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_completed_purchases_by_events(
        &self,
        event_ids: &[Uuid],
    ) -> StoreResult<Vec<Purchase>> {
        Ok(sqlx::query_as::<_, Purchase>(
            r#"
            SELECT * FROM purchases
            WHERE event_id = ANY($1) AND payment_status = 'completed'
            ORDER BY created_at DESC
            "#,
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_wallet_transaction(
        &self,
        transaction: &WalletTransaction,
    ) -> StoreResult<WalletTransaction> {
        sqlx::query_as::<_, WalletTransaction>(
            r#"
            INSERT INTO wallet_transactions (
                id, user_id, type, amount, description, status, reference, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.user_id)
        .bind(transaction.kind)
        .bind(transaction.amount)
        .bind(&transaction.description)
        .bind(transaction.status)
        .bind(&transaction.reference)
        .bind(transaction.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "A wallet transaction with this reference"))
    }

    async fn list_wallet_transactions(&self, user_id: Uuid) -> StoreResult<Vec<WalletTransaction>> {
        Ok(sqlx::query_as::<_, WalletTransaction>(
            "SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn refresh_wallet_balance(&self, user_id: Uuid) -> StoreResult<Decimal> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE users SET
                wallet_balance = COALESCE((
                    SELECT SUM(CASE WHEN type = 'credit' THEN amount ELSE -amount END)
                    FROM wallet_transactions
                    WHERE user_id = $1 AND status = 'completed'
                ), 0),
                updated_at = NOW()
            WHERE id = $1
            RETURNING wallet_balance
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        require_row(balance, "User", user_id)
    }
}
