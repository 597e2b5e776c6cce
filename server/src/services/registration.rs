//! Ticket issuance.
//!
//! Free registrations are issued immediately. Paid registrations go through
//! the gateway in two calls: `initialize` hands the payer a checkout URL and
//! stores everything needed to issue the ticket in the gateway's metadata;
//! `verify` runs when the payer comes back and issues the ticket only if the
//! gateway reports success. Nothing is written locally until then, so an
//! abandoned checkout leaves no rows behind.
//!
//! Ticket and purchase are two separate writes. Ticket codes and payment
//! references are unique in storage, which makes a repeated `verify` for the
//! same reference answer "already processed" instead of issuing twice.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::config::Config;
use crate::db::{Store, StoreError};
use crate::models::{
    AttendeeInfo, Event, EventType, PaymentStatus, Purchase, SaleAvailability, Ticket,
    TicketStatus, TicketType, WalletTransaction, WalletTransactionStatus, WalletTransactionType,
};
use crate::payments::{Checkout, InitializeRequest, PaymentGateway, VerificationStatus};
use crate::utils::codes;
use crate::utils::error::AppError;
use crate::utils::money::{from_minor_units, to_minor_units};
use crate::utils::validation::validate_attendee;

/// Attempts at finding an unused ticket code for a free registration.
const FREE_CODE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct FreeRegistration {
    pub event_id: Uuid,
    pub ticket_type_id: Option<Uuid>,
    pub attendee: AttendeeInfo,
    /// Whether the caller presented a valid session.
    pub authenticated: bool,
}

#[derive(Debug, Clone)]
pub struct PaidRegistration {
    pub event_id: Uuid,
    pub ticket_type_id: Option<Uuid>,
    pub attendee: AttendeeInfo,
    /// Minor currency units.
    pub amount: i64,
    pub email: String,
    pub client_metadata: serde_json::Value,
    pub authenticated: bool,
}

/// Everything `verify` needs to issue a ticket, carried by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub event_id: Uuid,
    pub ticket_type_id: Option<Uuid>,
    pub attendee_info: AttendeeInfo,
    /// Minor currency units the checkout was initialized for.
    pub expected_amount: i64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub client: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AmountMismatch {
    pub expected: i64,
    pub paid: i64,
}

impl AmountMismatch {
    /// Mismatch stored on a flagged purchase, in minor units.
    pub fn recorded_on(purchase: &Purchase) -> Option<Self> {
        if !purchase.flagged {
            return None;
        }
        Some(Self {
            expected: to_minor_units(purchase.expected_amount?)?,
            paid: to_minor_units(purchase.amount)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Issued {
    pub ticket: Ticket,
    pub purchase: Purchase,
    /// The ticket type was already full when this sale was recorded.
    pub oversold: bool,
    pub amount_mismatch: Option<AmountMismatch>,
}

#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    Issued(Issued),
    /// A purchase for this reference was already recorded.
    AlreadyProcessed {
        ticket: Option<Ticket>,
        purchase: Purchase,
        amount_mismatch: Option<AmountMismatch>,
    },
    NotSuccessful(VerificationStatus),
}

pub struct RegistrationService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    config: Arc<Config>,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    pub async fn register_free(&self, request: FreeRegistration) -> Result<Issued, AppError> {
        let event = self.open_event(request.event_id, request.authenticated).await?;
        validate_attendee(&request.attendee, &event.custom_fields)?;

        let ticket_type = match request.ticket_type_id {
            Some(id) => {
                let tt = self.on_sale_ticket_type(&event, id).await?;
                if !tt.price.is_zero() {
                    return Err(AppError::ValidationError(
                        "This ticket type requires payment".to_string(),
                    ));
                }
                Some(tt)
            }
            None if event.event_type == EventType::Free => None,
            None => {
                return Err(AppError::ValidationError(
                    "This event requires payment".to_string(),
                ))
            }
        };

        self.ensure_capacity(&event).await?;

        let (ticket, reference) = self
            .insert_free_ticket(&event, ticket_type.as_ref(), &request.attendee)
            .await?;
        let purchase = self
            .record_purchase(&ticket, &request.attendee.email, &reference, None)
            .await
            .map_err(|e| partial_write(&ticket, &reference, e))?;
        let oversold = self.record_sale(&ticket, ticket_type.as_ref()).await;

        info!(
            event_id = %event.id,
            ticket_id = %ticket.id,
            ticket_code = %ticket.ticket_code,
            "Issued free ticket"
        );
        Ok(Issued {
            ticket: Ticket { oversold, ..ticket },
            purchase,
            oversold,
            amount_mismatch: None,
        })
    }

    pub async fn initialize_payment(
        &self,
        request: PaidRegistration,
    ) -> Result<Checkout, AppError> {
        let event = self.open_event(request.event_id, request.authenticated).await?;
        validate_attendee(&request.attendee, &event.custom_fields)?;
        if !request.email.validate_email() {
            return Err(AppError::ValidationError(
                "email is not a valid email address".to_string(),
            ));
        }
        if request.amount <= 0 {
            return Err(AppError::ValidationError(
                "amount must be greater than zero".to_string(),
            ));
        }

        match request.ticket_type_id {
            Some(id) => {
                let tt = self.on_sale_ticket_type(&event, id).await?;
                if tt.price_minor() != Some(request.amount) {
                    return Err(AppError::ValidationError(
                        "amount does not match the ticket price".to_string(),
                    ));
                }
            }
            None => match event.event_type {
                EventType::Donation => {}
                EventType::Free => {
                    return Err(AppError::ValidationError(
                        "Free events do not take payment".to_string(),
                    ))
                }
                EventType::Paid => {
                    return Err(AppError::ValidationError(
                        "ticketTypeId is required for paid events".to_string(),
                    ))
                }
            },
        }

        self.ensure_capacity(&event).await?;

        let reference = codes::payment_reference(Utc::now());
        let metadata = PaymentMetadata {
            event_id: event.id,
            ticket_type_id: request.ticket_type_id,
            attendee_info: request.attendee,
            expected_amount: request.amount,
            client: request.client_metadata,
        };
        let metadata = serde_json::to_value(&metadata)
            .map_err(|e| AppError::InternalServerError(format!("metadata encoding: {e}")))?;

        let checkout = self
            .gateway
            .initialize(InitializeRequest {
                amount: request.amount,
                email: request.email,
                reference: reference.clone(),
                callback_url: self.config.payment_callback_url(),
                metadata,
            })
            .await?;

        info!(event_id = %event.id, %reference, amount = request.amount, "Payment initialized");
        Ok(checkout)
    }

    pub async fn verify_payment(&self, reference: &str) -> Result<VerifyOutcome, AppError> {
        if !codes::is_payment_reference(reference) {
            return Err(AppError::ValidationError(
                "reference is not a payment reference".to_string(),
            ));
        }

        if let Some(purchase) = self.store.find_purchase_by_reference(reference).await? {
            return self.already_processed(purchase).await;
        }

        let verification = self.gateway.verify(reference).await?;
        if verification.status != VerificationStatus::Success {
            info!(%reference, status = ?verification.status, "Payment not successful");
            return Ok(VerifyOutcome::NotSuccessful(verification.status));
        }

        // Only the gateway's copy of the metadata is trusted here; the caller
        // of this endpoint is not authenticated.
        let metadata: PaymentMetadata = serde_json::from_value(verification.metadata.clone())
            .map_err(|e| {
                error!(%reference, error = %e, "Verified payment carries unreadable metadata");
                AppError::InternalServerError(format!(
                    "verified payment {reference} has unreadable metadata"
                ))
            })?;

        let event = self.store.get_event(metadata.event_id).await?.ok_or_else(|| {
            error!(%reference, event_id = %metadata.event_id, "Verified payment for missing event");
            AppError::NotFound("Event not found".to_string())
        })?;
        let ticket_type = match metadata.ticket_type_id {
            Some(id) => self.store.get_ticket_type(id).await?,
            None => None,
        };

        let amount_mismatch = (verification.amount != metadata.expected_amount).then(|| {
            warn!(
                %reference,
                expected = metadata.expected_amount,
                paid = verification.amount,
                "Verified amount differs from initialized amount"
            );
            AmountMismatch {
                expected: metadata.expected_amount,
                paid: verification.amount,
            }
        });

        let ticket = Ticket {
            id: Uuid::new_v4(),
            event_id: event.id,
            ticket_type_id: ticket_type.as_ref().map(|tt| tt.id),
            attendee_info: sqlx::types::Json(metadata.attendee_info.clone()),
            ticket_code: codes::ticket_code(event.id, reference),
            qr_code_url: String::new(),
            status: TicketStatus::Active,
            amount: from_minor_units(verification.amount),
            oversold: false,
            created_at: Utc::now(),
        };
        let ticket = Ticket {
            qr_code_url: self.config.qr_code_url(&ticket.ticket_code),
            ..ticket
        };

        // The ticket code is derived from the reference, so a conflict means
        // an earlier or concurrent verify already wrote this ticket.
        let ticket = match self.store.insert_ticket(&ticket).await {
            Ok(ticket) => ticket,
            Err(StoreError::Conflict(_)) => {
                if let Some(purchase) = self.store.find_purchase_by_reference(reference).await? {
                    info!(%reference, "Concurrent verification already issued this ticket");
                    return self.already_processed(purchase).await;
                }
                let existing = self
                    .store
                    .get_ticket_by_code(&ticket.ticket_code)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalServerError(format!(
                            "ticket code {} conflicted but no ticket has it",
                            ticket.ticket_code
                        ))
                    })?;
                warn!(
                    %reference,
                    ticket_id = %existing.id,
                    "Ticket exists without a purchase; completing the earlier verification"
                );
                existing
            }
            Err(e) => return Err(e.into()),
        };

        let purchase = match self
            .record_purchase(&ticket, &metadata.attendee_info.email, reference, amount_mismatch)
            .await
        {
            Ok(purchase) => purchase,
            Err(StoreError::Conflict(_)) => {
                return match self.store.find_purchase_by_reference(reference).await? {
                    Some(purchase) => self.already_processed(purchase).await,
                    None => Err(partial_write(
                        &ticket,
                        reference,
                        "purchase conflicted but is missing",
                    )),
                };
            }
            Err(e) => return Err(partial_write(&ticket, reference, e)),
        };
        let oversold = self.record_sale(&ticket, ticket_type.as_ref()).await;
        self.settle(&event, &purchase).await;

        info!(
            event_id = %event.id,
            ticket_id = %ticket.id,
            %reference,
            oversold,
            "Issued paid ticket"
        );
        Ok(VerifyOutcome::Issued(Issued {
            ticket: Ticket { oversold, ..ticket },
            purchase,
            oversold,
            amount_mismatch,
        }))
    }

    async fn open_event(&self, event_id: Uuid, authenticated: bool) -> Result<Event, AppError> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        if !event.is_published {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        if !event.allow_guest_registration && !authenticated {
            return Err(AppError::AuthError(
                "Sign in to register for this event".to_string(),
            ));
        }
        Ok(event)
    }

    async fn on_sale_ticket_type(&self, event: &Event, id: Uuid) -> Result<TicketType, AppError> {
        let tt = self
            .store
            .get_ticket_type(id)
            .await?
            .filter(|tt| tt.event_id == event.id)
            .ok_or_else(|| AppError::NotFound("Ticket type not found".to_string()))?;
        match tt.availability_at(Utc::now()) {
            SaleAvailability::OnSale => Ok(tt),
            other => Err(AppError::Conflict(other.reason().to_string())),
        }
    }

    /// Check-then-act: concurrent registrations can both pass this.
    async fn ensure_capacity(&self, event: &Event) -> Result<(), AppError> {
        if event.max_capacity <= 0 {
            return Ok(());
        }
        let issued = self.store.count_issued_tickets(event.id).await?;
        if !event.has_capacity_for(issued) {
            return Err(AppError::Conflict("This event is full".to_string()));
        }
        Ok(())
    }

    async fn insert_free_ticket(
        &self,
        event: &Event,
        ticket_type: Option<&TicketType>,
        attendee: &AttendeeInfo,
    ) -> Result<(Ticket, String), AppError> {
        let mut last_conflict = None;
        for _ in 0..FREE_CODE_ATTEMPTS {
            let reference = codes::free_reference(Utc::now());
            let ticket_code = codes::ticket_code(event.id, &reference);
            let ticket = Ticket {
                id: Uuid::new_v4(),
                event_id: event.id,
                ticket_type_id: ticket_type.map(|tt| tt.id),
                attendee_info: sqlx::types::Json(attendee.clone()),
                qr_code_url: self.config.qr_code_url(&ticket_code),
                ticket_code,
                status: TicketStatus::Active,
                amount: rust_decimal::Decimal::ZERO,
                oversold: false,
                created_at: Utc::now(),
            };
            match self.store.insert_ticket(&ticket).await {
                Ok(ticket) => return Ok((ticket, reference)),
                Err(StoreError::Conflict(msg)) => {
                    warn!(ticket_code = %ticket.ticket_code, "Ticket code collision, regenerating");
                    last_conflict = Some(msg);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::Conflict(last_conflict.unwrap_or_else(|| {
            "Could not allocate a ticket code".to_string()
        })))
    }

    async fn record_purchase(
        &self,
        ticket: &Ticket,
        email: &str,
        reference: &str,
        mismatch: Option<AmountMismatch>,
    ) -> Result<Purchase, StoreError> {
        let purchase = Purchase {
            id: Uuid::new_v4(),
            event_id: ticket.event_id,
            ticket_id: Some(ticket.id),
            email: email.to_string(),
            amount: ticket.amount,
            expected_amount: mismatch.map(|m| from_minor_units(m.expected)),
            flagged: mismatch.is_some(),
            payment_reference: reference.to_string(),
            payment_status: PaymentStatus::Completed,
            created_at: Utc::now(),
        };
        self.store.insert_purchase(&purchase).await
    }

    /// Counts the sale against the ticket type. A sale past the limit is
    /// still honoured and the ticket is flagged for the organizer.
    async fn record_sale(&self, ticket: &Ticket, ticket_type: Option<&TicketType>) -> bool {
        let Some(tt) = ticket_type else {
            return false;
        };
        match self.store.record_ticket_sale(tt.id).await {
            Ok(true) => false,
            Ok(false) => {
                warn!(
                    ticket_type_id = %tt.id,
                    ticket_id = %ticket.id,
                    "Ticket type oversold"
                );
                if let Err(e) = self.store.mark_ticket_oversold(ticket.id).await {
                    error!(ticket_id = %ticket.id, error = %e, "Failed to flag oversold ticket");
                }
                true
            }
            Err(e) => {
                error!(
                    ticket_type_id = %tt.id,
                    ticket_id = %ticket.id,
                    error = %e,
                    "Failed to count ticket sale; quantity_sold needs reconciliation"
                );
                false
            }
        }
    }

    /// Credits the organizer's wallet. The ledger entry is keyed by the payment
    /// reference so it is written at most once.
    async fn settle(&self, event: &Event, purchase: &Purchase) {
        if purchase.amount.is_zero() {
            return;
        }
        let entry = WalletTransaction {
            id: Uuid::new_v4(),
            user_id: event.user_id,
            kind: WalletTransactionType::Credit,
            amount: purchase.amount,
            description: format!("Ticket sale: {}", event.title),
            status: WalletTransactionStatus::Completed,
            reference: Some(purchase.payment_reference.clone()),
            created_at: Utc::now(),
        };
        match self.store.insert_wallet_transaction(&entry).await {
            Ok(_) | Err(StoreError::Conflict(_)) => {}
            Err(e) => {
                error!(
                    user_id = %event.user_id,
                    reference = %purchase.payment_reference,
                    error = %e,
                    "Failed to credit organizer wallet"
                );
                return;
            }
        }
        if let Err(e) = self.store.refresh_wallet_balance(event.user_id).await {
            error!(user_id = %event.user_id, error = %e, "Failed to refresh wallet balance");
        }
    }

    async fn already_processed(&self, purchase: Purchase) -> Result<VerifyOutcome, AppError> {
        let ticket = match purchase.ticket_id {
            Some(id) => self.store.get_ticket(id).await?,
            None => None,
        };
        Ok(VerifyOutcome::AlreadyProcessed {
            amount_mismatch: AmountMismatch::recorded_on(&purchase),
            ticket,
            purchase,
        })
    }
}

/// Ticket written, purchase not. A later verify of the same reference
/// completes the purchase.
fn partial_write(ticket: &Ticket, reference: &str, cause: impl std::fmt::Display) -> AppError {
    error!(
        ticket_id = %ticket.id,
        ticket_code = %ticket.ticket_code,
        %reference,
        error = %cause,
        "Ticket written without purchase record; needs reconciliation"
    );
    AppError::PartialWrite(format!(
        "ticket {} issued for {reference} but the purchase was not recorded",
        ticket.id
    ))
}
