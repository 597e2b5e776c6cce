use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity_available: i32,
    pub quantity_sold: i32,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a ticket type can or cannot take a new sale right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleAvailability {
    OnSale,
    Inactive,
    NotStarted,
    Ended,
    SoldOut,
}

impl SaleAvailability {
    pub fn reason(self) -> &'static str {
        match self {
            SaleAvailability::OnSale => "on sale",
            SaleAvailability::Inactive => "this ticket type is not active",
            SaleAvailability::NotStarted => "sales for this ticket type have not started",
            SaleAvailability::Ended => "sales for this ticket type have ended",
            SaleAvailability::SoldOut => "this ticket type is sold out",
        }
    }
}

impl TicketType {
    pub fn availability_at(&self, now: DateTime<Utc>) -> SaleAvailability {
        if !self.is_active {
            return SaleAvailability::Inactive;
        }
        if self.sale_start.is_some_and(|start| now < start) {
            return SaleAvailability::NotStarted;
        }
        if self.sale_end.is_some_and(|end| now > end) {
            return SaleAvailability::Ended;
        }
        if self.quantity_sold >= self.quantity_available {
            return SaleAvailability::SoldOut;
        }
        SaleAvailability::OnSale
    }

    pub fn remaining(&self) -> i32 {
        (self.quantity_available - self.quantity_sold).max(0)
    }

    /// Price in the gateway's minor currency unit (kobo for NGN).
    pub fn price_minor(&self) -> Option<i64> {
        crate::utils::money::to_minor_units(self.price)
    }
}

/// Attendee details captured at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AttendeeInfo {
    #[validate(length(min = 1, message = "attendee name is required"))]
    pub name: String,
    #[validate(email(message = "attendee email is not a valid email address"))]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, alias = "customFields", skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Used,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub ticket_type_id: Option<Uuid>,
    pub attendee_info: Json<AttendeeInfo>,
    pub ticket_code: String,
    pub qr_code_url: String,
    pub status: TicketStatus,
    pub amount: Decimal,
    /// Issued after the ticket type had already reached its quantity.
    pub oversold: bool,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn counts_as_attendee(&self) -> bool {
        self.status != TicketStatus::Cancelled
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn availability_checks_in_order() {
        let now = Utc::now();
        let mut tt = fixtures::ticket_type(Uuid::new_v4(), Decimal::ZERO, 10);
        assert_eq!(tt.availability_at(now), SaleAvailability::OnSale);

        tt.sale_start = Some(now + Duration::hours(1));
        assert_eq!(tt.availability_at(now), SaleAvailability::NotStarted);

        tt.sale_start = None;
        tt.sale_end = Some(now - Duration::hours(1));
        assert_eq!(tt.availability_at(now), SaleAvailability::Ended);

        tt.sale_end = None;
        tt.quantity_sold = 10;
        assert_eq!(tt.availability_at(now), SaleAvailability::SoldOut);
        assert_eq!(tt.remaining(), 0);

        tt.is_active = false;
        assert_eq!(tt.availability_at(now), SaleAvailability::Inactive);
    }

    #[test]
    fn attendee_accepts_custom_fields_alias() {
        let info: AttendeeInfo = serde_json::from_value(serde_json::json!({
            "name": "Ada",
            "email": "ada@example.com",
            "customFields": { "shirt": "M" }
        }))
        .unwrap();
        assert_eq!(info.responses.get("shirt"), Some(&serde_json::json!("M")));
    }
}
