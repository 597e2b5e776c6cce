use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Free,
    Paid,
    Donation,
}

/// A registration question configured by the organizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub event_type: EventType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub timezone: Option<String>,
    pub is_online: bool,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub meeting_link: Option<String>,
    pub max_capacity: i32,
    pub is_published: bool,
    pub slug: String,
    pub banner_image: Option<String>,
    pub gallery_images: Json<Vec<String>>,
    pub requires_approval: bool,
    pub allow_guest_registration: bool,
    pub custom_fields: Json<Vec<CustomField>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Start instant, treating the stored wall-clock date and time as UTC.
    /// A missing start time means midnight.
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        let date = self.start_date?;
        let time = self.start_time.or_else(|| NaiveTime::from_hms_opt(0, 0, 0))?;
        Some(NaiveDateTime::new(date, time).and_utc())
    }

    /// End instant. Falls back to the end of the start day when no end is set.
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        let date = self.end_date.or(self.start_date)?;
        let time = match (self.end_date, self.end_time) {
            (_, Some(time)) => time,
            _ => NaiveTime::from_hms_opt(23, 59, 59)?,
        };
        Some(NaiveDateTime::new(date, time).and_utc())
    }

    /// `max_capacity` of zero means unlimited.
    pub fn has_capacity_for(&self, issued: i64) -> bool {
        self.max_capacity <= 0 || issued < i64::from(self.max_capacity)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_unlimited() {
        let event = fixtures::event(Uuid::new_v4());
        assert!(event.has_capacity_for(0));
        assert!(event.has_capacity_for(1_000_000));
    }

    #[test]
    fn positive_capacity_is_enforced() {
        let mut event = fixtures::event(Uuid::new_v4());
        event.max_capacity = 2;
        assert!(event.has_capacity_for(1));
        assert!(!event.has_capacity_for(2));
    }

    #[test]
    fn end_defaults_to_end_of_start_day() {
        let event = fixtures::event(Uuid::new_v4());
        let ends = event.ends_at().unwrap();
        assert_eq!(ends.date_naive(), NaiveDate::from_ymd_opt(2030, 5, 1).unwrap());
        assert!(ends > event.starts_at().unwrap());
    }

    #[test]
    fn custom_field_type_uses_external_name() {
        let field: CustomField = serde_json::from_value(serde_json::json!({
            "id": "shirt",
            "label": "Shirt size",
            "type": "select",
            "options": ["S", "M"]
        }))
        .unwrap();
        assert_eq!(field.field_type, "select");
        assert!(!field.required);
    }
}
