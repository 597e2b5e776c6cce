//! Event CRUD.
//!
//! Requests use the web client's camelCase names; [`EventPayload`] maps them
//! onto the stored snake_case row. Responses return the stored row.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use tracing::info;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::UserScope;
use crate::auth::SessionUser;
use crate::models::{CustomField, Event, EventType, TicketType};
use crate::state::AppState;
use crate::utils::codes::{is_valid_slug, slugify};
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};
use crate::utils::validation::require_non_empty;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub event_type: Option<EventType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub timezone: Option<String>,
    pub is_online: Option<bool>,
    #[serde(alias = "venue")]
    pub venue_name: Option<String>,
    #[serde(alias = "address")]
    pub venue_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub meeting_link: Option<String>,
    pub max_capacity: Option<i32>,
    pub is_published: Option<bool>,
    pub slug: Option<String>,
    #[serde(alias = "bannerUrl")]
    pub banner_image: Option<String>,
    pub gallery_images: Option<Vec<String>>,
    pub requires_approval: Option<bool>,
    pub allow_guest_registration: Option<bool>,
    pub custom_fields: Option<Vec<CustomField>>,
}

impl EventPayload {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            require_non_empty(title, "title")?;
        }
        if self.max_capacity.is_some_and(|c| c < 0) {
            return Err(AppError::ValidationError(
                "maxCapacity cannot be negative".to_string(),
            ));
        }
        if let Some(slug) = &self.slug {
            if !is_valid_slug(slug) {
                return Err(AppError::ValidationError(
                    "slug may only contain lowercase letters, digits and single dashes".to_string(),
                ));
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(AppError::ValidationError(
                    "endDate cannot be before startDate".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn into_new_event(self, owner: Uuid, now: DateTime<Utc>) -> Result<Event, AppError> {
        self.validate()?;
        let title = self
            .title
            .clone()
            .ok_or_else(|| AppError::ValidationError("title is required".to_string()))?;
        let slug = self.slug.clone().unwrap_or_else(|| slugify(&title));

        let mut event = Event {
            id: Uuid::new_v4(),
            user_id: owner,
            title,
            description: None,
            category: None,
            event_type: EventType::Free,
            start_date: None,
            end_date: None,
            start_time: None,
            end_time: None,
            timezone: None,
            is_online: false,
            venue_name: None,
            venue_address: None,
            city: None,
            state: None,
            country: None,
            meeting_link: None,
            max_capacity: 0,
            is_published: false,
            slug,
            banner_image: None,
            gallery_images: Json(Vec::new()),
            requires_approval: false,
            allow_guest_registration: true,
            custom_fields: Json(Vec::new()),
            created_at: now,
            updated_at: now,
        };
        self.apply(&mut event, now)?;
        Ok(event)
    }

    /// Field renaming only; absent fields keep their stored value.
    pub fn apply(self, event: &mut Event, now: DateTime<Utc>) -> Result<(), AppError> {
        self.validate()?;
        if let Some(v) = self.title {
            event.title = v.trim().to_string();
        }
        if self.description.is_some() {
            event.description = self.description;
        }
        if self.category.is_some() {
            event.category = self.category;
        }
        if let Some(v) = self.event_type {
            event.event_type = v;
        }
        if self.start_date.is_some() {
            event.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            event.end_date = self.end_date;
        }
        if self.start_time.is_some() {
            event.start_time = self.start_time;
        }
        if self.end_time.is_some() {
            event.end_time = self.end_time;
        }
        if self.timezone.is_some() {
            event.timezone = self.timezone;
        }
        if let Some(v) = self.is_online {
            event.is_online = v;
        }
        if self.venue_name.is_some() {
            event.venue_name = self.venue_name;
        }
        if self.venue_address.is_some() {
            event.venue_address = self.venue_address;
        }
        if self.city.is_some() {
            event.city = self.city;
        }
        if self.state.is_some() {
            event.state = self.state;
        }
        if self.country.is_some() {
            event.country = self.country;
        }
        if self.meeting_link.is_some() {
            event.meeting_link = self.meeting_link;
        }
        if let Some(v) = self.max_capacity {
            event.max_capacity = v;
        }
        if let Some(v) = self.is_published {
            event.is_published = v;
        }
        if let Some(v) = self.slug {
            event.slug = v;
        }
        if self.banner_image.is_some() {
            event.banner_image = self.banner_image;
        }
        if let Some(v) = self.gallery_images {
            event.gallery_images = Json(v);
        }
        if let Some(v) = self.requires_approval {
            event.requires_approval = v;
        }
        if let Some(v) = self.allow_guest_registration {
            event.allow_guest_registration = v;
        }
        if let Some(v) = self.custom_fields {
            event.custom_fields = Json(v);
        }
        event.updated_at = now;
        Ok(())
    }
}

/// Public view of a published event with the ticket types on offer.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicEvent {
    #[serde(flatten)]
    event: Event,
    ticket_types: Vec<TicketType>,
}

async fn owned_event(state: &AppState, session: &SessionUser, id: Uuid) -> Result<Event, AppError> {
    let event = state
        .store
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    session.ensure_owns(event.user_id, "event")?;
    Ok(event)
}

pub async fn list_events(
    State(state): State<AppState>,
    session: Option<SessionUser>,
    ApiQuery(scope): ApiQuery<UserScope>,
) -> Result<Response, AppError> {
    let events = match scope.user_id {
        Some(_) => {
            let session = session.ok_or_else(|| AppError::AuthError("Unauthorized".to_string()))?;
            let user_id = scope.authorize(&session)?;
            state.store.list_events_by_owner(user_id).await?
        }
        None => state.store.list_published_events().await?,
    };
    Ok(success(events, "Events retrieved successfully").into_response())
}

pub async fn create_event(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(payload): ApiJson<EventPayload>,
) -> Result<Response, AppError> {
    let event = payload.into_new_event(session.user_id, Utc::now())?;
    let event = state.store.insert_event(&event).await?;
    info!(event_id = %event.id, user_id = %session.user_id, "Event created");
    Ok(created(event, "Event created successfully").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let event = owned_event(&state, &session, id).await?;
    Ok(success(event, "Event retrieved successfully").into_response())
}

pub async fn update_event(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<EventPayload>,
) -> Result<Response, AppError> {
    let mut event = owned_event(&state, &session, id).await?;
    payload.apply(&mut event, Utc::now())?;
    let event = state.store.update_event(&event).await?;
    info!(event_id = %event.id, user_id = %session.user_id, "Event updated");
    Ok(success(event, "Event updated successfully").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let event = owned_event(&state, &session, id).await?;
    if state.store.count_issued_tickets(event.id).await? > 0 {
        return Err(AppError::Conflict(
            "Cannot delete an event that has registrations".to_string(),
        ));
    }
    state.store.delete_event(event.id).await?;
    info!(event_id = %event.id, user_id = %session.user_id, "Event deleted");
    Ok(empty_success("Event deleted successfully").into_response())
}

pub async fn get_event_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .get_published_event_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    let ticket_types = state
        .store
        .list_ticket_types_by_events(&[event.id])
        .await?
        .into_iter()
        .filter(|tt| tt.is_active)
        .collect();
    Ok(success(PublicEvent { event, ticket_types }, "Event retrieved successfully").into_response())
}
