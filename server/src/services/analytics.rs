//! Dashboard and attendee statistics.
//!
//! Everything here works on rows already loaded for one organizer; the
//! handlers do the fetching.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Event, Purchase, Ticket, TicketStatus};

pub const RECENT_EVENTS_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPhase {
    Upcoming,
    Active,
    Completed,
    /// No schedule set yet.
    Unscheduled,
}

pub fn phase_at(event: &Event, now: DateTime<Utc>) -> EventPhase {
    match (event.starts_at(), event.ends_at()) {
        (Some(start), _) if start > now => EventPhase::Upcoming,
        (Some(_), Some(end)) if end < now => EventPhase::Completed,
        (Some(_), _) => EventPhase::Active,
        (None, _) => EventPhase::Unscheduled,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRollup {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub phase: EventPhase,
    pub is_published: bool,
    pub attendees: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_events: usize,
    pub published_events: usize,
    pub upcoming_events: usize,
    pub active_events: usize,
    pub completed_events: usize,
    pub total_attendees: i64,
    pub total_revenue: Decimal,
    pub recent_events: Vec<EventRollup>,
}

struct Totals {
    attendees: HashMap<Uuid, i64>,
    revenue: HashMap<Uuid, Decimal>,
}

fn totals(tickets: &[Ticket], purchases: &[Purchase]) -> Totals {
    let mut attendees = HashMap::new();
    for ticket in tickets.iter().filter(|t| t.counts_as_attendee()) {
        *attendees.entry(ticket.event_id).or_insert(0) += 1;
    }
    let mut revenue = HashMap::new();
    for purchase in purchases {
        *revenue.entry(purchase.event_id).or_insert(Decimal::ZERO) += purchase.amount;
    }
    Totals { attendees, revenue }
}

/// Most recent start date first; unscheduled events last; ties by newest creation.
fn by_recency(a: &Event, b: &Event) -> std::cmp::Ordering {
    match (a.starts_at(), b.starts_at()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
    .then_with(|| b.created_at.cmp(&a.created_at))
    .then_with(|| a.id.cmp(&b.id))
}

/// `purchases` should already be restricted to completed payments.
pub fn dashboard(
    events: &[Event],
    tickets: &[Ticket],
    purchases: &[Purchase],
    now: DateTime<Utc>,
    limit: usize,
) -> DashboardStats {
    let totals = totals(tickets, purchases);
    let mut stats = DashboardStats {
        total_events: events.len(),
        published_events: events.iter().filter(|e| e.is_published).count(),
        upcoming_events: 0,
        active_events: 0,
        completed_events: 0,
        total_attendees: totals.attendees.values().sum(),
        total_revenue: totals.revenue.values().copied().sum(),
        recent_events: Vec::new(),
    };

    for event in events {
        match phase_at(event, now) {
            EventPhase::Upcoming => stats.upcoming_events += 1,
            EventPhase::Active => stats.active_events += 1,
            EventPhase::Completed => stats.completed_events += 1,
            EventPhase::Unscheduled => {}
        }
    }

    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| by_recency(a, b));
    stats.recent_events = ordered
        .into_iter()
        .take(limit)
        .map(|event| EventRollup {
            id: event.id,
            title: event.title.clone(),
            slug: event.slug.clone(),
            starts_at: event.starts_at(),
            phase: phase_at(event, now),
            is_published: event.is_published,
            attendees: totals.attendees.get(&event.id).copied().unwrap_or(0),
            revenue: totals.revenue.get(&event.id).copied().unwrap_or(Decimal::ZERO),
        })
        .collect();

    stats
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendance {
    pub event_id: Uuid,
    pub title: String,
    pub attendees: i64,
    pub checked_in: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeStats {
    pub total_attendees: i64,
    pub checked_in: i64,
    pub cancelled: i64,
    pub registered_today: i64,
    pub registered_this_week: i64,
    pub oversold: i64,
    pub by_event: Vec<EventAttendance>,
}

pub fn attendee_stats(events: &[Event], tickets: &[Ticket], now: DateTime<Utc>) -> AttendeeStats {
    let today = now.date_naive();
    let week_ago = now - Duration::days(7);
    let mut stats = AttendeeStats {
        total_attendees: 0,
        checked_in: 0,
        cancelled: 0,
        registered_today: 0,
        registered_this_week: 0,
        oversold: 0,
        by_event: Vec::new(),
    };
    let mut per_event: HashMap<Uuid, (i64, i64)> = HashMap::new();

    for ticket in tickets {
        if ticket.status == TicketStatus::Cancelled {
            stats.cancelled += 1;
            continue;
        }
        let entry = per_event.entry(ticket.event_id).or_insert((0, 0));
        entry.0 += 1;
        stats.total_attendees += 1;
        if ticket.status == TicketStatus::Used {
            stats.checked_in += 1;
            entry.1 += 1;
        }
        if ticket.oversold {
            stats.oversold += 1;
        }
        if ticket.created_at.date_naive() == today {
            stats.registered_today += 1;
        }
        if ticket.created_at >= week_ago {
            stats.registered_this_week += 1;
        }
    }

    stats.by_event = events
        .iter()
        .map(|event| {
            let (attendees, checked_in) = per_event.get(&event.id).copied().unwrap_or((0, 0));
            EventAttendance {
                event_id: event.id,
                title: event.title.clone(),
                attendees,
                checked_in,
            }
        })
        .collect();
    stats.by_event.sort_by(|a, b| b.attendees.cmp(&a.attendees).then(a.title.cmp(&b.title)));
    stats
}
