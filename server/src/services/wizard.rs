//! Event-creation wizard steps.
//!
//! The front end asks for the step list on every render instead of keeping
//! its own step state, so the list always agrees with the answers so far.

use serde::{Deserialize, Serialize};

use crate::models::EventType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    Basics,
    Schedule,
    Location,
    Tickets,
    Donation,
    CustomFields,
    Review,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub event_type: Option<EventType>,
    #[serde(default)]
    pub ticket_type_count: usize,
    #[serde(default)]
    pub wants_custom_fields: bool,
}

pub fn plan_steps(state: &WizardState) -> Vec<WizardStep> {
    let mut steps = vec![WizardStep::Basics, WizardStep::Schedule, WizardStep::Location];

    let free_without_tiers =
        state.event_type == Some(EventType::Free) && state.ticket_type_count == 0;
    if !free_without_tiers {
        steps.push(WizardStep::Tickets);
    }
    if state.event_type == Some(EventType::Donation) {
        steps.push(WizardStep::Donation);
    }
    if state.wants_custom_fields {
        steps.push(WizardStep::CustomFields);
    }
    steps.push(WizardStep::Review);
    steps
}
