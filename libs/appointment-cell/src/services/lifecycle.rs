// libs/appointment-cell/src/services/lifecycle.rs
//
// The only place that decides which status changes and edits are legal.
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus, FollowUpStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentAction {
    Edit,
    Approve,
    Reject,
    Complete,
    Cancel,
}

impl AppointmentAction {
    pub(crate) fn verb(&self) -> &'static str {
        match self {
            AppointmentAction::Edit => "edit",
            AppointmentAction::Approve => "approve",
            AppointmentAction::Reject => "reject",
            AppointmentAction::Complete => "complete",
            AppointmentAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpAction {
    Edit,
    Complete,
    Cancel,
}

impl FollowUpAction {
    pub(crate) fn verb(&self) -> &'static str {
        match self {
            FollowUpAction::Edit => "edit",
            FollowUpAction::Complete => "complete",
            FollowUpAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Status an appointment ends up in after `action`, or `InvalidTransition`.
    /// `Edit` keeps the status and is only legal while pending.
    pub fn apply(
        &self,
        current: AppointmentStatus,
        action: AppointmentAction,
    ) -> Result<AppointmentStatus, AppointmentError> {
        let next = next_status(current, action);

        match next {
            Some(status) => {
                debug!("Appointment transition validated: {} --{}--> {}", current, action.verb(), status);
                Ok(status)
            }
            None => {
                warn!("Invalid appointment transition attempted: {} --{}-->", current, action.verb());
                Err(AppointmentError::InvalidTransition {
                    entity: "appointment",
                    from: current.to_string(),
                    action: action.verb(),
                })
            }
        }
    }

    /// Actions legal from `current`, in a fixed order.
    pub fn get_valid_actions(&self, current: AppointmentStatus) -> Vec<AppointmentAction> {
        [
            AppointmentAction::Edit,
            AppointmentAction::Approve,
            AppointmentAction::Reject,
            AppointmentAction::Complete,
            AppointmentAction::Cancel,
        ]
        .into_iter()
        .filter(|action| next_status(current, *action).is_some())
        .collect()
    }

    pub fn apply_follow_up(
        &self,
        current: FollowUpStatus,
        action: FollowUpAction,
    ) -> Result<FollowUpStatus, AppointmentError> {
        let next = match (current, action) {
            (FollowUpStatus::Pending, FollowUpAction::Edit) => Some(FollowUpStatus::Pending),
            (FollowUpStatus::Pending, FollowUpAction::Complete) => Some(FollowUpStatus::Completed),
            (FollowUpStatus::Pending, FollowUpAction::Cancel) => Some(FollowUpStatus::Cancelled),
            _ => None,
        };

        next.ok_or_else(|| {
            warn!("Invalid follow-up transition attempted: {} --{}-->", current, action.verb());
            AppointmentError::InvalidTransition {
                entity: "follow-up session",
                from: current.to_string(),
                action: action.verb(),
            }
        })
    }

    /// A completed appointment is the only valid root for a follow-up chain.
    pub fn can_own_follow_ups(&self, status: AppointmentStatus) -> bool {
        status == AppointmentStatus::Completed
    }
}

fn next_status(current: AppointmentStatus, action: AppointmentAction) -> Option<AppointmentStatus> {
    use AppointmentAction::*;
    use AppointmentStatus::*;

    match (current, action) {
        (Pending, Edit) => Some(Pending),
        (Pending, Approve) => Some(Approved),
        (Pending, Reject) => Some(Rejected),
        (Pending, Cancel) | (Approved, Cancel) => Some(Cancelled),
        (Approved, Complete) => Some(Completed),
        _ => None,
    }
}
