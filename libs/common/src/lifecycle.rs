//! Alert lifecycle: the authoritative status transition table
//!
//! | From                  | To                                  | Actor    |
//! |-----------------------|-------------------------------------|----------|
//! | pending               | investigating, resolved, rejected   | admin    |
//! | investigating         | resolved, rejected                  | admin    |
//! | pending/investigating | solved                              | reporter |
//!
//! Nothing leaves `resolved`, `rejected` or `solved`. The server runs
//! [`check_transition`] before every status write; the client uses
//! [`is_reachable`] to flag snapshots that appear to move an alert backwards.

use uuid::Uuid;

use crate::error::LifecycleError;
use crate::models::{Alert, AlertStatus, Role};

/// Who is asking for a transition, relative to one alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub is_admin: bool,
    pub is_reporter: bool,
}

impl Actor {
    /// Build the actor for `identity_id` acting on `alert`
    pub fn for_alert(identity_id: Uuid, role: Role, alert: &Alert) -> Self {
        Self {
            is_admin: role == Role::Admin,
            is_reporter: alert.is_reported_by(identity_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permission {
    Admin,
    Reporter,
}

fn edge(from: AlertStatus, to: AlertStatus) -> Option<Permission> {
    use AlertStatus::*;

    match (from, to) {
        (Pending, Investigating | Resolved | Rejected) => Some(Permission::Admin),
        (Investigating, Resolved | Rejected) => Some(Permission::Admin),
        (Pending | Investigating, Solved) => Some(Permission::Reporter),
        _ => None,
    }
}

/// Decide whether `actor` may move an alert from `from` to `to`.
///
/// A missing edge is reported before a missing permission, so requests out of
/// a terminal status are always [`LifecycleError::IllegalTransition`].
pub fn check_transition(
    from: AlertStatus,
    to: AlertStatus,
    actor: Actor,
) -> Result<(), LifecycleError> {
    let permitted = match edge(from, to) {
        None => return Err(LifecycleError::IllegalTransition { from, to }),
        Some(Permission::Admin) => actor.is_admin,
        Some(Permission::Reporter) => actor.is_reporter,
    };

    if permitted {
        Ok(())
    } else {
        Err(LifecycleError::NotPermitted { from, to })
    }
}

/// Targets `actor` may request from `from`, in table order
pub fn allowed_targets(from: AlertStatus, actor: Actor) -> Vec<AlertStatus> {
    AlertStatus::ALL
        .into_iter()
        .filter(|to| check_transition(from, *to, actor).is_ok())
        .collect()
}

/// Whether `to` can follow `from` through zero or more transitions by any actor
pub fn is_reachable(from: AlertStatus, to: AlertStatus) -> bool {
    if from == to || edge(from, to).is_some() {
        return true;
    }
    AlertStatus::ALL
        .into_iter()
        .filter(|mid| *mid != from && edge(from, *mid).is_some())
        .any(|mid| edge(mid, to).is_some())
}
