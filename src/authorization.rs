//! Role × action authorization table for the booking service.
//!
//! Every permission is a row in `AUTHORIZATION_TABLE`. A row holds one
//! `Rule` per role, in `Role::column()` order (customer, doctor, admin).
//! Ownership rules are resolved against the appointment's parties.
//!
//! Default-deny: an action missing from the table is refused.

use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, Role};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Authenticated caller as resolved by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

/// Something a principal may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    RequestAppointment,
    Reschedule,
    /// UpdateStatus with `cancelled`.
    CancelStatus,
    /// UpdateStatus with any other value.
    ChangeStatus,
    Delete,
    ListBookedSlots,
    ListOwnAsCustomer,
    ListOwnAsDoctor,
    ListAll,
    ManageDirectory,
}

impl Action {
    /// Which status action a requested status falls under. Unknown values
    /// count as a non-cancel change.
    pub fn for_status(requested: Option<AppointmentStatus>) -> Self {
        match requested {
            Some(AppointmentStatus::Cancelled) => Self::CancelStatus,
            _ => Self::ChangeStatus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Allow,
    Deny,
    /// Requester must be the appointment's customer.
    OwnCustomer,
    /// Requester must be the appointment's doctor.
    OwnDoctor,
}

/// The two parties of an appointment, for ownership rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parties {
    pub customer_id: Uuid,
    pub doctor_id: Uuid,
}

impl From<&Appointment> for Parties {
    fn from(appt: &Appointment) -> Self {
        Self {
            customer_id: appt.customer_id,
            doctor_id: appt.doctor_id,
        }
    }
}

impl Role {
    /// Column of this role in `AUTHORIZATION_TABLE`.
    pub fn column(self) -> usize {
        match self {
            Role::Customer => 0,
            Role::Doctor => 1,
            Role::Admin => 2,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Table
// ═══════════════════════════════════════════════════════════

use Rule::{Allow, Deny, OwnCustomer, OwnDoctor};

/// Columns: customer, doctor, admin.
pub static AUTHORIZATION_TABLE: &[(Action, [Rule; 3])] = &[
    (Action::RequestAppointment, [Allow, Deny, Deny]),
    (Action::Reschedule, [OwnCustomer, Deny, Allow]),
    (Action::CancelStatus, [OwnCustomer, OwnDoctor, Allow]),
    (Action::ChangeStatus, [Deny, OwnDoctor, Allow]),
    (Action::Delete, [OwnCustomer, Deny, Allow]),
    (Action::ListBookedSlots, [Allow, Allow, Allow]),
    (Action::ListOwnAsCustomer, [Allow, Deny, Deny]),
    (Action::ListOwnAsDoctor, [Deny, Allow, Deny]),
    (Action::ListAll, [Deny, Deny, Allow]),
    (Action::ManageDirectory, [Deny, Deny, Allow]),
];

/// Look up the rule for `role` performing `action`.
pub fn rule_for(role: Role, action: Action) -> Rule {
    AUTHORIZATION_TABLE
        .iter()
        .find(|(a, _)| *a == action)
        .map(|(_, rules)| rules[role.column()])
        .unwrap_or(Deny)
}

// ═══════════════════════════════════════════════════════════
// Checks
// ═══════════════════════════════════════════════════════════

/// Decide whether `principal` may perform `action`.
///
/// Ownership rules need `parties`; without them they deny.
pub fn is_allowed(principal: &Principal, action: Action, parties: Option<&Parties>) -> bool {
    match rule_for(principal.role, action) {
        Allow => true,
        Deny => false,
        OwnCustomer => parties.is_some_and(|p| p.customer_id == principal.user_id),
        OwnDoctor => parties.is_some_and(|p| p.doctor_id == principal.user_id),
    }
}
