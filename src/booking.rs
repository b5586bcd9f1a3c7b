//! Booking ledger: appointment slot booking and the status lifecycle.
//!
//! Guarantees at most one active (pending/scheduled) appointment per
//! (doctor, date, time). The check-and-write for a slot is delegated to
//! `AppointmentStore`, which must perform it atomically.
//!
//! Lifecycle:
//! - create → `pending`
//! - doctor/admin → any status; customer → `cancelled` on their own
//! - reschedule → new date/time, back to `pending` for re-confirmation
//! - delete → row removed (customer on their own, or admin)

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::authorization::{self, Action, Parties, Principal};
use crate::db::{DatabaseError, SlotOutcome};
use crate::directory::Directory;
use crate::models::*;

// ═══════════════════════════════════════════════════════════
// Storage seam
// ═══════════════════════════════════════════════════════════

/// Appointment storage consumed by the ledger.
///
/// `insert_if_slot_free`, `move_if_slot_free` and `set_status` must check
/// and write as one atomic unit with respect to each other.
pub trait AppointmentStore: Send + Sync {
    /// Insert `appt` unless another active appointment holds its slot.
    /// Returns `Missing` when the target is not an approved doctor at write time.
    fn insert_if_slot_free(&self, appt: &Appointment) -> Result<SlotOutcome, DatabaseError>;

    /// Move appointment `id` to (date, time) and reset it to pending,
    /// unless a different active appointment holds that slot.
    fn move_if_slot_free(
        &self,
        id: &Uuid,
        date: NaiveDate,
        time: &str,
        at: DateTime<Utc>,
    ) -> Result<SlotOutcome, DatabaseError>;

    /// Overwrite the status of appointment `id`.
    fn set_status(
        &self,
        id: &Uuid,
        status: AppointmentStatus,
        at: DateTime<Utc>,
    ) -> Result<SlotOutcome, DatabaseError>;

    fn get(&self, id: &Uuid) -> Result<Option<Appointment>, DatabaseError>;

    /// Hard delete. Returns false if the row was already gone.
    fn delete(&self, id: &Uuid) -> Result<bool, DatabaseError>;

    fn booked_slots(&self, doctor_id: &Uuid) -> Result<Vec<BookedSlot>, DatabaseError>;

    fn list_for_customer(
        &self,
        customer_id: &Uuid,
    ) -> Result<Vec<AppointmentView>, DatabaseError>;

    fn list_for_doctor(&self, doctor_id: &Uuid) -> Result<Vec<AppointmentView>, DatabaseError>;

    fn list_all(&self) -> Result<Vec<AppointmentView>, DatabaseError>;
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(
        "The slot {date} {time} is already booked for this doctor. \
         Please choose another date or time."
    )]
    SlotConflict { date: NaiveDate, time: String },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl BookingError {
    fn appointment_not_found(id: &Uuid) -> Self {
        Self::NotFound {
            entity: "Appointment",
            id: *id,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Ledger
// ═══════════════════════════════════════════════════════════

/// Optional new slot values for a reschedule; `None` keeps the current one.
#[derive(Debug, Clone, Default)]
pub struct RescheduleRequest {
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
}

pub struct BookingLedger {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn Directory>,
}

impl BookingLedger {
    pub fn new(store: Arc<dyn AppointmentStore>, directory: Arc<dyn Directory>) -> Self {
        Self { store, directory }
    }

    fn require(
        principal: &Principal,
        action: Action,
        parties: Option<&Parties>,
        denial: &str,
    ) -> Result<(), BookingError> {
        if authorization::is_allowed(principal, action, parties) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %principal.user_id,
                role = %principal.role,
                ?action,
                "Booking action refused"
            );
            Err(BookingError::Forbidden(denial.to_string()))
        }
    }

    fn load(&self, id: &Uuid) -> Result<Appointment, BookingError> {
        self.store
            .get(id)?
            .ok_or_else(|| BookingError::appointment_not_found(id))
    }

    fn validate_time(time: &str) -> Result<(), BookingError> {
        if time.trim().is_empty() {
            return Err(BookingError::InvalidTarget("time slot must not be empty".into()));
        }
        Ok(())
    }

    /// Book a slot for `customer`. Fails with `SlotConflict` if taken.
    pub fn request_appointment(
        &self,
        customer: &Principal,
        doctor_id: &Uuid,
        date: NaiveDate,
        time: &str,
        document_reference: Option<String>,
    ) -> Result<Appointment, BookingError> {
        Self::require(
            customer,
            Action::RequestAppointment,
            None,
            "Only customers can request appointments.",
        )?;
        Self::validate_time(time)?;
        if !self.directory.is_approved_doctor(doctor_id)? {
            return Err(BookingError::InvalidTarget(format!(
                "{doctor_id} is not an approved doctor"
            )));
        }

        let appt = Appointment::new_pending(
            NewAppointment {
                customer_id: customer.user_id,
                doctor_id: *doctor_id,
                date,
                time: time.to_string(),
                document_reference,
            },
            Utc::now(),
        );

        match self.store.insert_if_slot_free(&appt)? {
            SlotOutcome::Written(created) => {
                tracing::info!(
                    appointment_id = %created.id,
                    doctor_id = %created.doctor_id,
                    date = %created.date,
                    time = %created.time,
                    "Appointment requested"
                );
                Ok(created)
            }
            SlotOutcome::Missing => Err(BookingError::InvalidTarget(format!(
                "{doctor_id} is not an approved doctor"
            ))),
            SlotOutcome::Occupied => {
                tracing::warn!(doctor_id = %doctor_id, %date, time = %time, "Slot already booked");
                Err(BookingError::SlotConflict {
                    date,
                    time: time.to_string(),
                })
            }
        }
    }

    /// Move an appointment to a new slot; status returns to `pending`.
    pub fn reschedule(
        &self,
        appointment_id: &Uuid,
        requester: &Principal,
        request: RescheduleRequest,
    ) -> Result<Appointment, BookingError> {
        let current = self.load(appointment_id)?;
        Self::require(
            requester,
            Action::Reschedule,
            Some(&Parties::from(&current)),
            "Not authorized to reschedule this appointment.",
        )?;

        let date = request.date.unwrap_or(current.date);
        let time = request.time.unwrap_or_else(|| current.time.clone());
        Self::validate_time(&time)?;

        match self
            .store
            .move_if_slot_free(appointment_id, date, &time, Utc::now())?
        {
            SlotOutcome::Written(moved) => {
                tracing::info!(
                    appointment_id = %moved.id,
                    from = %format!("{} {}", current.date, current.time),
                    to = %format!("{} {}", moved.date, moved.time),
                    "Appointment rescheduled"
                );
                Ok(moved)
            }
            SlotOutcome::Occupied => {
                tracing::warn!(
                    appointment_id = %appointment_id,
                    %date,
                    time = %time,
                    "Reschedule target taken"
                );
                Err(BookingError::SlotConflict { date, time })
            }
            SlotOutcome::Missing => Err(BookingError::appointment_not_found(appointment_id)),
        }
    }

    /// Overwrite the status. `requested` is the raw value from the caller.
    pub fn update_status(
        &self,
        appointment_id: &Uuid,
        requester: &Principal,
        requested: &str,
    ) -> Result<Appointment, BookingError> {
        let current = self.load(appointment_id)?;
        let parsed = requested.parse::<AppointmentStatus>().ok();
        let denial = match requester.role {
            Role::Customer => "Customers can only cancel their own appointments.",
            _ => "Not authorized to update this appointment.",
        };
        Self::require(
            requester,
            Action::for_status(parsed),
            Some(&Parties::from(&current)),
            denial,
        )?;
        let status = parsed.ok_or_else(|| BookingError::InvalidStatus(requested.to_string()))?;

        match self.store.set_status(appointment_id, status, Utc::now())? {
            SlotOutcome::Written(updated) => {
                tracing::info!(
                    appointment_id = %updated.id,
                    from = %current.status,
                    to = %updated.status,
                    by = %requester.role,
                    "Appointment status updated"
                );
                Ok(updated)
            }
            SlotOutcome::Occupied => Err(BookingError::SlotConflict {
                date: current.date,
                time: current.time,
            }),
            SlotOutcome::Missing => Err(BookingError::appointment_not_found(appointment_id)),
        }
    }

    /// Permanently remove an appointment.
    pub fn cancel(&self, appointment_id: &Uuid, requester: &Principal) -> Result<(), BookingError> {
        let current = self.load(appointment_id)?;
        Self::require(
            requester,
            Action::Delete,
            Some(&Parties::from(&current)),
            "Not authorized to cancel this appointment.",
        )?;
        if !self.store.delete(appointment_id)? {
            return Err(BookingError::appointment_not_found(appointment_id));
        }
        tracing::info!(appointment_id = %appointment_id, by = %requester.role, "Appointment deleted");
        Ok(())
    }

    /// Occupied slots on a doctor's calendar. Advisory: booking re-checks.
    pub fn list_booked_slots(&self, doctor_id: &Uuid) -> Result<Vec<BookedSlot>, BookingError> {
        match self.directory.find_user(doctor_id)? {
            Some(user) if user.role == Role::Doctor => Ok(self.store.booked_slots(doctor_id)?),
            _ => Err(BookingError::NotFound {
                entity: "Doctor",
                id: *doctor_id,
            }),
        }
    }

    pub fn list_for_customer(
        &self,
        customer_id: &Uuid,
    ) -> Result<Vec<AppointmentView>, BookingError> {
        Ok(self.store.list_for_customer(customer_id)?)
    }

    pub fn list_for_doctor(
        &self,
        doctor_id: &Uuid,
    ) -> Result<Vec<AppointmentView>, BookingError> {
        Ok(self.store.list_for_doctor(doctor_id)?)
    }

    pub fn list_all(&self) -> Result<Vec<AppointmentView>, BookingError> {
        Ok(self.store.list_all()?)
    }
}
