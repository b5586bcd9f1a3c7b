//! SQLite-backed storage for the booking ledger and the directory.
//!
//! A single connection sits behind a `Mutex`, which makes this process a
//! single-writer serialization point. Every check-then-write runs inside an
//! IMMEDIATE transaction, and the partial unique index on active slots backs
//! both up when several processes share one database file.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use super::repository;
use super::sqlite::{open_database, open_memory_database};
use super::{is_unique_violation, DatabaseError};
use crate::authorization::Principal;
use crate::booking::AppointmentStore;
use crate::directory::{hash_token, Directory};
use crate::models::*;

/// Result of a write that claims a slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotOutcome {
    /// The write went through; carries the row as stored.
    Written(Appointment),
    /// Another active appointment already holds the slot. Nothing was written.
    Occupied,
    /// The appointment disappeared, or the doctor it targets is no longer
    /// an approved doctor. Nothing was written.
    Missing,
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating and migrating if needed) a database file.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    /// Fresh in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Lock the connection for a batch of repository calls.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Run `f` inside an IMMEDIATE transaction; commits on `Ok`, rolls back on `Err`.
    pub fn write_tx<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Map a unique-index rejection to `Occupied`; anything else stays an error.
fn occupied_on_conflict(
    result: Result<SlotOutcome, DatabaseError>,
) -> Result<SlotOutcome, DatabaseError> {
    match result {
        Err(DatabaseError::Sqlite(e)) if is_unique_violation(&e) => Ok(SlotOutcome::Occupied),
        other => other,
    }
}

fn reload(conn: &Connection, id: &Uuid) -> Result<SlotOutcome, DatabaseError> {
    Ok(repository::get_appointment(conn, id)?
        .map(SlotOutcome::Written)
        .unwrap_or(SlotOutcome::Missing))
}

impl AppointmentStore for SqliteStore {
    fn insert_if_slot_free(&self, appt: &Appointment) -> Result<SlotOutcome, DatabaseError> {
        occupied_on_conflict(self.write_tx(|conn| {
            let bookable = repository::get_user(conn, &appt.doctor_id)?
                .is_some_and(|doctor| doctor.is_approved_doctor());
            if !bookable {
                return Ok(SlotOutcome::Missing);
            }
            if repository::find_active_in_slot(conn, &appt.doctor_id, appt.date, &appt.time, None)?
                .is_some()
            {
                return Ok(SlotOutcome::Occupied);
            }
            repository::insert_appointment(conn, appt)?;
            Ok(SlotOutcome::Written(appt.clone()))
        }))
    }

    fn move_if_slot_free(
        &self,
        id: &Uuid,
        date: NaiveDate,
        time: &str,
        at: DateTime<Utc>,
    ) -> Result<SlotOutcome, DatabaseError> {
        occupied_on_conflict(self.write_tx(|conn| {
            let Some(current) = repository::get_appointment(conn, id)? else {
                return Ok(SlotOutcome::Missing);
            };
            if repository::find_active_in_slot(conn, &current.doctor_id, date, time, Some(id))?
                .is_some()
            {
                return Ok(SlotOutcome::Occupied);
            }
            repository::update_appointment_slot(conn, id, date, time, AppointmentStatus::Pending, at)?;
            reload(conn, id)
        }))
    }

    fn set_status(
        &self,
        id: &Uuid,
        status: AppointmentStatus,
        at: DateTime<Utc>,
    ) -> Result<SlotOutcome, DatabaseError> {
        occupied_on_conflict(self.write_tx(|conn| {
            if !repository::update_appointment_status(conn, id, status, at)? {
                return Ok(SlotOutcome::Missing);
            }
            reload(conn, id)
        }))
    }

    fn get(&self, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
        repository::get_appointment(&*self.lock()?, id)
    }

    fn delete(&self, id: &Uuid) -> Result<bool, DatabaseError> {
        repository::delete_appointment(&*self.lock()?, id)
    }

    fn booked_slots(&self, doctor_id: &Uuid) -> Result<Vec<BookedSlot>, DatabaseError> {
        repository::list_booked_slots(&*self.lock()?, doctor_id)
    }

    fn list_for_customer(
        &self,
        customer_id: &Uuid,
    ) -> Result<Vec<AppointmentView>, DatabaseError> {
        repository::list_appointments_for_customer(&*self.lock()?, customer_id)
    }

    fn list_for_doctor(&self, doctor_id: &Uuid) -> Result<Vec<AppointmentView>, DatabaseError> {
        repository::list_appointments_for_doctor(&*self.lock()?, doctor_id)
    }

    fn list_all(&self) -> Result<Vec<AppointmentView>, DatabaseError> {
        repository::list_all_appointments(&*self.lock()?)
    }
}

impl Directory for SqliteStore {
    fn find_user(&self, id: &Uuid) -> Result<Option<User>, DatabaseError> {
        repository::get_user(&*self.lock()?, id)
    }

    fn resolve_token(&self, token: &str) -> Result<Option<Principal>, DatabaseError> {
        let user = repository::get_user_by_token_hash(&*self.lock()?, &hash_token(token))?;
        Ok(user.map(|u| Principal {
            user_id: u.id,
            role: u.role,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_user(store: &SqliteStore, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        let conn = store.lock().unwrap();
        repository::insert_user(&conn, &User {
            id,
            name: "Seed".into(),
            email: format!("{id}@example.com"),
            role,
            approved: true,
            specialty: None,
            location: None,
            availability: None,
            fees: None,
            phone_number: None,
            created_at: Utc::now(),
        })
        .unwrap();
        id
    }

    fn pending(customer: Uuid, doctor: Uuid, time: &str) -> Appointment {
        Appointment::new_pending(
            NewAppointment {
                customer_id: customer,
                doctor_id: doctor,
                date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                time: time.into(),
                document_reference: Some("/uploads/referral.pdf".into()),
            },
            Utc::now(),
        )
    }

    #[test]
    fn insert_then_occupied() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cust = seed_user(&store, Role::Customer);
        let doc = seed_user(&store, Role::Doctor);

        let first = pending(cust, doc, "10:00");
        assert_eq!(
            store.insert_if_slot_free(&first).unwrap(),
            SlotOutcome::Written(first.clone())
        );
        let second = pending(cust, doc, "10:00");
        assert_eq!(store.insert_if_slot_free(&second).unwrap(), SlotOutcome::Occupied);
        assert!(store.get(&second.id).unwrap().is_none());
    }

    #[test]
    fn insert_for_revoked_doctor_is_missing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cust = seed_user(&store, Role::Customer);
        let doc = seed_user(&store, Role::Doctor);
        repository::set_user_approval(&store.lock().unwrap(), &doc, false).unwrap();

        let appt = pending(cust, doc, "10:00");
        assert_eq!(store.insert_if_slot_free(&appt).unwrap(), SlotOutcome::Missing);
        assert!(store.get(&appt.id).unwrap().is_none());
    }

    #[test]
    fn move_resets_status_and_excludes_self() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cust = seed_user(&store, Role::Customer);
        let doc = seed_user(&store, Role::Doctor);
        let appt = pending(cust, doc, "10:00");
        store.insert_if_slot_free(&appt).unwrap();
        store.set_status(&appt.id, AppointmentStatus::Scheduled, Utc::now()).unwrap();

        match store.move_if_slot_free(&appt.id, appt.date, "10:00", Utc::now()).unwrap() {
            SlotOutcome::Written(moved) => assert_eq!(moved.status, AppointmentStatus::Pending),
            other => panic!("Expected Written, got: {other:?}"),
        }
    }

    #[test]
    fn move_of_missing_appointment() {
        let store = SqliteStore::open_in_memory().unwrap();
        let outcome = store
            .move_if_slot_free(
                &Uuid::new_v4(),
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                "10:00",
                Utc::now(),
            )
            .unwrap();
        assert_eq!(outcome, SlotOutcome::Missing);
    }

    #[test]
    fn reactivating_into_taken_slot_is_occupied() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cust = seed_user(&store, Role::Customer);
        let doc = seed_user(&store, Role::Doctor);
        let old = pending(cust, doc, "10:00");
        store.insert_if_slot_free(&old).unwrap();
        store.set_status(&old.id, AppointmentStatus::Cancelled, Utc::now()).unwrap();
        let new = pending(cust, doc, "10:00");
        store.insert_if_slot_free(&new).unwrap();

        let outcome = store.set_status(&old.id, AppointmentStatus::Pending, Utc::now()).unwrap();
        assert_eq!(outcome, SlotOutcome::Occupied);
        let old_row = store.get(&old.id).unwrap().unwrap();
        assert_eq!(old_row.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn two_stores_on_one_file_never_double_book() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let a = SqliteStore::open(&path).unwrap();
        let b = SqliteStore::open(&path).unwrap();
        let cust = seed_user(&a, Role::Customer);
        let doc = seed_user(&a, Role::Doctor);

        let results: Vec<SlotOutcome> = std::thread::scope(|s| {
            let ha = s.spawn(|| a.insert_if_slot_free(&pending(cust, doc, "10:00")).unwrap());
            let hb = s.spawn(|| b.insert_if_slot_free(&pending(cust, doc, "10:00")).unwrap());
            vec![ha.join().unwrap(), hb.join().unwrap()]
        });

        let written = results
            .iter()
            .filter(|o| matches!(o, SlotOutcome::Written(_)))
            .count();
        assert_eq!(written, 1);
        assert_eq!(a.booked_slots(&doc).unwrap().len(), 1);
    }

    #[test]
    fn resolve_unknown_token_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.resolve_token("nope").unwrap().is_none());
    }
}
