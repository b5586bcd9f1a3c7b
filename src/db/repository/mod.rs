//! Repository layer — entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`, one sub-module per table
//! group. Transactions and locking live one level up in `db::store`.

mod appointment;
mod user;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

pub use appointment::*;
pub use user::*;

fn conversion_error(idx: usize, reason: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, reason.into())
}

/// Read a TEXT column holding a hyphenated UUID.
pub(crate) fn parse_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, format!("bad uuid {raw}: {e}")))
}

/// Read a TEXT column holding an RFC 3339 timestamp.
pub(crate) fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp {raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::db::sqlite::open_memory_database;
    use crate::db::{is_unique_violation, DatabaseError};
    use crate::models::*;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_user(conn: &Connection, role: Role, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        insert_user(conn, &User {
            id,
            name: format!("User {email}"),
            email: email.into(),
            role,
            approved: role == Role::Doctor,
            specialty: (role == Role::Doctor).then(|| "Cardiology".to_string()),
            location: None,
            availability: Some("Mon-Fri 09:00-17:00".into()),
            fees: (role == Role::Doctor).then_some(80.0),
            phone_number: None,
            created_at: Utc::now(),
        }).unwrap();
        id
    }

    fn make_appointment(
        conn: &Connection,
        customer: Uuid,
        doctor: Uuid,
        date: &str,
        time: &str,
        status: AppointmentStatus,
    ) -> Uuid {
        let mut appt = Appointment::new_pending(
            NewAppointment {
                customer_id: customer,
                doctor_id: doctor,
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                time: time.into(),
                document_reference: None,
            },
            Utc::now(),
        );
        appt.status = status;
        insert_appointment(conn, &appt).unwrap();
        appt.id
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn user_insert_and_retrieve() {
        let conn = test_db();
        let id = make_user(&conn, Role::Doctor, "doc@example.com");
        let user = get_user(&conn, &id).unwrap().unwrap();
        assert_eq!(user.role, Role::Doctor);
        assert!(user.approved);
        assert_eq!(user.specialty.as_deref(), Some("Cardiology"));
        assert_eq!(user.fees, Some(80.0));
    }

    #[test]
    fn duplicate_email_is_unique_violation() {
        let conn = test_db();
        make_user(&conn, Role::Customer, "same@example.com");
        let err = insert_user(&conn, &User {
            id: Uuid::new_v4(),
            name: "Other".into(),
            email: "same@example.com".into(),
            role: Role::Customer,
            approved: false,
            specialty: None,
            location: None,
            availability: None,
            fees: None,
            phone_number: None,
            created_at: Utc::now(),
        })
        .unwrap_err();
        match err {
            DatabaseError::Sqlite(e) => assert!(is_unique_violation(&e)),
            other => panic!("Expected SQLite error, got: {other}"),
        }
    }

    #[test]
    fn list_doctors_respects_approval_filter() {
        let conn = test_db();
        let approved = make_user(&conn, Role::Doctor, "a@example.com");
        let pending = make_user(&conn, Role::Doctor, "b@example.com");
        make_user(&conn, Role::Customer, "c@example.com");
        set_user_approval(&conn, &pending, false).unwrap();

        let all = list_doctors(&conn, false).unwrap();
        assert_eq!(all.len(), 2);
        let live = list_doctors(&conn, true).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, approved);
    }

    #[test]
    fn token_hash_resolves_to_user() {
        let conn = test_db();
        let id = make_user(&conn, Role::Customer, "c@example.com");
        let hash = [7u8; 32];
        insert_token(&conn, &hash, &id, Utc::now()).unwrap();
        let user = get_user_by_token_hash(&conn, &hash).unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(get_user_by_token_hash(&conn, &[8u8; 32]).unwrap().is_none());
    }

    #[test]
    fn appointment_insert_and_retrieve() {
        let conn = test_db();
        let cust = make_user(&conn, Role::Customer, "c@example.com");
        let doc = make_user(&conn, Role::Doctor, "d@example.com");
        let id = make_appointment(&conn, cust, doc, "2024-06-01", "10:00", AppointmentStatus::Pending);

        let appt = get_appointment(&conn, &id).unwrap().unwrap();
        assert_eq!(appt.customer_id, cust);
        assert_eq!(appt.doctor_id, doc);
        assert_eq!(appt.date, day("2024-06-01"));
        assert_eq!(appt.time, "10:00");
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert!(get_appointment(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn active_slot_index_rejects_second_active_row() {
        let conn = test_db();
        let cust = make_user(&conn, Role::Customer, "c@example.com");
        let doc = make_user(&conn, Role::Doctor, "d@example.com");
        make_appointment(&conn, cust, doc, "2024-06-01", "10:00", AppointmentStatus::Scheduled);

        let dup = Appointment::new_pending(
            NewAppointment {
                customer_id: cust,
                doctor_id: doc,
                date: day("2024-06-01"),
                time: "10:00".into(),
                document_reference: None,
            },
            Utc::now(),
        );
        match insert_appointment(&conn, &dup).unwrap_err() {
            DatabaseError::Sqlite(e) => assert!(is_unique_violation(&e)),
            other => panic!("Expected SQLite error, got: {other}"),
        }
    }

    #[test]
    fn inactive_rows_do_not_hold_the_slot() {
        let conn = test_db();
        let cust = make_user(&conn, Role::Customer, "c@example.com");
        let doc = make_user(&conn, Role::Doctor, "d@example.com");
        make_appointment(&conn, cust, doc, "2024-06-01", "10:00", AppointmentStatus::Cancelled);
        make_appointment(&conn, cust, doc, "2024-06-01", "10:00", AppointmentStatus::Completed);
        let active = make_appointment(&conn, cust, doc, "2024-06-01", "10:00", AppointmentStatus::Pending);

        let holder = find_active_in_slot(&conn, &doc, day("2024-06-01"), "10:00", None).unwrap();
        assert_eq!(holder, Some(active));
        let excluded =
            find_active_in_slot(&conn, &doc, day("2024-06-01"), "10:00", Some(&active)).unwrap();
        assert_eq!(excluded, None);
    }

    #[test]
    fn booked_slots_only_active_and_ordered() {
        let conn = test_db();
        let cust = make_user(&conn, Role::Customer, "c@example.com");
        let doc = make_user(&conn, Role::Doctor, "d@example.com");
        make_appointment(&conn, cust, doc, "2024-06-02", "09:00", AppointmentStatus::Scheduled);
        make_appointment(&conn, cust, doc, "2024-06-01", "11:00", AppointmentStatus::Pending);
        make_appointment(&conn, cust, doc, "2024-06-01", "09:00", AppointmentStatus::Cancelled);

        let slots = list_booked_slots(&conn, &doc).unwrap();
        assert_eq!(
            slots,
            vec![
                BookedSlot { date: day("2024-06-01"), time: "11:00".into() },
                BookedSlot { date: day("2024-06-02"), time: "09:00".into() },
            ]
        );
    }

    #[test]
    fn customer_listing_is_date_then_time_ordered() {
        let conn = test_db();
        let cust = make_user(&conn, Role::Customer, "c@example.com");
        let doc = make_user(&conn, Role::Doctor, "d@example.com");
        make_appointment(&conn, cust, doc, "2024-07-01", "08:00", AppointmentStatus::Pending);
        make_appointment(&conn, cust, doc, "2024-06-01", "14:00", AppointmentStatus::Pending);
        make_appointment(&conn, cust, doc, "2024-06-01", "09:30", AppointmentStatus::Pending);

        let listed: Vec<(NaiveDate, String)> = list_appointments_for_customer(&conn, &cust)
            .unwrap()
            .into_iter()
            .map(|v| (v.appointment.date, v.appointment.time))
            .collect();
        assert_eq!(
            listed,
            vec![
                (day("2024-06-01"), "09:30".to_string()),
                (day("2024-06-01"), "14:00".to_string()),
                (day("2024-07-01"), "08:00".to_string()),
            ]
        );
        let for_doctor = list_appointments_for_doctor(&conn, &doc).unwrap();
        assert_eq!(for_doctor.len(), 3);
        assert_eq!(for_doctor[0].customer.email, "c@example.com");
        assert_eq!(for_doctor[0].doctor.specialty.as_deref(), Some("Cardiology"));
        assert_eq!(list_all_appointments(&conn).unwrap().len(), 3);
    }

    #[test]
    fn update_slot_and_status_report_missing_rows() {
        let conn = test_db();
        let missing = Uuid::new_v4();
        assert!(!update_appointment_status(&conn, &missing, AppointmentStatus::Scheduled, Utc::now()).unwrap());
        assert!(!update_appointment_slot(
            &conn,
            &missing,
            day("2024-06-01"),
            "10:00",
            AppointmentStatus::Pending,
            Utc::now(),
        )
        .unwrap());
        assert!(!delete_appointment(&conn, &missing).unwrap());
    }

    #[test]
    fn deleting_doctor_appointments_leaves_others() {
        let conn = test_db();
        let cust = make_user(&conn, Role::Customer, "c@example.com");
        let doc_a = make_user(&conn, Role::Doctor, "a@example.com");
        let doc_b = make_user(&conn, Role::Doctor, "b@example.com");
        make_appointment(&conn, cust, doc_a, "2024-06-01", "10:00", AppointmentStatus::Pending);
        make_appointment(&conn, cust, doc_a, "2024-06-02", "10:00", AppointmentStatus::Cancelled);
        make_appointment(&conn, cust, doc_b, "2024-06-01", "10:00", AppointmentStatus::Pending);

        assert_eq!(delete_appointments_for_doctor(&conn, &doc_a).unwrap(), 2);
        assert_eq!(list_all_appointments(&conn).unwrap().len(), 1);
    }
}
