use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, customer_id, doctor_id, date, time, status,
     document_reference, created_at, updated_at";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let status: String = row.get(5)?;
    Ok(Appointment {
        id: parse_uuid(row, 0)?,
        customer_id: parse_uuid(row, 1)?,
        doctor_id: parse_uuid(row, 2)?,
        date: row.get(3)?,
        time: row.get(4)?,
        status: status.parse::<AppointmentStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                e.to_string().into(),
            )
        })?,
        document_reference: row.get(6)?,
        created_at: parse_timestamp(row, 7)?,
        updated_at: parse_timestamp(row, 8)?,
    })
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, customer_id, doctor_id, date, time, status,
                                   document_reference, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            appt.id.to_string(),
            appt.customer_id.to_string(),
            appt.doctor_id.to_string(),
            appt.date.to_string(),
            appt.time,
            appt.status.as_str(),
            appt.document_reference,
            appt.created_at.to_rfc3339(),
            appt.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let appt = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_from_row,
        )
        .optional()?;
    Ok(appt)
}

/// Find the active appointment holding (doctor, date, time), ignoring `exclude`.
pub fn find_active_in_slot(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    time: &str,
    exclude: Option<&Uuid>,
) -> Result<Option<Uuid>, DatabaseError> {
    let exclude = exclude.map(|id| id.to_string()).unwrap_or_default();
    let holder = conn
        .query_row(
            "SELECT id FROM appointments
             WHERE doctor_id = ?1 AND date = ?2 AND time = ?3
               AND status IN ('pending', 'scheduled')
               AND id != ?4
             LIMIT 1",
            params![doctor_id.to_string(), date.to_string(), time, exclude],
            |row| parse_uuid(row, 0),
        )
        .optional()?;
    Ok(holder)
}

/// Move an appointment to a new date/time with the given status. Returns false if absent.
pub fn update_appointment_slot(
    conn: &Connection,
    id: &Uuid,
    date: NaiveDate,
    time: &str,
    status: AppointmentStatus,
    updated_at: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET date = ?2, time = ?3, status = ?4, updated_at = ?5
         WHERE id = ?1",
        params![
            id.to_string(),
            date.to_string(),
            time,
            status.as_str(),
            updated_at.to_rfc3339(),
        ],
    )?;
    Ok(changed > 0)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
    updated_at: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), updated_at.to_rfc3339()],
    )?;
    Ok(changed > 0)
}

pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM appointments WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(deleted > 0)
}

pub fn delete_appointments_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM appointments WHERE doctor_id = ?1",
        params![doctor_id.to_string()],
    )?;
    Ok(deleted)
}

/// Active (date, time) pairs on a doctor's calendar, oldest first.
pub fn list_booked_slots(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<BookedSlot>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT date, time FROM appointments
         WHERE doctor_id = ?1 AND status IN ('pending', 'scheduled')
         ORDER BY date ASC, time ASC",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string()], |row| {
        Ok(BookedSlot {
            date: row.get(0)?,
            time: row.get(1)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Listing query: appointment columns, then customer and doctor summaries.
const VIEW_SELECT: &str = "SELECT a.id, a.customer_id, a.doctor_id, a.date, a.time, a.status,
            a.document_reference, a.created_at, a.updated_at,
            c.name, c.email, d.name, d.email, d.specialty
     FROM appointments a
     JOIN users c ON c.id = a.customer_id
     JOIN users d ON d.id = a.doctor_id";

fn view_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentView> {
    let appointment = appointment_from_row(row)?;
    Ok(AppointmentView {
        customer: PartySummary {
            id: appointment.customer_id,
            name: row.get(9)?,
            email: row.get(10)?,
            specialty: None,
        },
        doctor: PartySummary {
            id: appointment.doctor_id,
            name: row.get(11)?,
            email: row.get(12)?,
            specialty: row.get(13)?,
        },
        appointment,
    })
}

pub fn list_appointments_for_customer(
    conn: &Connection,
    customer_id: &Uuid,
) -> Result<Vec<AppointmentView>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{VIEW_SELECT} WHERE a.customer_id = ?1 ORDER BY a.date ASC, a.time ASC"
    ))?;
    let rows = stmt.query_map(params![customer_id.to_string()], view_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn list_appointments_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<AppointmentView>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{VIEW_SELECT} WHERE a.doctor_id = ?1 ORDER BY a.date ASC, a.time ASC"
    ))?;
    let rows = stmt.query_map(params![doctor_id.to_string()], view_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn list_all_appointments(conn: &Connection) -> Result<Vec<AppointmentView>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{VIEW_SELECT} ORDER BY a.created_at DESC"))?;
    let rows = stmt.query_map([], view_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
