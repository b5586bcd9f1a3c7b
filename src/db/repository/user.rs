use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str = "id, name, email, role, approved, specialty, location,
     availability, fees, phone_number, created_at";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: parse_uuid(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: role.parse::<Role>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                e.to_string().into(),
            )
        })?,
        approved: row.get::<_, i64>(4)? != 0,
        specialty: row.get(5)?,
        location: row.get(6)?,
        availability: row.get(7)?,
        fees: row.get(8)?,
        phone_number: row.get(9)?,
        created_at: parse_timestamp(row, 10)?,
    })
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, email, role, approved, specialty, location,
                            availability, fees, phone_number, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.role.as_str(),
            user.approved as i64,
            user.specialty,
            user.location,
            user.availability,
            user.fees,
            user.phone_number,
            user.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.to_string()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map([], user_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Doctors, optionally restricted to approved accounts.
pub fn list_doctors(conn: &Connection, approved_only: bool) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE role = 'doctor' AND (?1 = 0 OR approved = 1)
         ORDER BY name ASC"
    ))?;
    let rows = stmt.query_map(params![approved_only as i64], user_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn set_user_approval(conn: &Connection, id: &Uuid, approved: bool) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET approved = ?2 WHERE id = ?1",
        params![id.to_string(), approved as i64],
    )?;
    Ok(changed > 0)
}

pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    Ok(deleted > 0)
}

pub fn insert_token(
    conn: &Connection,
    token_hash: &[u8; 32],
    user_id: &Uuid,
    created_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO api_tokens (token_hash, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![&token_hash[..], user_id.to_string(), created_at.to_rfc3339()],
    )?;
    Ok(())
}

/// Look up the owner of a token hash.
pub fn get_user_by_token_hash(
    conn: &Connection,
    token_hash: &[u8; 32],
) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            "SELECT u.id, u.name, u.email, u.role, u.approved, u.specialty, u.location,
                    u.availability, u.fees, u.phone_number, u.created_at
             FROM api_tokens t JOIN users u ON u.id = t.user_id
             WHERE t.token_hash = ?1",
            params![&token_hash[..]],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}
