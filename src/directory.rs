//! Directory: users, roles, doctor approval, and bearer tokens.
//!
//! The booking ledger only reads from the directory through the
//! `Directory` trait. Writes (registration, approval, doctor removal)
//! go through `DirectoryService` and are exposed to admins only.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::authorization::Principal;
use crate::db::{is_unique_violation, repository, DatabaseError, SqliteStore};
use crate::models::*;

/// Read-only identity lookups consumed by the booking ledger.
pub trait Directory: Send + Sync {
    fn find_user(&self, id: &Uuid) -> Result<Option<User>, DatabaseError>;

    /// Resolve a bearer token to the principal it was issued to.
    fn resolve_token(&self, token: &str) -> Result<Option<Principal>, DatabaseError>;

    fn is_approved_doctor(&self, id: &Uuid) -> Result<bool, DatabaseError> {
        Ok(self
            .find_user(id)?
            .is_some_and(|user| user.is_approved_doctor()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("User {0} is not a doctor")]
    NotADoctor(Uuid),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Token is already attached to another user")]
    TokenInUse,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// Token helpers
// ═══════════════════════════════════════════════════════════

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ═══════════════════════════════════════════════════════════
// Directory service
// ═══════════════════════════════════════════════════════════

pub struct DirectoryService {
    store: Arc<SqliteStore>,
}

impl DirectoryService {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    pub fn create_user(&self, new_user: NewUser) -> Result<User, DirectoryError> {
        let user = new_record(new_user);
        match repository::insert_user(&*self.store.lock()?, &user) {
            Ok(()) => {}
            Err(DatabaseError::Sqlite(e)) if is_unique_violation(&e) => {
                return Err(DirectoryError::DuplicateEmail(user.email));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Create an account together with its first bearer token.
    ///
    /// Both rows are written in one transaction: a failed token insert
    /// leaves no account behind.
    pub fn register(&self, new_user: NewUser) -> Result<(User, String), DirectoryError> {
        let user = new_record(new_user);
        let token = generate_token();
        let created = self.store.write_tx(|conn| {
            match repository::insert_user(conn, &user) {
                Err(DatabaseError::Sqlite(e)) if is_unique_violation(&e) => return Ok(false),
                other => other?,
            }
            repository::insert_token(conn, &hash_token(&token), &user.id, user.created_at)?;
            Ok(true)
        })?;
        if !created {
            return Err(DirectoryError::DuplicateEmail(user.email));
        }
        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok((user, token))
    }

    /// Mint a new bearer token for `user_id`. The plain token is returned once.
    pub fn issue_token(&self, user_id: &Uuid) -> Result<String, DirectoryError> {
        let conn = self.store.lock()?;
        if repository::get_user(&conn, user_id)?.is_none() {
            return Err(DirectoryError::NotFound { entity: "User", id: *user_id });
        }
        let token = generate_token();
        repository::insert_token(&conn, &hash_token(&token), user_id, Utc::now())?;
        tracing::info!(user_id = %user_id, "Bearer token issued");
        Ok(token)
    }

    /// Attach a caller-chosen token to a user (admin bootstrap).
    ///
    /// Re-attaching to the same user is a no-op. A token already held by
    /// another user is refused.
    pub fn register_token(&self, user_id: &Uuid, token: &str) -> Result<(), DirectoryError> {
        let conn = self.store.lock()?;
        let hash = hash_token(token);
        match repository::get_user_by_token_hash(&conn, &hash)? {
            Some(owner) if owner.id == *user_id => Ok(()),
            Some(_) => Err(DirectoryError::TokenInUse),
            None => {
                repository::insert_token(&conn, &hash, user_id, Utc::now())?;
                Ok(())
            }
        }
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        Ok(repository::get_user_by_email(&*self.store.lock()?, email)?)
    }

    pub fn list_users(&self) -> Result<Vec<User>, DirectoryError> {
        Ok(repository::list_users(&*self.store.lock()?)?)
    }

    pub fn list_doctors(&self, approved_only: bool) -> Result<Vec<User>, DirectoryError> {
        Ok(repository::list_doctors(&*self.store.lock()?, approved_only)?)
    }

    pub fn get_doctor(&self, id: &Uuid) -> Result<User, DirectoryError> {
        let user = repository::get_user(&*self.store.lock()?, id)?;
        match user {
            Some(user) if user.role == Role::Doctor => Ok(user),
            _ => Err(DirectoryError::NotFound { entity: "Doctor", id: *id }),
        }
    }

    /// Approve or revoke a doctor account.
    pub fn set_doctor_approval(&self, id: &Uuid, approved: bool) -> Result<User, DirectoryError> {
        let conn = self.store.lock()?;
        let mut doctor = require_doctor(&conn, id)?;
        repository::set_user_approval(&conn, id, approved)?;
        doctor.approved = approved;
        tracing::info!(doctor_id = %id, approved, "Doctor approval updated");
        Ok(doctor)
    }

    /// Remove a doctor and every appointment on their calendar.
    pub fn delete_doctor(&self, id: &Uuid) -> Result<usize, DirectoryError> {
        let removed = self.store.write_tx(|conn| {
            match repository::get_user(conn, id)? {
                None => return Ok(Err(DirectoryError::NotFound { entity: "User", id: *id })),
                Some(user) if user.role != Role::Doctor => {
                    return Ok(Err(DirectoryError::NotADoctor(*id)));
                }
                Some(_) => {}
            }
            let removed = repository::delete_appointments_for_doctor(conn, id)?;
            repository::delete_user(conn, id)?;
            Ok(Ok(removed))
        })??;
        tracing::info!(doctor_id = %id, appointments_removed = removed, "Doctor deleted");
        Ok(removed)
    }
}

fn new_record(new_user: NewUser) -> User {
    User {
        id: Uuid::new_v4(),
        name: new_user.name,
        email: new_user.email,
        role: new_user.role,
        approved: new_user.approved,
        specialty: new_user.profile.specialty,
        location: new_user.profile.location,
        availability: new_user.profile.availability,
        fees: new_user.profile.fees,
        phone_number: new_user.profile.phone_number,
        created_at: Utc::now(),
    }
}

fn require_doctor(conn: &rusqlite::Connection, id: &Uuid) -> Result<User, DirectoryError> {
    let user = repository::get_user(conn, id)?
        .ok_or(DirectoryError::NotFound { entity: "User", id: *id })?;
    if user.role != Role::Doctor {
        return Err(DirectoryError::NotADoctor(*id));
    }
    Ok(user)
}
