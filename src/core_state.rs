//! Shared application state behind the HTTP boundary.
//!
//! `CoreState` owns the single `SqliteStore` and the two services built on
//! it. It is wrapped in `Arc` at startup and handed to the router.

use std::sync::Arc;

use crate::authorization::Principal;
use crate::booking::BookingLedger;
use crate::config::ServerConfig;
use crate::db::{self, SqliteStore};
use crate::directory::{Directory, DirectoryError, DirectoryService};
use crate::models::{DoctorProfile, NewUser, Role, User};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    store: Arc<SqliteStore>,
    ledger: BookingLedger,
    directory: DirectoryService,
}

impl CoreState {
    /// Open the database named by `config`, creating its parent directory.
    pub fn open(config: &ServerConfig) -> Result<Self, CoreError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = SqliteStore::open(&config.db_path)?;
        tracing::info!(path = %config.db_path.display(), "Database opened");
        Ok(Self::from_store(Arc::new(store)))
    }

    /// In-memory state (for testing).
    pub fn in_memory() -> Result<Self, CoreError> {
        Ok(Self::from_store(Arc::new(SqliteStore::open_in_memory()?)))
    }

    pub fn from_store(store: Arc<SqliteStore>) -> Self {
        Self {
            ledger: BookingLedger::new(store.clone(), store.clone()),
            directory: DirectoryService::new(store.clone()),
            store,
        }
    }

    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    /// Resolve a bearer token to its principal.
    pub fn resolve_token(&self, token: &str) -> Result<Option<Principal>, CoreError> {
        Ok(self.store.resolve_token(token)?)
    }

    /// Ensure an admin account exists for `email` and accepts `token`.
    pub fn bootstrap_admin(&self, email: &str, token: &str) -> Result<User, CoreError> {
        let admin = match self.directory.find_by_email(email)? {
            Some(user) if user.role == Role::Admin => user,
            Some(user) => {
                return Err(CoreError::Bootstrap(format!(
                    "{email} is registered with role {}",
                    user.role
                )));
            }
            None => self.directory.create_user(NewUser {
                name: "Administrator".into(),
                email: email.into(),
                role: Role::Admin,
                approved: true,
                profile: DoctorProfile::default(),
            })?,
        };
        self.directory.register_token(&admin.id, token)?;
        tracing::info!(user_id = %admin.id, "Admin account ready");
        Ok(admin)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Admin bootstrap failed: {0}")]
    Bootstrap(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
