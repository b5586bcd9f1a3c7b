//! Shared types for the HTTP API layer.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::authorization::{self, Action, Principal};
use crate::core_state::CoreState;
use crate::models::{Appointment, AppointmentView, BookedSlot, DoctorProfile, Role, User};

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Refuse with 403 unless `principal` may perform a non-ownership `action`.
pub fn authorize(principal: &Principal, action: Action) -> Result<(), ApiError> {
    if authorization::is_allowed(principal, action, None) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Role {} may not perform this action",
            principal.role
        )))
    }
}

/// Parse a path segment as a UUID.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid ID format: {raw}")))
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date (expected YYYY-MM-DD): {raw}")))
}

// ═══════════════════════════════════════════════════════════
// Request bodies
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(flatten)]
    pub profile: DoctorProfile,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub doctor_id: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub document_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RescheduleBody {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
}

// ═══════════════════════════════════════════════════════════
// Response bodies
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub token: String,
}

/// A freshly minted bearer token. The plain value is only ever shown here.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub appointment: Appointment,
}

#[derive(Debug, Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<AppointmentView>,
}

#[derive(Debug, Serialize)]
pub struct BookedSlotsResponse {
    pub doctor_id: Uuid,
    pub slots: Vec<BookedSlot>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct DoctorsResponse {
    pub doctors: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct DoctorResponse {
    pub doctor: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
