use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Role;

/// Directory record. Doctor profile fields are empty for other roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approved: bool,
    pub specialty: Option<String>,
    pub location: Option<String>,
    pub availability: Option<String>,
    pub fees: Option<f64>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_approved_doctor(&self) -> bool {
        self.role == Role::Doctor && self.approved
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub specialty: Option<String>,
    pub location: Option<String>,
    pub availability: Option<String>,
    pub fees: Option<f64>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approved: bool,
    #[serde(flatten)]
    pub profile: DoctorProfile,
}
