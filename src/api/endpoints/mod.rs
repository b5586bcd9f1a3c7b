//! API endpoint handlers.
//!
//! One module per resource. Handlers translate HTTP input into ledger and
//! directory calls and wrap the results in response DTOs.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod health;
