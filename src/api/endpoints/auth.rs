//! Account registration.
//!
//! `POST /api/auth/register` — Unprotected: creates a customer or doctor
//! account and returns its first bearer token.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, RegisterRequest, RegisterResponse};
use crate::models::{NewUser, Role};

pub async fn register(
    State(ctx): State<ApiContext>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(request) = payload?;

    if request.role == Role::Admin {
        return Err(ApiError::Forbidden(
            "Admin accounts cannot be self-registered".into(),
        ));
    }
    let name = request.name.trim();
    let email = request.email.trim().to_lowercase();
    if name.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A name and a valid email are required".into()));
    }

    let (user, token) = ctx.core.directory().register(NewUser {
        name: name.to_string(),
        email,
        role: request.role,
        approved: false,
        profile: request.profile,
    })?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user, token })))
}
