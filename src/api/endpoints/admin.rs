//! Admin endpoints. Every handler checks `ManageDirectory` or `ListAll`.
//!
//! - `GET /api/admin/users`
//! - `POST /api/admin/users/:id/tokens` — mint a replacement bearer token
//! - `GET /api/admin/doctors` — approved or not
//! - `PATCH /api/admin/doctors/:id/status` — approve / revoke
//! - `DELETE /api/admin/doctors/:id` — doctor and their appointments
//! - `GET /api/admin/appointments`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{
    authorize, parse_id, ApiContext, ApprovalRequest, AppointmentsResponse, DoctorResponse,
    DoctorsResponse, MessageResponse, TokenResponse, UsersResponse,
};
use crate::authorization::{Action, Principal};

pub async fn users(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<UsersResponse>, ApiError> {
    authorize(&principal, Action::ManageDirectory)?;
    let users = ctx.core.directory().list_users()?;
    Ok(Json(UsersResponse { users }))
}

pub async fn issue_token(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    authorize(&principal, Action::ManageDirectory)?;
    let user_id = parse_id(&user_id)?;
    let token = ctx.core.directory().issue_token(&user_id)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { user_id, token })))
}

pub async fn doctors(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<DoctorsResponse>, ApiError> {
    authorize(&principal, Action::ManageDirectory)?;
    let doctors = ctx.core.directory().list_doctors(false)?;
    Ok(Json(DoctorsResponse { doctors }))
}

pub async fn set_doctor_status(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(doctor_id): Path<String>,
    payload: Result<Json<ApprovalRequest>, JsonRejection>,
) -> Result<Json<DoctorResponse>, ApiError> {
    authorize(&principal, Action::ManageDirectory)?;
    let id = parse_id(&doctor_id)?;
    let Json(request) = payload?;
    let doctor = ctx.core.directory().set_doctor_approval(&id, request.approved)?;
    Ok(Json(DoctorResponse { doctor }))
}

pub async fn delete_doctor(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(doctor_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize(&principal, Action::ManageDirectory)?;
    let id = parse_id(&doctor_id)?;
    let removed = ctx.core.directory().delete_doctor(&id)?;
    Ok(Json(MessageResponse {
        message: format!("Doctor deleted along with {removed} appointment(s)"),
    }))
}

pub async fn appointments(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    authorize(&principal, Action::ListAll)?;
    let appointments = ctx.core.ledger().list_all()?;
    Ok(Json(AppointmentsResponse { appointments }))
}
