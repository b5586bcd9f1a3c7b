//! Appointment endpoints.
//!
//! - `GET /api/appointments` — the caller's appointments as a customer
//! - `GET /api/appointments/doctor` — the caller's appointments as a doctor
//! - `GET /api/appointments/doctor/:doctor_id/booked-slots` — occupied slots
//! - `POST /api/appointments` — request a new appointment
//! - `PATCH /api/appointments/:id` — update status
//! - `PUT /api/appointments/:id` — reschedule
//! - `DELETE /api/appointments/:id` — cancel (hard delete)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{
    authorize, parse_date, parse_id, ApiContext, AppointmentResponse, AppointmentsResponse,
    BookRequest, BookedSlotsResponse, MessageResponse, RescheduleBody, StatusRequest,
};
use crate::authorization::{Action, Principal};
use crate::booking::RescheduleRequest;

/// `GET /api/appointments` — appointments booked by the calling customer.
pub async fn list_mine(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    authorize(&principal, Action::ListOwnAsCustomer)?;
    let appointments = ctx.core.ledger().list_for_customer(&principal.user_id)?;
    Ok(Json(AppointmentsResponse { appointments }))
}

/// `GET /api/appointments/doctor` — the calling doctor's calendar.
pub async fn list_for_doctor(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    authorize(&principal, Action::ListOwnAsDoctor)?;
    let appointments = ctx.core.ledger().list_for_doctor(&principal.user_id)?;
    Ok(Json(AppointmentsResponse { appointments }))
}

pub async fn booked_slots(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(doctor_id): Path<String>,
) -> Result<Json<BookedSlotsResponse>, ApiError> {
    authorize(&principal, Action::ListBookedSlots)?;
    let doctor_id = parse_id(&doctor_id)?;
    let slots = ctx.core.ledger().list_booked_slots(&doctor_id)?;
    Ok(Json(BookedSlotsResponse { doctor_id, slots }))
}

/// `POST /api/appointments` — book a slot with an approved doctor.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let Json(request) = payload?;
    let doctor_id = parse_id(&request.doctor_id)?;
    let date = parse_date(&request.date)?;
    let document_reference = request
        .document_reference
        .filter(|reference| !reference.trim().is_empty());

    let appointment = ctx.core.ledger().request_appointment(
        &principal,
        &doctor_id,
        date,
        &request.time,
        document_reference,
    )?;
    Ok((StatusCode::CREATED, Json(AppointmentResponse { appointment })))
}

/// `PATCH /api/appointments/:id` — set a new status.
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id = parse_id(&appointment_id)?;
    let Json(request) = payload?;
    let appointment = ctx
        .core
        .ledger()
        .update_status(&id, &principal, &request.status)?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// `PUT /api/appointments/:id` — move to a new date and/or time.
pub async fn reschedule(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<String>,
    payload: Result<Json<RescheduleBody>, JsonRejection>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id = parse_id(&appointment_id)?;
    let Json(body) = payload?;
    let request = RescheduleRequest {
        date: body.date.as_deref().map(parse_date).transpose()?,
        time: body.time,
    };
    let appointment = ctx.core.ledger().reschedule(&id, &principal, request)?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// `DELETE /api/appointments/:id` — remove the appointment.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&appointment_id)?;
    ctx.core.ledger().cancel(&id, &principal)?;
    Ok(Json(MessageResponse {
        message: "Appointment cancelled".into(),
    }))
}
