//! Public doctor catalogue.
//!
//! - `GET /api/doctors` — approved doctors
//! - `GET /api/doctors/:id` — one doctor by id

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, DoctorResponse, DoctorsResponse};

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<DoctorsResponse>, ApiError> {
    let doctors = ctx.core.directory().list_doctors(true)?;
    Ok(Json(DoctorsResponse { doctors }))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(doctor_id): Path<String>,
) -> Result<Json<DoctorResponse>, ApiError> {
    let id = parse_id(&doctor_id)?;
    let doctor = ctx.core.directory().get_doctor(&id)?;
    Ok(Json(DoctorResponse { doctor }))
}
