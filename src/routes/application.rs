use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::application_dto::{
        StudentApplicationsResponse, SubmitApplicationPayload, UpdateApplicationStatusPayload,
        VacancyApplicationsResponse,
    },
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/vacancies/{id}/apply",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    request_body = SubmitApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = Json<Application>),
        (status = 400, description = "Malformed body or cover letter too long"),
        (status = 404, description = "Vacancy not found"),
        (status = 409, description = "An active application already exists")
    )
)]
#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(vacancy_id): Path<i64>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let payload = SubmitApplicationPayload::from_body(&body)?;
    payload.validate()?;
    let application = state
        .application_service
        .submit(user.id, vacancy_id, &payload.cover_letter)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    get,
    path = "/api/v1/applications/me",
    responses(
        (status = 200, description = "Applications of the caller", body = Json<StudentApplicationsResponse>)
    )
)]
#[axum::debug_handler]
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let applications = state.application_service.student_applications(user.id).await?;
    Ok(Json(StudentApplicationsResponse { applications }))
}

#[utoipa::path(
    get,
    path = "/api/v1/vacancies/{id}/applications",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    responses(
        (status = 200, description = "Applications to the vacancy", body = Json<VacancyApplicationsResponse>),
        (status = 403, description = "Caller does not own the vacancy"),
        (status = 404, description = "Vacancy not found")
    )
)]
#[axum::debug_handler]
pub async fn vacancy_applications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(vacancy_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .vacancy_applications(user.id, vacancy_id)
        .await?;
    Ok(Json(VacancyApplicationsResponse { applications }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/applications/{id}",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    request_body = UpdateApplicationStatusPayload,
    responses(
        (status = 200, description = "Status changed", body = Json<Application>),
        (status = 403, description = "Caller does not own the vacancy"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Transition not allowed")
    )
)]
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(application_id): Path<i64>,
    Json(payload): Json<UpdateApplicationStatusPayload>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .change_status(user.id, application_id, payload.status)
        .await?;
    Ok(Json(application))
}
