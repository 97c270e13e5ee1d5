use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::{
    dto::vacancy_dto::{
        EmployerVacanciesResponse, PageQuery, RecommendationPageResponse, RegionsResponse,
        VacancyPageResponse, VacancyPayload, VacancySearchQuery,
    },
    error::Result,
    middleware::auth::{AuthUser, Role},
    AppState,
};

fn student_id(user: Option<Extension<AuthUser>>) -> Option<i64> {
    user.and_then(|Extension(user)| (user.role == Role::Student).then_some(user.id))
}

#[utoipa::path(
    get,
    path = "/api/v1/vacancies",
    params(
        ("page" = Option<i64>, Query, description = "Page number, 1-based"),
        ("size" = Option<i64>, Query, description = "Items per page, at most 100")
    ),
    responses(
        (status = 200, description = "Page of vacancies, newest first", body = Json<VacancyPageResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_vacancies(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let pagination = query.pagination();
    let list = state
        .vacancy_service
        .list_vacancies(pagination.page, pagination.size, student_id(user))
        .await?;
    Ok(Json(VacancyPageResponse::from(list)))
}

#[utoipa::path(
    get,
    path = "/api/v1/vacancies/search",
    params(
        ("keywords" = Option<String>, Query, description = "Substring of title or description"),
        ("region" = Option<String>, Query, description = "Comma-separated location fragments"),
        ("experience" = Option<String>, Query, description = "Exact experience level"),
        ("salary_from" = Option<String>, Query, description = "Minimum salary"),
        ("schedule" = Option<String>, Query, description = "Exact work schedule"),
        ("company_name" = Option<String>, Query, description = "Substring of the company name"),
        ("ml_skills" = Option<String>, Query, description = "Skill set; switches to recommendations"),
        ("page" = Option<i64>, Query, description = "Page number, 1-based"),
        ("size" = Option<i64>, Query, description = "Items per page, at most 100")
    ),
    responses(
        (status = 200, description = "Filtered or recommended vacancies", body = Json<VacancyPageResponse>),
        (status = 400, description = "Invalid salary_from"),
        (status = 502, description = "Recommendation service unavailable")
    )
)]
#[axum::debug_handler]
pub async fn search_vacancies(
    State(state): State<AppState>,
    Query(query): Query<VacancySearchQuery>,
) -> Result<Response> {
    let filter = query.filter()?;
    let pagination = query.pagination();

    if let Some(skills) = query.ml_skills() {
        let recommended = state.vacancy_service.recommend(&filter, skills).await?;
        let body = RecommendationPageResponse::new(pagination, recommended);
        return Ok(Json(body).into_response());
    }

    let list = state
        .vacancy_service
        .filter_vacancies(&filter, pagination.page, pagination.size)
        .await?;
    Ok(Json(VacancyPageResponse::from(list)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/vacancies/{id}",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    responses(
        (status = 200, description = "Vacancy with the caller's application status", body = Json<VacancyDetail>),
        (status = 404, description = "Vacancy not found")
    )
)]
#[axum::debug_handler]
pub async fn get_vacancy(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let detail = state
        .vacancy_service
        .vacancy_details(id, student_id(user))
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    get,
    path = "/api/v1/vacancies/regions",
    responses(
        (status = 200, description = "Distinct cities of all vacancies", body = Json<RegionsResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_regions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let regions = state.vacancy_service.regions().await?;
    Ok(Json(RegionsResponse { regions }))
}

#[utoipa::path(
    post,
    path = "/api/v1/vacancies",
    request_body = VacancyPayload,
    responses(
        (status = 201, description = "Vacancy created", body = Json<Vacancy>),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an employer")
    )
)]
#[axum::debug_handler]
pub async fn create_vacancy(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<VacancyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (vacancy, skills) = payload.into_new_vacancy(user.id);
    let vacancy = state.vacancy_service.create_vacancy(vacancy, &skills).await?;
    Ok((StatusCode::CREATED, Json(vacancy)))
}

#[utoipa::path(
    put,
    path = "/api/v1/vacancies/{id}",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    request_body = VacancyPayload,
    responses(
        (status = 200, description = "Vacancy updated", body = Json<Vacancy>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller does not own the vacancy"),
        (status = 404, description = "Vacancy not found")
    )
)]
#[axum::debug_handler]
pub async fn update_vacancy(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<VacancyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (vacancy, skills) = payload.into_update(id);
    let vacancy = state
        .vacancy_service
        .update_vacancy(user.id, vacancy, skills.as_deref())
        .await?;
    Ok(Json(vacancy))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vacancies/{id}",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    responses(
        (status = 204, description = "Vacancy deleted"),
        (status = 403, description = "Caller does not own the vacancy"),
        (status = 404, description = "Vacancy not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_vacancy(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.vacancy_service.delete_vacancy(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/employers/me/vacancies",
    responses(
        (status = 200, description = "Vacancies owned by the caller", body = Json<EmployerVacanciesResponse>),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn employer_vacancies(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let vacancies = state.vacancy_service.employer_vacancies(user.id).await?;
    Ok(Json(EmployerVacanciesResponse { vacancies }))
}
