use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::models::recommendation::VacancyMlResponse;
use crate::models::vacancy::{NewVacancy, Vacancy, VacancyUpdate};
use crate::models::vacancy_filter::VacancyFilter;
use crate::services::vacancy_service::{Pagination, VacancyList};

fn validate_salary_range(payload: &VacancyPayload) -> std::result::Result<(), ValidationError> {
    match (payload.salary_from, payload.salary_to) {
        (Some(from), Some(to)) if from > to => Err(ValidationError::new("salary_range")),
        _ => Ok(()),
    }
}

/// Body of `POST /vacancies` and `PUT /vacancies/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_salary_range", skip_on_field_errors = false))]
pub struct VacancyPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    pub posted_date: Option<DateTime<Utc>>,
    pub salary_from: Option<Decimal>,
    pub salary_to: Option<Decimal>,
    #[validate(length(max = 10))]
    pub salary_currency: Option<String>,
    #[serde(default)]
    pub salary_gross: bool,
    #[validate(url)]
    pub vacancy_url: Option<String>,
    pub work_schedule: Option<String>,
    pub experience: Option<String>,
    /// On update, an absent list keeps the current skills and an empty list
    /// clears them.
    pub skills: Option<Vec<String>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl VacancyPayload {
    pub fn into_new_vacancy(self, employer_id: i64) -> (NewVacancy, Vec<String>) {
        let vacancy = NewVacancy {
            title: self.title,
            description: self.description,
            requirements: self.requirements,
            location: self.location,
            posted_date: self.posted_date,
            employer_id,
            salary_from: self.salary_from,
            salary_to: self.salary_to,
            salary_currency: non_blank(self.salary_currency),
            salary_gross: self.salary_gross,
            vacancy_url: non_blank(self.vacancy_url),
            work_schedule: non_blank(self.work_schedule),
            experience: non_blank(self.experience),
        };
        (vacancy, self.skills.unwrap_or_default())
    }

    pub fn into_update(self, id: i64) -> (VacancyUpdate, Option<Vec<String>>) {
        let vacancy = VacancyUpdate {
            id,
            title: self.title,
            description: self.description,
            requirements: self.requirements,
            location: self.location,
            salary_from: self.salary_from,
            salary_to: self.salary_to,
            salary_currency: non_blank(self.salary_currency),
            salary_gross: self.salary_gross,
            vacancy_url: non_blank(self.vacancy_url),
            work_schedule: non_blank(self.work_schedule),
            experience: non_blank(self.experience),
        };
        (vacancy, self.skills)
    }
}

/// Raw `page`/`size` query values. Unparseable values fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
}

fn lenient_i64(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        let default = Pagination::default();
        Pagination::normalize(
            lenient_i64(self.page.as_deref()).unwrap_or(default.page),
            lenient_i64(self.size.as_deref()).unwrap_or(default.size),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VacancySearchQuery {
    pub keywords: Option<String>,
    pub region: Option<String>,
    pub experience: Option<String>,
    pub salary_from: Option<String>,
    pub schedule: Option<String>,
    pub company_name: Option<String>,
    pub ml_skills: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

impl VacancySearchQuery {
    pub fn pagination(&self) -> Pagination {
        PageQuery {
            page: self.page.clone(),
            size: self.size.clone(),
        }
        .pagination()
    }

    /// Builds the filter; a non-numeric `salary_from` is a client error.
    pub fn filter(&self) -> Result<VacancyFilter> {
        let salary_from = match self.salary_from.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                Decimal::from_str(raw)
                    .or_else(|_| Decimal::from_scientific(raw))
                    .map_err(|_| Error::BadRequest("Invalid salary_from".to_string()))?,
            ),
        };
        Ok(VacancyFilter {
            keywords: self.keywords.clone(),
            region: self.region.clone(),
            experience: self.experience.clone(),
            salary_from,
            schedule: self.schedule.clone(),
            company_name: self.company_name.clone(),
        })
    }

    pub fn ml_skills(&self) -> Option<&str> {
        self.ml_skills
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacancyPageResponse {
    pub page: i64,
    pub size: i64,
    pub total_count: i64,
    pub vacancies: Vec<Vacancy>,
}

impl From<VacancyList> for VacancyPageResponse {
    fn from(value: VacancyList) -> Self {
        Self {
            page: value.page,
            size: value.size,
            total_count: value.total,
            vacancies: value.items,
        }
    }
}

/// Recommendations are not paginated; `totalCount` is the merged length.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationPageResponse {
    pub page: i64,
    pub size: i64,
    pub total_count: i64,
    pub vacancies: Vec<VacancyMlResponse>,
}

impl RecommendationPageResponse {
    pub fn new(pagination: Pagination, vacancies: Vec<VacancyMlResponse>) -> Self {
        Self {
            page: pagination.page,
            size: pagination.size,
            total_count: vacancies.len() as i64,
            vacancies,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployerVacanciesResponse {
    pub vacancies: Vec<Vacancy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionsResponse {
    pub regions: Vec<String>,
}
