use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::application::ApplicationStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vacancy {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub posted_date: DateTime<Utc>,
    pub employer_id: i64,
    pub salary_from: Option<Decimal>,
    pub salary_to: Option<Decimal>,
    pub salary_currency: Option<String>,
    pub salary_gross: bool,
    pub vacancy_url: Option<String>,
    pub work_schedule: Option<String>,
    pub experience: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owner's company name; `None` when the employer has no profile yet.
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Only populated on the student-annotated listing.
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<bool>,
    #[sqlx(skip)]
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Fields written on insert. `posted_date` defaults to now when absent.
#[derive(Debug, Clone, Default)]
pub struct NewVacancy {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub posted_date: Option<DateTime<Utc>>,
    pub employer_id: i64,
    pub salary_from: Option<Decimal>,
    pub salary_to: Option<Decimal>,
    pub salary_currency: Option<String>,
    pub salary_gross: bool,
    pub vacancy_url: Option<String>,
    pub work_schedule: Option<String>,
    pub experience: Option<String>,
}

/// Full replacement of the editable columns of an existing vacancy.
#[derive(Debug, Clone, Default)]
pub struct VacancyUpdate {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub salary_from: Option<Decimal>,
    pub salary_to: Option<Decimal>,
    pub salary_currency: Option<String>,
    pub salary_gross: bool,
    pub vacancy_url: Option<String>,
    pub work_schedule: Option<String>,
    pub experience: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacancyDetail {
    #[serde(flatten)]
    pub vacancy: Vacancy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
