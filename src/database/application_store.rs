use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationForStudent, ApplicationStatus};

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Most recent attempt of the student for the vacancy, if any.
    async fn latest_for(&self, student_id: i64, vacancy_id: i64) -> Result<Option<Application>>;

    /// Inserts a new `PENDING` application.
    async fn create_application(
        &self,
        student_id: i64,
        vacancy_id: i64,
        cover_letter: &str,
    ) -> Result<Application>;

    async fn application_by_id(&self, id: i64) -> Result<Application>;

    async fn update_status(&self, id: i64, status: ApplicationStatus) -> Result<Application>;

    async fn applications_for_student(&self, student_id: i64) -> Result<Vec<ApplicationForStudent>>;

    async fn applications_for_vacancy(&self, vacancy_id: i64) -> Result<Vec<Application>>;
}

const APPLICATION_COLUMNS: &str =
    "id, student_id, vacancy_id, cover_letter, submitted_date, status, updated_date";

#[derive(Clone)]
pub struct PgApplicationStore {
    pool: PgPool,
}

impl PgApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    async fn latest_for(&self, student_id: i64, vacancy_id: i64) -> Result<Option<Application>> {
        let query = format!(
            r#"
            SELECT {} FROM applications
            WHERE student_id = $1 AND vacancy_id = $2
            ORDER BY submitted_date DESC, id DESC
            LIMIT 1
            "#,
            APPLICATION_COLUMNS
        );
        let application = sqlx::query_as::<_, Application>(&query)
            .bind(student_id)
            .bind(vacancy_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(application)
    }

    async fn create_application(
        &self,
        student_id: i64,
        vacancy_id: i64,
        cover_letter: &str,
    ) -> Result<Application> {
        let query = format!(
            r#"
            INSERT INTO applications (student_id, vacancy_id, cover_letter, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let application = sqlx::query_as::<_, Application>(&query)
            .bind(student_id)
            .bind(vacancy_id)
            .bind(cover_letter)
            .bind(ApplicationStatus::Pending)
            .fetch_one(&self.pool)
            .await?;
        Ok(application)
    }

    async fn application_by_id(&self, id: i64) -> Result<Application> {
        let query = format!("SELECT {} FROM applications WHERE id = $1", APPLICATION_COLUMNS);
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    async fn update_status(&self, id: i64, status: ApplicationStatus) -> Result<Application> {
        let query = format!(
            r#"
            UPDATE applications
            SET status = $2, updated_date = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    async fn applications_for_student(&self, student_id: i64) -> Result<Vec<ApplicationForStudent>> {
        let applications = sqlx::query_as::<_, ApplicationForStudent>(
            r#"
            SELECT a.id, a.vacancy_id, v.title AS vacancy_title, ep.company_name,
                   a.cover_letter, a.submitted_date, a.status, a.updated_date
            FROM applications a
            JOIN vacancies v ON v.id = a.vacancy_id
            LEFT JOIN employer_profiles ep ON ep.user_id = v.employer_id
            WHERE a.student_id = $1
            ORDER BY a.submitted_date DESC, a.id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    async fn applications_for_vacancy(&self, vacancy_id: i64) -> Result<Vec<Application>> {
        let query = format!(
            r#"
            SELECT {} FROM applications
            WHERE vacancy_id = $1
            ORDER BY submitted_date DESC, id DESC
            "#,
            APPLICATION_COLUMNS
        );
        let applications = sqlx::query_as::<_, Application>(&query)
            .bind(vacancy_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(applications)
    }
}
