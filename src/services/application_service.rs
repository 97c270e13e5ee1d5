use std::sync::Arc;

use crate::database::application_store::ApplicationStore;
use crate::database::vacancy_store::VacancyStore;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationForStudent, ApplicationStatus};

#[derive(Clone)]
pub struct ApplicationService {
    applications: Arc<dyn ApplicationStore>,
    vacancies: Arc<dyn VacancyStore>,
}

impl ApplicationService {
    pub fn new(applications: Arc<dyn ApplicationStore>, vacancies: Arc<dyn VacancyStore>) -> Self {
        Self {
            applications,
            vacancies,
        }
    }

    /// Creates a `PENDING` application. A student may apply again only after
    /// the latest attempt was rejected.
    pub async fn submit(
        &self,
        student_id: i64,
        vacancy_id: i64,
        cover_letter: &str,
    ) -> Result<Application> {
        self.vacancies.vacancy_by_id(vacancy_id).await?;

        if let Some(previous) = self.applications.latest_for(student_id, vacancy_id).await? {
            if previous.status.blocks_resubmission() {
                return Err(Error::AlreadyApplied);
            }
        }

        // Lost race against a concurrent submission: the partial unique index fires.
        let application = self
            .applications
            .create_application(student_id, vacancy_id, cover_letter)
            .await
            .map_err(|e| match e {
                Error::Conflict(_) => Error::AlreadyApplied,
                other => other,
            })?;

        tracing::info!(
            application_id = application.id,
            student_id,
            vacancy_id,
            "application submitted"
        );
        Ok(application)
    }

    pub async fn change_status(
        &self,
        employer_id: i64,
        application_id: i64,
        status: ApplicationStatus,
    ) -> Result<Application> {
        let application = self.applications.application_by_id(application_id).await?;
        let vacancy = self.vacancies.vacancy_by_id(application.vacancy_id).await?;
        if vacancy.employer_id != employer_id {
            return Err(Error::NotOwner);
        }

        if !application.status.can_transition_to(status) {
            return Err(Error::Conflict(format!(
                "Cannot change application status from {} to {}",
                application.status, status
            )));
        }

        let updated = self.applications.update_status(application_id, status).await?;
        tracing::info!(
            application_id,
            from = %application.status,
            to = %status,
            "application status changed"
        );
        Ok(updated)
    }

    pub async fn student_applications(&self, student_id: i64) -> Result<Vec<ApplicationForStudent>> {
        self.applications.applications_for_student(student_id).await
    }

    pub async fn vacancy_applications(
        &self,
        employer_id: i64,
        vacancy_id: i64,
    ) -> Result<Vec<Application>> {
        let vacancy = self.vacancies.vacancy_by_id(vacancy_id).await?;
        if vacancy.employer_id != employer_id {
            return Err(Error::NotOwner);
        }
        self.applications.applications_for_vacancy(vacancy_id).await
    }
}
