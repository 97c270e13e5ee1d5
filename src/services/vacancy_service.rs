use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::database::filter_query::FilterClause;
use crate::database::vacancy_store::VacancyStore;
use crate::error::{Error, Result};
use crate::models::recommendation::{MlRecommendation, VacancyMlResponse};
use crate::models::vacancy::{NewVacancy, Vacancy, VacancyDetail, VacancyUpdate};
use crate::models::vacancy_filter::VacancyFilter;
use crate::services::count_cache::CountCache;
use crate::services::recommendation_service::RecommendationClient;

/// Cache key of the unfiltered total.
pub const TOTAL_COUNT_KEY: &str = "vacancyTotalCount";
pub const DEFAULT_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub size: i64,
}

impl Pagination {
    /// Page below 1 becomes 1; a size outside `1..=MAX_PAGE_SIZE` falls back
    /// to the default.
    pub fn normalize(page: i64, size: i64) -> Self {
        let page = page.max(1);
        let size = if (1..=MAX_PAGE_SIZE).contains(&size) {
            size
        } else {
            DEFAULT_PAGE_SIZE
        };
        Self { page, size }
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug)]
pub struct VacancyList {
    pub items: Vec<Vacancy>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

#[derive(Clone)]
pub struct VacancyService {
    store: Arc<dyn VacancyStore>,
    recommender: Arc<dyn RecommendationClient>,
    count_cache: Arc<dyn CountCache>,
    count_ttl: Duration,
}

impl VacancyService {
    pub fn new(
        store: Arc<dyn VacancyStore>,
        recommender: Arc<dyn RecommendationClient>,
        count_cache: Arc<dyn CountCache>,
        count_ttl: Duration,
    ) -> Self {
        Self {
            store,
            recommender,
            count_cache,
            count_ttl,
        }
    }

    pub async fn list_vacancies(
        &self,
        page: i64,
        size: i64,
        student_id: Option<i64>,
    ) -> Result<VacancyList> {
        let pagination = Pagination::normalize(page, size);

        let total = match self.count_cache.get(TOTAL_COUNT_KEY) {
            Some(total) => total,
            None => {
                let total = self.store.count_vacancies().await?;
                self.count_cache.set(TOTAL_COUNT_KEY, total, self.count_ttl);
                total
            }
        };

        let items = match student_id {
            Some(student_id) => {
                self.store
                    .list_vacancies_with_application_flag(
                        pagination.limit(),
                        pagination.offset(),
                        student_id,
                    )
                    .await?
            }
            None => {
                self.store
                    .list_vacancies(pagination.limit(), pagination.offset())
                    .await?
            }
        };

        Ok(VacancyList {
            items,
            total,
            page: pagination.page,
            size: pagination.size,
        })
    }

    pub async fn filter_vacancies(
        &self,
        filter: &VacancyFilter,
        page: i64,
        size: i64,
    ) -> Result<VacancyList> {
        let pagination = Pagination::normalize(page, size);
        let key = filter.fingerprint();

        let total = match self.count_cache.get(&key) {
            Some(total) => total,
            None => {
                let total = self.store.count_filtered(filter).await?;
                self.count_cache.set(&key, total, self.count_ttl);
                total
            }
        };

        let items = self
            .store
            .filtered_vacancies(filter, pagination.limit(), pagination.offset())
            .await?;

        Ok(VacancyList {
            items,
            total,
            page: pagination.page,
            size: pagination.size,
        })
    }

    /// Vacancies recommended for `skills` that also pass `filter`, best match
    /// first. Ties on match percentage are broken by ascending vacancy id.
    pub async fn recommend(
        &self,
        filter: &VacancyFilter,
        skills: &str,
    ) -> Result<Vec<VacancyMlResponse>> {
        let recommendations = self.recommender.recommend(skills).await?;

        // First occurrence wins when the service repeats an id.
        let mut ids = Vec::with_capacity(recommendations.len());
        let mut by_id: HashMap<i64, MlRecommendation> = HashMap::new();
        for rec in recommendations {
            if !by_id.contains_key(&rec.vacancy_id) {
                ids.push(rec.vacancy_id);
                by_id.insert(rec.vacancy_id, rec);
            }
        }

        let vacancies = self.store.vacancies_by_ids(&ids).await?;
        let clause = FilterClause::from_filter(filter);

        let mut result: Vec<VacancyMlResponse> = vacancies
            .into_iter()
            // Same inner join on employer profiles as the SQL filter path.
            .filter(|v| v.company_name.is_some() && clause.matches(v))
            .filter_map(|v| by_id.remove(&v.id).map(|rec| VacancyMlResponse::new(v, rec)))
            .collect();

        result.sort_by(|a, b| {
            b.match_percentage
                .cmp(&a.match_percentage)
                .then_with(|| a.vacancy.id.cmp(&b.vacancy.id))
        });

        tracing::info!(
            recommended = ids.len(),
            returned = result.len(),
            "merged recommendations with stored vacancies"
        );
        Ok(result)
    }

    pub async fn create_vacancy(
        &self,
        vacancy: NewVacancy,
        skill_names: &[String],
    ) -> Result<Vacancy> {
        let names = clean_skill_names(skill_names);
        let created = self
            .store
            .create_vacancy_with_skills(&vacancy, &names)
            .await?;
        tracing::info!(
            vacancy_id = created.id,
            employer_id = created.employer_id,
            skills = names.len(),
            "vacancy created"
        );
        Ok(created)
    }

    /// `None` leaves the skill associations untouched; `Some(&[])` clears them.
    pub async fn update_vacancy(
        &self,
        employer_id: i64,
        vacancy: VacancyUpdate,
        skill_names: Option<&[String]>,
    ) -> Result<Vacancy> {
        self.ensure_owner(employer_id, vacancy.id).await?;

        let names = skill_names.map(clean_skill_names);
        let updated = self
            .store
            .update_vacancy_with_skills(&vacancy, names.as_deref())
            .await?;

        tracing::info!(vacancy_id = vacancy.id, employer_id, "vacancy updated");
        Ok(updated)
    }

    pub async fn delete_vacancy(&self, employer_id: i64, vacancy_id: i64) -> Result<()> {
        self.ensure_owner(employer_id, vacancy_id).await?;
        self.store.delete_vacancy(vacancy_id).await?;
        tracing::info!(vacancy_id, employer_id, "vacancy deleted");
        Ok(())
    }

    pub async fn vacancy_details(&self, id: i64, student_id: Option<i64>) -> Result<VacancyDetail> {
        let vacancy = self.store.vacancy_by_id(id).await?;
        let application_status = match student_id {
            Some(student_id) => self.store.application_status(id, student_id).await?,
            None => None,
        };
        Ok(VacancyDetail {
            vacancy,
            application_status,
        })
    }

    pub async fn employer_vacancies(&self, employer_id: i64) -> Result<Vec<Vacancy>> {
        self.store.vacancies_by_employer(employer_id).await
    }

    pub async fn regions(&self) -> Result<Vec<String>> {
        self.store.all_regions().await
    }

    /// Loads the vacancy and checks it belongs to `employer_id`.
    pub async fn ensure_owner(&self, employer_id: i64, vacancy_id: i64) -> Result<Vacancy> {
        let vacancy = self.store.vacancy_by_id(vacancy_id).await?;
        if vacancy.employer_id != employer_id {
            tracing::warn!(vacancy_id, employer_id, "rejected write by non-owner");
            return Err(Error::NotOwner);
        }
        Ok(vacancy)
    }
}

/// Trimmed, non-empty, first occurrence of each name.
fn clean_skill_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && seen.insert(n.to_string()))
        .map(str::to_string)
        .collect()
}
