#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use mockall::mock;

use career_track_backend::database::application_store::ApplicationStore;
use career_track_backend::database::filter_query::FilterClause;
use career_track_backend::database::vacancy_store::VacancyStore;
use career_track_backend::error::{Error, Result};
use career_track_backend::middleware::auth::Claims;
use career_track_backend::models::application::{
    Application, ApplicationForStudent, ApplicationStatus,
};
use career_track_backend::models::recommendation::MlRecommendation;
use career_track_backend::models::vacancy::{NewVacancy, Skill, Vacancy, VacancyUpdate};
use career_track_backend::models::vacancy_filter::VacancyFilter;
use career_track_backend::services::application_service::ApplicationService;
use career_track_backend::services::count_cache::TtlCountCache;
use career_track_backend::services::recommendation_service::RecommendationClient;
use career_track_backend::services::vacancy_service::VacancyService;
use career_track_backend::AppState;

pub const JWT_SECRET: &str = "test_secret_key";

mock! {
    pub Recommender {}

    #[async_trait]
    impl RecommendationClient for Recommender {
        async fn recommend(&self, skills: &str) -> Result<Vec<MlRecommendation>>;
    }
}

pub fn recommendation(vacancy_id: i64, match_percentage: i32) -> MlRecommendation {
    MlRecommendation {
        vacancy_id,
        similarity_score: f64::from(match_percentage) / 100.0,
        match_percentage,
        matching_skills: vec!["Rust".into()],
        missing_skills: vec![],
        skills_matched: 1,
        total_skills_required: 1,
    }
}

pub fn token(id: i64, role: &str) -> String {
    let claims = Claims {
        sub: id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        role: Some(role.to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode token")
}

/// `posted_date` of the n-th seeded vacancy; later seeds are newer.
pub fn posted_at(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(n)
}

pub fn new_vacancy(employer_id: i64, title: &str, location: &str) -> NewVacancy {
    NewVacancy {
        title: title.to_string(),
        description: format!("{} position", title),
        requirements: String::new(),
        location: location.to_string(),
        posted_date: None,
        employer_id,
        salary_gross: true,
        ..Default::default()
    }
}

#[derive(Default, Clone)]
struct Tables {
    next_id: i64,
    vacancies: Vec<Vacancy>,
    companies: HashMap<i64, String>,
    skills: Vec<Skill>,
    vacancy_skills: Vec<(i64, i64)>,
    applications: Vec<Application>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn hydrate(&self, vacancy: &Vacancy) -> Vacancy {
        let mut v = vacancy.clone();
        v.company_name = self.companies.get(&v.employer_id).cloned();
        let mut skills: Vec<String> = self
            .vacancy_skills
            .iter()
            .filter(|(vid, _)| *vid == v.id)
            .filter_map(|(_, sid)| self.skills.iter().find(|s| s.id == *sid))
            .map(|s| s.name.clone())
            .collect();
        skills.sort();
        v.skills = skills;
        v
    }

    /// Newest first, ties broken by id descending.
    fn ordered(&self) -> Vec<Vacancy> {
        let mut rows: Vec<Vacancy> = self.vacancies.iter().map(|v| self.hydrate(v)).collect();
        rows.sort_by(|a, b| b.posted_date.cmp(&a.posted_date).then(b.id.cmp(&a.id)));
        rows
    }

    fn filtered(&self, filter: &VacancyFilter) -> Vec<Vacancy> {
        let clause = FilterClause::from_filter(filter);
        self.ordered()
            .into_iter()
            // Inner join on employer_profiles.
            .filter(|v| v.company_name.is_some())
            .filter(|v| clause.matches(v))
            .collect()
    }

    fn insert(&mut self, vacancy: NewVacancy, posted_date: DateTime<Utc>) -> Vacancy {
        let id = self.next_id();
        let row = Vacancy {
            id,
            title: vacancy.title,
            description: vacancy.description,
            requirements: vacancy.requirements,
            location: vacancy.location,
            posted_date,
            employer_id: vacancy.employer_id,
            salary_from: vacancy.salary_from,
            salary_to: vacancy.salary_to,
            salary_currency: vacancy.salary_currency,
            salary_gross: vacancy.salary_gross,
            vacancy_url: vacancy.vacancy_url,
            work_schedule: vacancy.work_schedule,
            experience: vacancy.experience,
            created_at: posted_date,
            updated_at: posted_date,
            company_name: None,
            applied: None,
            skills: vec![],
        };
        self.vacancies.push(row.clone());
        row
    }

    fn update(&mut self, vacancy: &VacancyUpdate) -> Result<()> {
        let row = self
            .vacancies
            .iter_mut()
            .find(|v| v.id == vacancy.id)
            .ok_or_else(vacancy_not_found)?;
        row.title = vacancy.title.clone();
        row.description = vacancy.description.clone();
        row.requirements = vacancy.requirements.clone();
        row.location = vacancy.location.clone();
        row.salary_from = vacancy.salary_from;
        row.salary_to = vacancy.salary_to;
        row.salary_currency = vacancy.salary_currency.clone();
        row.salary_gross = vacancy.salary_gross;
        row.vacancy_url = vacancy.vacancy_url.clone();
        row.work_schedule = vacancy.work_schedule.clone();
        row.experience = vacancy.experience.clone();
        row.updated_at = Utc::now();
        Ok(())
    }

    fn link(&mut self, vacancy_id: i64, skill_name: &str) {
        let skill = self.skill_by_name(skill_name);
        if !self.vacancy_skills.contains(&(vacancy_id, skill.id)) {
            self.vacancy_skills.push((vacancy_id, skill.id));
        }
    }

    fn skill_by_name(&mut self, name: &str) -> Skill {
        if let Some(skill) = self.skills.iter().find(|s| s.name == name) {
            return skill.clone();
        }
        let now = Utc::now();
        let skill = Skill {
            id: self.next_id(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.skills.push(skill.clone());
        skill
    }
}

fn window(rows: Vec<Vacancy>, limit: i64, offset: i64) -> Vec<Vacancy> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

fn vacancy_not_found() -> Error {
    Error::NotFound("Vacancy not found".to_string())
}

/// In-memory stand-in for both Postgres stores. Predicates go through the
/// same `FilterClause` the SQL path renders.
#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
    pub count_calls: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_counts: AtomicBool,
    /// Makes every skill write fail, after earlier steps already ran.
    pub fail_skill_writes: AtomicBool,
    /// Simulates a concurrent submission the lookup did not see yet.
    pub hide_applications_on_lookup: AtomicBool,
}

impl InMemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_employer(&self, user_id: i64, company: &str) {
        let mut t = self.tables.lock().unwrap();
        t.companies.insert(user_id, company.to_string());
    }

    /// Inserts a vacancy directly, bypassing the write counter.
    pub fn seed(&self, vacancy: NewVacancy, posted_date: DateTime<Utc>) -> Vacancy {
        let mut t = self.tables.lock().unwrap();
        let row = t.insert(vacancy, posted_date);
        t.hydrate(&row)
    }

    pub fn vacancy_count(&self) -> usize {
        self.tables.lock().unwrap().vacancies.len()
    }

    pub fn seed_application(&self, student_id: i64, vacancy_id: i64, status: ApplicationStatus) -> Application {
        let mut t = self.tables.lock().unwrap();
        let now = Utc::now();
        let application = Application {
            id: t.next_id(),
            student_id,
            vacancy_id,
            cover_letter: String::new(),
            submitted_date: now,
            status,
            updated_date: now,
        };
        t.applications.push(application.clone());
        application
    }

    pub fn skill_names(&self, vacancy_id: i64) -> Vec<String> {
        let t = self.tables.lock().unwrap();
        let row = t
            .vacancies
            .iter()
            .find(|v| v.id == vacancy_id)
            .cloned()
            .expect("vacancy exists");
        t.hydrate(&row).skills
    }

    pub fn skill_count(&self) -> usize {
        self.tables.lock().unwrap().skills.len()
    }

    pub fn vacancy_exists(&self, id: i64) -> bool {
        self.tables.lock().unwrap().vacancies.iter().any(|v| v.id == id)
    }

    pub fn raw_vacancy(&self, id: i64) -> Vacancy {
        self.tables
            .lock()
            .unwrap()
            .vacancies
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .expect("vacancy exists")
    }

    pub fn applications(&self) -> Vec<Application> {
        self.tables.lock().unwrap().applications.clone()
    }

    fn bump_writes(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn skill_write(&self) -> Result<()> {
        if self.fail_skill_writes.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn count_call(&self) -> Result<()> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl VacancyStore for InMemoryDb {
    async fn list_vacancies(&self, limit: i64, offset: i64) -> Result<Vec<Vacancy>> {
        let t = self.tables.lock().unwrap();
        Ok(window(t.ordered(), limit, offset))
    }

    async fn list_vacancies_with_application_flag(
        &self,
        limit: i64,
        offset: i64,
        student_id: i64,
    ) -> Result<Vec<Vacancy>> {
        let t = self.tables.lock().unwrap();
        let rows = t
            .ordered()
            .into_iter()
            .map(|mut v| {
                let applied = t
                    .applications
                    .iter()
                    .any(|a| a.vacancy_id == v.id && a.student_id == student_id);
                v.applied = Some(applied);
                v
            })
            .collect();
        Ok(window(rows, limit, offset))
    }

    async fn count_vacancies(&self) -> Result<i64> {
        self.count_call()?;
        Ok(self.tables.lock().unwrap().vacancies.len() as i64)
    }

    async fn filtered_vacancies(
        &self,
        filter: &VacancyFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Vacancy>> {
        let t = self.tables.lock().unwrap();
        Ok(window(t.filtered(filter), limit, offset))
    }

    async fn count_filtered(&self, filter: &VacancyFilter) -> Result<i64> {
        self.count_call()?;
        Ok(self.tables.lock().unwrap().filtered(filter).len() as i64)
    }

    async fn vacancy_by_id(&self, id: i64) -> Result<Vacancy> {
        let t = self.tables.lock().unwrap();
        t.vacancies
            .iter()
            .find(|v| v.id == id)
            .map(|v| t.hydrate(v))
            .ok_or_else(vacancy_not_found)
    }

    async fn vacancies_by_ids(&self, ids: &[i64]) -> Result<Vec<Vacancy>> {
        let t = self.tables.lock().unwrap();
        // Storage order, unrelated to the order of `ids`.
        Ok(t.vacancies
            .iter()
            .filter(|v| ids.contains(&v.id))
            .map(|v| t.hydrate(v))
            .collect())
    }

    async fn vacancies_by_employer(&self, employer_id: i64) -> Result<Vec<Vacancy>> {
        let t = self.tables.lock().unwrap();
        Ok(t.ordered()
            .into_iter()
            .filter(|v| v.employer_id == employer_id)
            .collect())
    }

    async fn application_status(
        &self,
        vacancy_id: i64,
        student_id: i64,
    ) -> Result<Option<ApplicationStatus>> {
        let t = self.tables.lock().unwrap();
        Ok(t.applications
            .iter()
            .filter(|a| a.vacancy_id == vacancy_id && a.student_id == student_id)
            .max_by_key(|a| (a.submitted_date, a.id))
            .map(|a| a.status))
    }

    async fn create_vacancy(&self, vacancy: &NewVacancy) -> Result<Vacancy> {
        self.create_vacancy_with_skills(vacancy, &[]).await
    }

    // Writes go to a staged copy that replaces the tables only on success,
    // mirroring a rolled-back transaction.
    async fn create_vacancy_with_skills(
        &self,
        vacancy: &NewVacancy,
        skill_names: &[String],
    ) -> Result<Vacancy> {
        self.bump_writes();
        let mut t = self.tables.lock().unwrap();
        if let Some(url) = &vacancy.vacancy_url {
            if t.vacancies.iter().any(|v| v.vacancy_url.as_ref() == Some(url)) {
                return Err(Error::Conflict("Duplicate value violates vacancies_vacancy_url_key".into()));
            }
        }
        let mut staged = t.clone();
        let posted = vacancy.posted_date.unwrap_or_else(Utc::now);
        let row = staged.insert(vacancy.clone(), posted);
        for name in skill_names {
            self.skill_write()?;
            staged.link(row.id, name);
        }
        *t = staged;
        Ok(t.hydrate(&row))
    }

    async fn update_vacancy(&self, vacancy: &VacancyUpdate) -> Result<Vacancy> {
        self.update_vacancy_with_skills(vacancy, None).await
    }

    async fn update_vacancy_with_skills(
        &self,
        vacancy: &VacancyUpdate,
        skill_names: Option<&[String]>,
    ) -> Result<Vacancy> {
        self.bump_writes();
        let mut t = self.tables.lock().unwrap();
        let mut staged = t.clone();
        staged.update(vacancy)?;
        if let Some(names) = skill_names {
            self.skill_write()?;
            staged.vacancy_skills.retain(|(vid, _)| *vid != vacancy.id);
            for name in names {
                staged.link(vacancy.id, name);
            }
        }
        *t = staged;
        let row = t
            .vacancies
            .iter()
            .find(|v| v.id == vacancy.id)
            .cloned()
            .ok_or_else(vacancy_not_found)?;
        Ok(t.hydrate(&row))
    }

    async fn delete_vacancy(&self, id: i64) -> Result<()> {
        self.bump_writes();
        let mut t = self.tables.lock().unwrap();
        let before = t.vacancies.len();
        t.vacancies.retain(|v| v.id != id);
        if t.vacancies.len() == before {
            return Err(vacancy_not_found());
        }
        t.vacancy_skills.retain(|(vid, _)| *vid != id);
        t.applications.retain(|a| a.vacancy_id != id);
        Ok(())
    }

    async fn set_skills(&self, vacancy_id: i64, skill_ids: &[i64]) -> Result<()> {
        self.bump_writes();
        self.skill_write()?;
        let mut t = self.tables.lock().unwrap();
        t.vacancy_skills.retain(|(vid, _)| *vid != vacancy_id);
        let unique: BTreeSet<i64> = skill_ids.iter().copied().collect();
        for skill_id in unique {
            t.vacancy_skills.push((vacancy_id, skill_id));
        }
        Ok(())
    }

    async fn insert_vacancy_skill(&self, vacancy_id: i64, skill_name: &str) -> Result<()> {
        self.bump_writes();
        self.skill_write()?;
        let mut t = self.tables.lock().unwrap();
        t.link(vacancy_id, skill_name);
        Ok(())
    }

    async fn get_or_create_skill(&self, name: &str) -> Result<Skill> {
        let mut t = self.tables.lock().unwrap();
        Ok(t.skill_by_name(name))
    }

    async fn all_regions(&self) -> Result<Vec<String>> {
        let t = self.tables.lock().unwrap();
        let regions: BTreeSet<String> = t
            .vacancies
            .iter()
            .filter(|v| !v.location.is_empty())
            .map(|v| v.location.split(',').next().unwrap_or("").trim().to_string())
            .collect();
        Ok(regions.into_iter().collect())
    }
}

#[async_trait]
impl ApplicationStore for InMemoryDb {
    async fn latest_for(&self, student_id: i64, vacancy_id: i64) -> Result<Option<Application>> {
        if self.hide_applications_on_lookup.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let t = self.tables.lock().unwrap();
        Ok(t.applications
            .iter()
            .filter(|a| a.student_id == student_id && a.vacancy_id == vacancy_id)
            .max_by_key(|a| (a.submitted_date, a.id))
            .cloned())
    }

    async fn create_application(
        &self,
        student_id: i64,
        vacancy_id: i64,
        cover_letter: &str,
    ) -> Result<Application> {
        self.bump_writes();
        let mut t = self.tables.lock().unwrap();
        let active = t.applications.iter().any(|a| {
            a.student_id == student_id
                && a.vacancy_id == vacancy_id
                && a.status != ApplicationStatus::Rejected
        });
        if active {
            return Err(Error::Conflict(
                "Duplicate value violates uq_applications_active".into(),
            ));
        }
        let now = Utc::now();
        let application = Application {
            id: t.next_id(),
            student_id,
            vacancy_id,
            cover_letter: cover_letter.to_string(),
            submitted_date: now,
            status: ApplicationStatus::Pending,
            updated_date: now,
        };
        t.applications.push(application.clone());
        Ok(application)
    }

    async fn application_by_id(&self, id: i64) -> Result<Application> {
        let t = self.tables.lock().unwrap();
        t.applications
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Application not found".into()))
    }

    async fn update_status(&self, id: i64, status: ApplicationStatus) -> Result<Application> {
        self.bump_writes();
        let mut t = self.tables.lock().unwrap();
        let application = t
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        application.status = status;
        application.updated_date = Utc::now();
        Ok(application.clone())
    }

    async fn applications_for_student(&self, student_id: i64) -> Result<Vec<ApplicationForStudent>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<ApplicationForStudent> = t
            .applications
            .iter()
            .filter(|a| a.student_id == student_id)
            .filter_map(|a| {
                let vacancy = t.vacancies.iter().find(|v| v.id == a.vacancy_id)?;
                Some(ApplicationForStudent {
                    id: a.id,
                    vacancy_id: a.vacancy_id,
                    vacancy_title: vacancy.title.clone(),
                    company_name: t.companies.get(&vacancy.employer_id).cloned(),
                    cover_letter: a.cover_letter.clone(),
                    submitted_date: a.submitted_date,
                    status: a.status,
                    updated_date: a.updated_date,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.submitted_date.cmp(&a.submitted_date).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn applications_for_vacancy(&self, vacancy_id: i64) -> Result<Vec<Application>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<Application> = t
            .applications
            .iter()
            .filter(|a| a.vacancy_id == vacancy_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_date.cmp(&a.submitted_date).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

pub fn vacancy_service(db: Arc<InMemoryDb>, recommender: MockRecommender) -> VacancyService {
    VacancyService::new(
        db,
        Arc::new(recommender),
        Arc::new(TtlCountCache::new()),
        Duration::from_secs(60),
    )
}

pub fn application_service(db: Arc<InMemoryDb>) -> ApplicationService {
    ApplicationService::new(db.clone(), db)
}

pub fn app_state(db: Arc<InMemoryDb>, recommender: MockRecommender) -> AppState {
    AppState::from_services(
        vacancy_service(db.clone(), recommender),
        application_service(db),
        JWT_SECRET,
    )
}
