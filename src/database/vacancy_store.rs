use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::database::filter_query::FilterClause;
use crate::error::{Error, Result};
use crate::models::application::ApplicationStatus;
use crate::models::vacancy::{NewVacancy, Skill, Vacancy, VacancyUpdate};
use crate::models::vacancy_filter::VacancyFilter;

/// Persistence for vacancies, skills and the vacancy/skill association.
///
/// Listings are ordered newest first (`posted_date DESC`, then `id DESC`) and
/// paginated with plain limit/offset windows.
#[async_trait]
pub trait VacancyStore: Send + Sync {
    async fn list_vacancies(&self, limit: i64, offset: i64) -> Result<Vec<Vacancy>>;

    /// Same rows and order as [`VacancyStore::list_vacancies`], with `applied`
    /// set for the given student.
    async fn list_vacancies_with_application_flag(
        &self,
        limit: i64,
        offset: i64,
        student_id: i64,
    ) -> Result<Vec<Vacancy>>;

    async fn count_vacancies(&self) -> Result<i64>;

    async fn filtered_vacancies(
        &self,
        filter: &VacancyFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Vacancy>>;

    async fn count_filtered(&self, filter: &VacancyFilter) -> Result<i64>;

    async fn vacancy_by_id(&self, id: i64) -> Result<Vacancy>;

    /// Unordered batch lookup; ids with no row are skipped.
    async fn vacancies_by_ids(&self, ids: &[i64]) -> Result<Vec<Vacancy>>;

    async fn vacancies_by_employer(&self, employer_id: i64) -> Result<Vec<Vacancy>>;

    /// Status of the student's most recent application to the vacancy.
    async fn application_status(
        &self,
        vacancy_id: i64,
        student_id: i64,
    ) -> Result<Option<ApplicationStatus>>;

    async fn create_vacancy(&self, vacancy: &NewVacancy) -> Result<Vacancy>;

    /// Inserts the vacancy and links every named skill in one transaction.
    /// Nothing is stored when any step fails.
    async fn create_vacancy_with_skills(
        &self,
        vacancy: &NewVacancy,
        skill_names: &[String],
    ) -> Result<Vacancy>;

    /// Fails with [`Error::NotFound`] when no row has the given id.
    async fn update_vacancy(&self, vacancy: &VacancyUpdate) -> Result<Vacancy>;

    /// Updates the columns and, for `Some`, replaces the skill set with the
    /// named skills. One transaction; `None` leaves associations untouched.
    async fn update_vacancy_with_skills(
        &self,
        vacancy: &VacancyUpdate,
        skill_names: Option<&[String]>,
    ) -> Result<Vacancy>;

    /// Fails with [`Error::NotFound`] when no row has the given id.
    async fn delete_vacancy(&self, id: i64) -> Result<()>;

    /// Replaces the whole skill set of a vacancy in one transaction.
    async fn set_skills(&self, vacancy_id: i64, skill_ids: &[i64]) -> Result<()>;

    /// Get-or-create the skill by name, then associate it with the vacancy.
    async fn insert_vacancy_skill(&self, vacancy_id: i64, skill_name: &str) -> Result<()>;

    async fn get_or_create_skill(&self, name: &str) -> Result<Skill>;

    /// Distinct city part (text before the first comma) of every location.
    async fn all_regions(&self) -> Result<Vec<String>>;
}

const VACANCY_COLUMNS: &str = "v.id, v.title, v.description, v.requirements, v.location, \
     v.posted_date, v.employer_id, v.salary_from, v.salary_to, v.salary_currency, \
     v.salary_gross, v.vacancy_url, v.work_schedule, v.experience, v.created_at, \
     v.updated_at, ep.company_name";

const ORDER_NEWEST: &str = " ORDER BY v.posted_date DESC, v.id DESC";

// The no-op update makes RETURNING yield the row on conflict too.
const UPSERT_SKILL: &str = r#"
    INSERT INTO skills (name)
    VALUES ($1)
    ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
    RETURNING id, name, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PgVacancyStore {
    pool: PgPool,
}

impl PgVacancyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_skills(&self, vacancies: &mut [Vacancy]) -> Result<()> {
        if vacancies.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = vacancies.iter().map(|v| v.id).collect();
        let rows = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT vs.vacancy_id, s.name
            FROM vacancy_skills vs
            JOIN skills s ON s.id = vs.skill_id
            WHERE vs.vacancy_id = ANY($1)
            ORDER BY s.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_vacancy: HashMap<i64, Vec<String>> = HashMap::new();
        for (vacancy_id, name) in rows {
            by_vacancy.entry(vacancy_id).or_default().push(name);
        }
        for vacancy in vacancies.iter_mut() {
            vacancy.skills = by_vacancy.remove(&vacancy.id).unwrap_or_default();
        }
        Ok(())
    }

    fn select_from(join: &str) -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new(format!(
            "SELECT {} FROM vacancies v {} employer_profiles ep ON ep.user_id = v.employer_id",
            VACANCY_COLUMNS, join
        ))
    }
}

async fn insert_vacancy_row(conn: &mut PgConnection, vacancy: &NewVacancy) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO vacancies (
            title, description, requirements, location, posted_date, employer_id,
            salary_from, salary_to, salary_currency, salary_gross, vacancy_url,
            work_schedule, experience
        ) VALUES (
            $1, $2, $3, $4, COALESCE($5, NOW()), $6,
            $7, $8, $9, $10, $11,
            $12, $13
        )
        RETURNING id
        "#,
    )
    .bind(&vacancy.title)
    .bind(&vacancy.description)
    .bind(&vacancy.requirements)
    .bind(&vacancy.location)
    .bind(vacancy.posted_date)
    .bind(vacancy.employer_id)
    .bind(vacancy.salary_from)
    .bind(vacancy.salary_to)
    .bind(&vacancy.salary_currency)
    .bind(vacancy.salary_gross)
    .bind(&vacancy.vacancy_url)
    .bind(&vacancy.work_schedule)
    .bind(&vacancy.experience)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

async fn update_vacancy_row(conn: &mut PgConnection, vacancy: &VacancyUpdate) -> Result<()> {
    let res = sqlx::query(
        r#"
        UPDATE vacancies SET
            title = $2,
            description = $3,
            requirements = $4,
            location = $5,
            salary_from = $6,
            salary_to = $7,
            salary_currency = $8,
            salary_gross = $9,
            vacancy_url = $10,
            work_schedule = $11,
            experience = $12,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(vacancy.id)
    .bind(&vacancy.title)
    .bind(&vacancy.description)
    .bind(&vacancy.requirements)
    .bind(&vacancy.location)
    .bind(vacancy.salary_from)
    .bind(vacancy.salary_to)
    .bind(&vacancy.salary_currency)
    .bind(vacancy.salary_gross)
    .bind(&vacancy.vacancy_url)
    .bind(&vacancy.work_schedule)
    .bind(&vacancy.experience)
    .execute(&mut *conn)
    .await?;

    if res.rows_affected() == 0 {
        return Err(Error::NotFound("Vacancy not found".to_string()));
    }
    Ok(())
}

async fn upsert_skill(conn: &mut PgConnection, name: &str) -> Result<Skill> {
    let skill = sqlx::query_as::<_, Skill>(UPSERT_SKILL)
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(skill)
}

async fn link_skill(conn: &mut PgConnection, vacancy_id: i64, skill_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO vacancy_skills (vacancy_id, skill_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(vacancy_id)
    .bind(skill_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn replace_skills(
    conn: &mut PgConnection,
    vacancy_id: i64,
    skill_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM vacancy_skills WHERE vacancy_id = $1")
        .bind(vacancy_id)
        .execute(&mut *conn)
        .await?;

    if !skill_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO vacancy_skills (vacancy_id, skill_id)
            SELECT $1, UNNEST($2::bigint[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(vacancy_id)
        .bind(skill_ids.to_vec())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl VacancyStore for PgVacancyStore {
    async fn list_vacancies(&self, limit: i64, offset: i64) -> Result<Vec<Vacancy>> {
        let mut qb = Self::select_from("LEFT JOIN");
        qb.push(ORDER_NEWEST)
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let mut vacancies = qb
            .build_query_as::<Vacancy>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_skills(&mut vacancies).await?;
        Ok(vacancies)
    }

    async fn list_vacancies_with_application_flag(
        &self,
        limit: i64,
        offset: i64,
        student_id: i64,
    ) -> Result<Vec<Vacancy>> {
        // DISTINCT keeps one row per vacancy even after several attempts.
        let query = format!(
            r#"
            SELECT {}, (a.vacancy_id IS NOT NULL) AS applied
            FROM vacancies v
            LEFT JOIN employer_profiles ep ON ep.user_id = v.employer_id
            LEFT JOIN (
                SELECT DISTINCT vacancy_id FROM applications WHERE student_id = $3
            ) a ON a.vacancy_id = v.id
            {}
            LIMIT $1 OFFSET $2
            "#,
            VACANCY_COLUMNS, ORDER_NEWEST
        );
        let mut vacancies = sqlx::query_as::<_, Vacancy>(&query)
            .bind(limit)
            .bind(offset)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        self.attach_skills(&mut vacancies).await?;
        Ok(vacancies)
    }

    async fn count_vacancies(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vacancies")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn filtered_vacancies(
        &self,
        filter: &VacancyFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Vacancy>> {
        let clause = FilterClause::from_filter(filter);
        let mut qb = Self::select_from("JOIN");
        clause.push_where(&mut qb);
        qb.push(ORDER_NEWEST)
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        tracing::debug!(sql = qb.sql(), "filtered vacancies query");
        let mut vacancies = qb
            .build_query_as::<Vacancy>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_skills(&mut vacancies).await?;
        Ok(vacancies)
    }

    async fn count_filtered(&self, filter: &VacancyFilter) -> Result<i64> {
        let clause = FilterClause::from_filter(filter);
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM vacancies v JOIN employer_profiles ep ON ep.user_id = v.employer_id",
        );
        clause.push_where(&mut qb);

        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn vacancy_by_id(&self, id: i64) -> Result<Vacancy> {
        let mut qb = Self::select_from("LEFT JOIN");
        qb.push(" WHERE v.id = ").push_bind(id);

        let vacancy = qb
            .build_query_as::<Vacancy>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Vacancy not found".to_string()))?;

        let mut vacancies = [vacancy];
        self.attach_skills(&mut vacancies).await?;
        let [vacancy] = vacancies;
        Ok(vacancy)
    }

    async fn vacancies_by_ids(&self, ids: &[i64]) -> Result<Vec<Vacancy>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = Self::select_from("LEFT JOIN");
        qb.push(" WHERE v.id = ANY(").push_bind(ids.to_vec()).push(")");

        let mut vacancies = qb
            .build_query_as::<Vacancy>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_skills(&mut vacancies).await?;
        Ok(vacancies)
    }

    async fn vacancies_by_employer(&self, employer_id: i64) -> Result<Vec<Vacancy>> {
        let mut qb = Self::select_from("LEFT JOIN");
        qb.push(" WHERE v.employer_id = ")
            .push_bind(employer_id)
            .push(ORDER_NEWEST);

        let mut vacancies = qb
            .build_query_as::<Vacancy>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_skills(&mut vacancies).await?;
        Ok(vacancies)
    }

    async fn application_status(
        &self,
        vacancy_id: i64,
        student_id: i64,
    ) -> Result<Option<ApplicationStatus>> {
        let status = sqlx::query_scalar::<_, ApplicationStatus>(
            r#"
            SELECT status FROM applications
            WHERE vacancy_id = $1 AND student_id = $2
            ORDER BY submitted_date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(vacancy_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(status)
    }

    async fn create_vacancy(&self, vacancy: &NewVacancy) -> Result<Vacancy> {
        self.create_vacancy_with_skills(vacancy, &[]).await
    }

    async fn create_vacancy_with_skills(
        &self,
        vacancy: &NewVacancy,
        skill_names: &[String],
    ) -> Result<Vacancy> {
        let mut tx = self.pool.begin().await?;

        let id = insert_vacancy_row(&mut *tx, vacancy).await?;
        for name in skill_names {
            let skill = upsert_skill(&mut *tx, name).await?;
            link_skill(&mut *tx, id, skill.id).await?;
        }

        tx.commit().await?;
        self.vacancy_by_id(id).await
    }

    async fn update_vacancy(&self, vacancy: &VacancyUpdate) -> Result<Vacancy> {
        self.update_vacancy_with_skills(vacancy, None).await
    }

    async fn update_vacancy_with_skills(
        &self,
        vacancy: &VacancyUpdate,
        skill_names: Option<&[String]>,
    ) -> Result<Vacancy> {
        let mut tx = self.pool.begin().await?;

        update_vacancy_row(&mut *tx, vacancy).await?;
        if let Some(names) = skill_names {
            let mut skill_ids = Vec::with_capacity(names.len());
            for name in names {
                skill_ids.push(upsert_skill(&mut *tx, name).await?.id);
            }
            replace_skills(&mut *tx, vacancy.id, &skill_ids).await?;
        }

        tx.commit().await?;
        self.vacancy_by_id(vacancy.id).await
    }

    async fn delete_vacancy(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM vacancies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Vacancy not found".to_string()));
        }
        Ok(())
    }

    async fn set_skills(&self, vacancy_id: i64, skill_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        replace_skills(&mut *tx, vacancy_id, skill_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_vacancy_skill(&self, vacancy_id: i64, skill_name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let skill = upsert_skill(&mut *tx, skill_name).await?;
        link_skill(&mut *tx, vacancy_id, skill.id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_or_create_skill(&self, name: &str) -> Result<Skill> {
        let mut conn = self.pool.acquire().await?;
        upsert_skill(&mut *conn, name).await
    }

    async fn all_regions(&self) -> Result<Vec<String>> {
        let regions = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT TRIM(SPLIT_PART(location, ',', 1)) AS city
            FROM vacancies
            WHERE location <> ''
            ORDER BY city
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(regions)
    }
}
