//! Typed predicates for vacancy search.
//!
//! A [`FilterClause`] is built once from a [`VacancyFilter`] and can either be
//! rendered into a `QueryBuilder` (every value goes through `push_bind`) or
//! evaluated against rows already in memory. Both paths walk the same
//! predicate list, so a row matches in-process exactly when the SQL would
//! have returned it.

use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use crate::models::vacancy::Vacancy;
use crate::models::vacancy_filter::VacancyFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Title,
    Description,
    Location,
    Experience,
    WorkSchedule,
    SalaryFrom,
    CompanyName,
}

impl Column {
    /// Qualified column name. Vacancies are aliased `v`, employer profiles `ep`.
    pub fn sql(self) -> &'static str {
        match self {
            Column::Title => "v.title",
            Column::Description => "v.description",
            Column::Location => "v.location",
            Column::Experience => "v.experience",
            Column::WorkSchedule => "v.work_schedule",
            Column::SalaryFrom => "v.salary_from",
            Column::CompanyName => "ep.company_name",
        }
    }

    fn text(self, vacancy: &Vacancy) -> Option<&str> {
        match self {
            Column::Title => Some(&vacancy.title),
            Column::Description => Some(&vacancy.description),
            Column::Location => Some(&vacancy.location),
            Column::Experience => vacancy.experience.as_deref(),
            Column::WorkSchedule => vacancy.work_schedule.as_deref(),
            Column::CompanyName => vacancy.company_name.as_deref(),
            Column::SalaryFrom => None,
        }
    }

    fn number(self, vacancy: &Vacancy) -> Option<Decimal> {
        match self {
            Column::SalaryFrom => vacancy.salary_from,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// True when any needle is a case-insensitive substring of any column.
    Contains {
        columns: Vec<Column>,
        needles: Vec<String>,
    },
    Equals { column: Column, value: String },
    AtLeast { column: Column, value: Decimal },
}

impl Predicate {
    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::Contains { columns, needles } => {
                qb.push("(");
                let mut first = true;
                for needle in needles {
                    for column in columns {
                        if !first {
                            qb.push(" OR ");
                        }
                        first = false;
                        qb.push(column.sql())
                            .push(" ILIKE ")
                            .push_bind(like_pattern(needle));
                    }
                }
                qb.push(")");
            }
            Predicate::Equals { column, value } => {
                qb.push(column.sql()).push(" = ").push_bind(value.clone());
            }
            Predicate::AtLeast { column, value } => {
                qb.push(column.sql()).push(" >= ").push_bind(*value);
            }
        }
    }

    pub fn matches(&self, vacancy: &Vacancy) -> bool {
        match self {
            Predicate::Contains { columns, needles } => needles.iter().any(|needle| {
                let needle = needle.to_lowercase();
                columns.iter().any(|column| {
                    column
                        .text(vacancy)
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            }),
            Predicate::Equals { column, value } => column.text(vacancy) == Some(value.as_str()),
            // NULL >= x is not true in SQL either.
            Predicate::AtLeast { column, value } => {
                column.number(vacancy).is_some_and(|n| n >= *value)
            }
        }
    }
}

/// `%needle%` with LIKE metacharacters escaped so the needle matches literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterClause {
    predicates: Vec<Predicate>,
}

impl FilterClause {
    pub fn from_filter(filter: &VacancyFilter) -> Self {
        let mut predicates = Vec::new();

        if let Some(keywords) = filter.keywords() {
            predicates.push(Predicate::Contains {
                columns: vec![Column::Title, Column::Description],
                needles: vec![keywords.to_string()],
            });
        }
        let regions = filter.region_tokens();
        if !regions.is_empty() {
            predicates.push(Predicate::Contains {
                columns: vec![Column::Location],
                needles: regions.into_iter().map(str::to_string).collect(),
            });
        }
        if let Some(experience) = filter.experience() {
            predicates.push(Predicate::Equals {
                column: Column::Experience,
                value: experience.to_string(),
            });
        }
        if let Some(min) = filter.min_salary() {
            predicates.push(Predicate::AtLeast {
                column: Column::SalaryFrom,
                value: min,
            });
        }
        if let Some(schedule) = filter.schedule() {
            predicates.push(Predicate::Equals {
                column: Column::WorkSchedule,
                value: schedule.to_string(),
            });
        }
        if let Some(company) = filter.company_name() {
            predicates.push(Predicate::Contains {
                columns: vec![Column::CompanyName],
                needles: vec![company.to_string()],
            });
        }

        Self { predicates }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Appends ` WHERE p1 AND p2 ...`; appends nothing for an empty clause.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(qb);
        }
    }

    pub fn matches(&self, vacancy: &Vacancy) -> bool {
        self.predicates.iter().all(|p| p.matches(vacancy))
    }
}
