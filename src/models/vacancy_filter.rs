use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Search criteria for the vacancy board. Blank fields are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VacancyFilter {
    pub keywords: Option<String>,
    pub region: Option<String>,
    pub experience: Option<String>,
    pub salary_from: Option<Decimal>,
    pub schedule: Option<String>,
    pub company_name: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl VacancyFilter {
    pub fn keywords(&self) -> Option<&str> {
        present(&self.keywords)
    }

    /// Comma-separated location fragments, trimmed, empty ones dropped.
    pub fn region_tokens(&self) -> Vec<&str> {
        present(&self.region)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn experience(&self) -> Option<&str> {
        present(&self.experience)
    }

    /// A zero or negative floor filters nothing, so it counts as absent.
    pub fn min_salary(&self) -> Option<Decimal> {
        self.salary_from.filter(|s| *s > Decimal::ZERO)
    }

    pub fn schedule(&self) -> Option<&str> {
        present(&self.schedule)
    }

    pub fn company_name(&self) -> Option<&str> {
        present(&self.company_name)
    }

    pub fn is_empty(&self) -> bool {
        self.keywords().is_none()
            && self.region_tokens().is_empty()
            && self.experience().is_none()
            && self.min_salary().is_none()
            && self.schedule().is_none()
            && self.company_name().is_none()
    }

    /// Canonical cache key. Filters that select the same rows produce the same
    /// fingerprint: case is folded for the case-insensitive fields and region
    /// tokens are deduplicated and sorted.
    pub fn fingerprint(&self) -> String {
        let mut regions: Vec<String> = self
            .region_tokens()
            .into_iter()
            .map(str::to_lowercase)
            .collect();
        regions.sort();
        regions.dedup();

        let canonical = json!({
            "keywords": self.keywords().map(str::to_lowercase),
            "region": regions,
            "experience": self.experience(),
            "salary_from": self.min_salary().map(|s| s.normalize().to_string()),
            "schedule": self.schedule(),
            "company_name": self.company_name().map(str::to_lowercase),
        });
        format!("count:{}", canonical)
    }
}
