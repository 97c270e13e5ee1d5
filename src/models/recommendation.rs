use serde::{Deserialize, Serialize};

use crate::models::vacancy::Vacancy;

/// One scored vacancy as returned by the ML service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlRecommendation {
    pub vacancy_id: i64,
    pub similarity_score: f64,
    pub match_percentage: i32,
    #[serde(default)]
    pub matching_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub skills_matched: i32,
    #[serde(default)]
    pub total_skills_required: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlResponse {
    #[serde(default)]
    pub recommendations: Vec<MlRecommendation>,
}

/// A stored vacancy decorated with its recommendation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct VacancyMlResponse {
    #[serde(flatten)]
    pub vacancy: Vacancy,
    pub similarity_score: f64,
    pub match_percentage: i32,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub skills_matched: i32,
    pub total_skills_required: i32,
}

impl VacancyMlResponse {
    pub fn new(vacancy: Vacancy, rec: MlRecommendation) -> Self {
        Self {
            vacancy,
            similarity_score: rec.similarity_score,
            match_percentage: rec.match_percentage,
            matching_skills: rec.matching_skills,
            missing_skills: rec.missing_skills,
            skills_matched: rec.skills_matched,
            total_skills_required: rec.total_skills_required,
        }
    }
}
