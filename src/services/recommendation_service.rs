use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::recommendation::{MlRecommendation, MlResponse};

/// Skill-based scoring backed by the external ML service.
#[async_trait]
pub trait RecommendationClient: Send + Sync {
    /// Ranked recommendations for a free-text skill set.
    async fn recommend(&self, skills: &str) -> Result<Vec<MlRecommendation>>;
}

#[derive(Clone)]
pub struct HttpRecommendationClient {
    client: Client,
    base_url: String,
}

impl HttpRecommendationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

#[async_trait]
impl RecommendationClient for HttpRecommendationClient {
    async fn recommend(&self, skills: &str) -> Result<Vec<MlRecommendation>> {
        let url = format!("{}/recommend", self.base_url);
        tracing::debug!(%url, "requesting recommendations");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "student_skills": skills }))
            .send()
            .await
            .map_err(|e| Error::RecommendationService(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RecommendationService(format!(
                "ML service returned {}: {}",
                status, body
            )));
        }

        let parsed = response
            .json::<MlResponse>()
            .await
            .map_err(|e| Error::RecommendationService(format!("invalid response body: {}", e)))?;

        tracing::info!(count = parsed.recommendations.len(), "received recommendations");
        Ok(parsed.recommendations)
    }
}
