use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::models::application::{Application, ApplicationForStudent, ApplicationStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationPayload {
    #[serde(default, alias = "cover_letter")]
    #[validate(length(max = 5000))]
    pub cover_letter: String,
}

impl SubmitApplicationPayload {
    /// An empty or whitespace-only body submits without a cover letter.
    /// Anything else must be a valid JSON payload.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(body)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateApplicationStatusPayload {
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentApplicationsResponse {
    pub applications: Vec<ApplicationForStudent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VacancyApplicationsResponse {
    pub applications: Vec<Application>,
}
