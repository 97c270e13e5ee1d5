use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, FromRow, Postgres, Type};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Interview,
    Rejected,
    Accepted,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Interview => "INTERVIEW",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Accepted => "ACCEPTED",
        }
    }

    /// Rejected and accepted applications are final.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, Interview) | (Pending, Rejected) | (Pending, Accepted)
                | (Interview, Rejected)
                | (Interview, Accepted)
        )
    }

    /// A student may submit again only when there is no prior attempt or the
    /// latest one was rejected.
    pub fn blocks_resubmission(self) -> bool {
        self != ApplicationStatus::Rejected
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ApplicationStatus::Pending),
            "INTERVIEW" => Ok(ApplicationStatus::Interview),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "ACCEPTED" => Ok(ApplicationStatus::Accepted),
            other => Err(format!("Unknown application status: {}", other)),
        }
    }
}

// Stored as TEXT.
impl Type<Postgres> for ApplicationStatus {
    fn type_info() -> PgTypeInfo {
        <&str as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <&str as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for ApplicationStatus {
    fn decode(value: PgValueRef<'r>) -> std::result::Result<Self, BoxDynError> {
        let raw = <&str as Decode<Postgres>>::decode(value)?;
        Ok(raw.parse::<ApplicationStatus>()?)
    }
}

impl Encode<'_, Postgres> for ApplicationStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub student_id: i64,
    pub vacancy_id: i64,
    pub cover_letter: String,
    pub submitted_date: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub updated_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForStudent {
    pub id: i64,
    pub vacancy_id: i64,
    pub vacancy_title: String,
    pub company_name: Option<String>,
    pub cover_letter: String,
    pub submitted_date: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub updated_date: DateTime<Utc>,
}
