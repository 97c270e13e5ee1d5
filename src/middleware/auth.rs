use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Employer,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("student") {
            Some(Role::Student)
        } else if raw.eq_ignore_ascii_case("employer") {
            Some(Role::Employer)
        } else {
            None
        }
    }
}

/// Caller identity derived from a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

/// HS256 verifier for tokens issued by the auth service.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, Error> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|_| Error::Unauthorized("Invalid or expired token".to_string()))?;
        let id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| Error::Unauthorized("Invalid token subject".to_string()))?;
        let role = data
            .claims
            .role
            .as_deref()
            .and_then(Role::parse)
            .ok_or_else(|| Error::Forbidden("Unknown user role".to_string()))?;
        Ok(AuthUser { id, role })
    }
}

fn bearer_token(req: &Request) -> Result<Option<&str>, Error> {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| Error::Unauthorized("Malformed Authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim()))
        .ok_or_else(|| Error::Unauthorized("Unsupported authorization scheme".to_string()))
}

fn authenticate(state: &AppState, req: &Request) -> Result<AuthUser, Error> {
    let token = bearer_token(req)?
        .ok_or_else(|| Error::Unauthorized("Missing Authorization header".to_string()))?;
    state.jwt.verify(token)
}

/// Attaches an [`AuthUser`] when a valid token is present. Missing or invalid
/// tokens fall through as anonymous requests.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Ok(user) = authenticate(&state, &req) {
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

async fn require_role(state: &AppState, mut req: Request, next: Next, role: Role) -> Response {
    let user = match authenticate(state, &req) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    if user.role != role {
        return Error::Forbidden("Insufficient role".to_string()).into_response();
    }
    req.extensions_mut().insert(user);
    next.run(req).await
}

pub async fn require_employer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_role(&state, req, next, Role::Employer).await
}

pub async fn require_student(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_role(&state, req, next, Role::Student).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, sub: &str, role: Option<&str>, exp_offset: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + exp_offset) as usize;
        let claims = Claims {
            sub: sub.to_string(),
            exp,
            role: role.map(str::to_string),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verifies_subject_and_role() {
        let verifier = JwtVerifier::new("secret");
        let user = verifier
            .verify(&token("secret", "42", Some("EMPLOYER"), 3600))
            .unwrap();
        assert_eq!(user, AuthUser { id: 42, role: Role::Employer });
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let verifier = JwtVerifier::new("secret");
        assert!(matches!(
            verifier.verify(&token("other", "1", Some("student"), 3600)),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            verifier.verify(&token("secret", "1", Some("student"), -3600)),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_subject_and_unknown_role() {
        let verifier = JwtVerifier::new("secret");
        assert!(matches!(
            verifier.verify(&token("secret", "abc", Some("student"), 3600)),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            verifier.verify(&token("secret", "1", Some("admin"), 3600)),
            Err(Error::Forbidden(_))
        ));
    }
}
