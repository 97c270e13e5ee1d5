pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::database::{application_store::PgApplicationStore, vacancy_store::PgVacancyStore};
use crate::error::Result;
use crate::middleware::auth::{optional_auth, require_employer, require_student, JwtVerifier};
use crate::middleware::cors::cors_layer;
use crate::services::{
    application_service::ApplicationService,
    count_cache::CountCache,
    recommendation_service::HttpRecommendationClient,
    vacancy_service::VacancyService,
};

#[derive(Clone)]
pub struct AppState {
    pub vacancy_service: VacancyService,
    pub application_service: ApplicationService,
    pub jwt: Arc<JwtVerifier>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config, count_cache: Arc<dyn CountCache>) -> Result<Self> {
        let vacancy_store = Arc::new(PgVacancyStore::new(pool.clone()));
        let application_store = Arc::new(PgApplicationStore::new(pool));
        let recommender = Arc::new(HttpRecommendationClient::new(
            config.ml_service_url.clone(),
            config.ml_timeout(),
        )?);

        let vacancy_service = VacancyService::new(
            vacancy_store.clone(),
            recommender,
            count_cache,
            config.count_cache_ttl(),
        );
        let application_service = ApplicationService::new(application_store, vacancy_store);

        Ok(Self::from_services(
            vacancy_service,
            application_service,
            &config.jwt_secret,
        ))
    }

    pub fn from_services(
        vacancy_service: VacancyService,
        application_service: ApplicationService,
        jwt_secret: &str,
    ) -> Self {
        Self {
            vacancy_service,
            application_service,
            jwt: Arc::new(JwtVerifier::new(jwt_secret)),
        }
    }
}

/// Transport settings applied around the API routes.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub cors_allowed_origin: Option<String>,
    pub request_timeout: Duration,
}

impl HttpOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cors_allowed_origin: config.cors_allowed_origin.clone(),
            request_timeout: config.request_timeout(),
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            cors_allowed_origin: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub fn build_router(state: AppState, options: &HttpOptions) -> Router {
    let public = Router::new()
        .route("/vacancies/search", get(routes::vacancy::search_vacancies))
        .route("/vacancies/regions", get(routes::vacancy::list_regions));

    let optional = Router::new()
        .route("/vacancies", get(routes::vacancy::list_vacancies))
        .route("/vacancies/:id", get(routes::vacancy::get_vacancy))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let employer = Router::new()
        .route("/vacancies", post(routes::vacancy::create_vacancy))
        .route(
            "/vacancies/:id",
            put(routes::vacancy::update_vacancy).delete(routes::vacancy::delete_vacancy),
        )
        .route(
            "/employers/me/vacancies",
            get(routes::vacancy::employer_vacancies),
        )
        .route(
            "/vacancies/:id/applications",
            get(routes::application::vacancy_applications),
        )
        .route(
            "/applications/:id",
            patch(routes::application::update_status),
        )
        .route_layer(from_fn_with_state(state.clone(), require_employer));

    let student = Router::new()
        .route("/vacancies/:id/apply", post(routes::application::apply))
        .route("/applications/me", get(routes::application::my_applications))
        .route_layer(from_fn_with_state(state.clone(), require_student));

    let api = public.merge(optional).merge(employer).merge(student);

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(cors_layer(options.cors_allowed_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
}
