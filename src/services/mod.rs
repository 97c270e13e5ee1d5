pub mod application_service;
pub mod count_cache;
pub mod recommendation_service;
pub mod vacancy_service;
