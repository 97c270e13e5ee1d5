pub mod application;
pub mod recommendation;
pub mod vacancy;
pub mod vacancy_filter;
