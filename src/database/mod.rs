pub mod application_store;
pub mod filter_query;
pub mod pool;
pub mod vacancy_store;
