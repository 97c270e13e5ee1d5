pub mod application;
pub mod health;
pub mod vacancy;
