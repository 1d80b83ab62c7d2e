pub mod catalog;
pub mod engine;
pub mod feedback_service;
pub mod session_store;
pub mod user_service;
