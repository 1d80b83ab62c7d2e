pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::catalog::PgQuestionCatalog;
use crate::services::engine::SessionProgressionEngine;
use crate::services::feedback_service::OpenAiFeedbackProvider;
use crate::services::session_store::PgSessionStore;
use crate::services::user_service::UserService;
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: SessionProgressionEngine,
    pub user_service: UserService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.feedback_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        let catalog = Arc::new(PgQuestionCatalog::new(pool.clone()));
        let store = Arc::new(PgSessionStore::new(pool.clone()));
        let feedback = Arc::new(OpenAiFeedbackProvider::new(
            config.openai_api_key.clone(),
            http_client,
            Duration::from_secs(config.feedback_timeout_secs),
        ));

        let engine = SessionProgressionEngine::new(catalog, store, feedback);
        let user_service = UserService::new(pool.clone());

        Self {
            pool,
            engine,
            user_service,
        }
    }
}
