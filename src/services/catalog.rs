use crate::error::Result;
use crate::models::question::Question;
use async_trait::async_trait;
use sqlx::PgPool;

/// Read-only ordered question list. Order is stable across calls within a
/// deployment; the catalog is never reseeded mid-flight.
#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Question>>;
}

#[derive(Clone)]
pub struct PgQuestionCatalog {
    pool: PgPool,
}

impl PgQuestionCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionCatalog for PgQuestionCatalog {
    async fn list_all(&self) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT id, position, question, question_type
               FROM interview_questions
               ORDER BY position ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}
