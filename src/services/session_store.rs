use crate::error::{Error, Result};
use crate::models::session::{AnsweredQuestion, InterviewSession};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_id: Uuid,
    pub job_role: String,
    pub job_level: String,
    pub interview_type: String,
    pub total_questions: i32,
}

#[derive(Debug, Clone)]
pub struct CompletionUpdate {
    pub duration_seconds: i32,
    pub overall_score: f64,
    pub overall_feedback: String,
    pub improvements: Vec<String>,
}

/// Persistence seam for interview sessions. `append_answer` is a guarded
/// compare-and-swap: it fails with `Conflict` unless the stored answer count
/// still equals `expected_index`, the question id is not already present, and
/// the session is not completed. `complete` fires at most once per session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, config: SessionConfig) -> Result<InterviewSession>;

    async fn get(&self, id: Uuid) -> Result<Option<InterviewSession>>;

    async fn append_answer(
        &self,
        id: Uuid,
        expected_index: usize,
        answer: &AnsweredQuestion,
    ) -> Result<()>;

    async fn complete(&self, id: Uuid, update: CompletionUpdate) -> Result<()>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, config: SessionConfig) -> Result<InterviewSession> {
        let session = sqlx::query_as::<_, InterviewSession>(
            r#"
            INSERT INTO interview_sessions
                (user_id, job_role, job_level, interview_type, total_questions)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(config.user_id)
        .bind(config.job_role)
        .bind(config.job_level)
        .bind(config.interview_type)
        .bind(config.total_questions)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<InterviewSession>> {
        let session = sqlx::query_as::<_, InterviewSession>(
            r#"SELECT * FROM interview_sessions WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn append_answer(
        &self,
        id: Uuid,
        expected_index: usize,
        answer: &AnsweredQuestion,
    ) -> Result<()> {
        let answer_json = serde_json::to_value(answer)?;

        // Single atomic statement: the WHERE clause re-checks the ordering,
        // duplicate and completion invariants, so two racing submissions for
        // the same slot cannot both land.
        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET answered_questions = answered_questions || $2::jsonb,
                updated_at = NOW()
            WHERE id = $1
              AND completed_at IS NULL
              AND jsonb_array_length(answered_questions) = $3
              AND NOT EXISTS (
                  SELECT 1 FROM jsonb_array_elements(answered_questions) a
                  WHERE a->>'question_id' = $4
              )
            "#,
        )
        .bind(id)
        .bind(serde_json::json!([answer_json]))
        .bind(expected_index as i32)
        .bind(answer.question_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(
                "Answer was not recorded: the session advanced concurrently".to_string(),
            ));
        }
        Ok(())
    }

    async fn complete(&self, id: Uuid, update: CompletionUpdate) -> Result<()> {
        let improvements = serde_json::to_value(&update.improvements)?;

        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET completed_at = NOW(),
                duration_seconds = $2,
                overall_score = $3,
                overall_feedback = $4,
                improvements = $5,
                updated_at = NOW()
            WHERE id = $1
              AND completed_at IS NULL
            "#,
        )
        .bind(id)
        .bind(update.duration_seconds)
        .bind(update.overall_score)
        .bind(update.overall_feedback)
        .bind(improvements)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(
                "Interview session is already completed".to_string(),
            ));
        }
        Ok(())
    }
}
