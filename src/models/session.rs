use crate::error::Result;
use crate::models::feedback::AnswerFeedback;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One interview attempt by one user. Answered questions are embedded as a
/// JSONB array in answer order, keyed by `question_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_role: String,
    pub job_level: String,
    pub interview_type: String,
    pub total_questions: i32,
    pub started_at: DateTime<Utc>,
    pub answered_questions: JsonValue,
    pub duration_seconds: Option<i32>,
    pub overall_score: Option<f64>,
    pub overall_feedback: Option<String>,
    pub improvements: Option<JsonValue>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    pub fn answered(&self) -> Result<Vec<AnsweredQuestion>> {
        let answered = serde_json::from_value(self.answered_questions.clone())?;
        Ok(answered)
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// One recorded answer within a session. Immutable once created; at most one
/// per distinct `question_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question_id: Uuid,
    /// Question text snapshotted at answer time, not re-derived from the catalog.
    pub question: String,
    pub answer: String,
    pub question_type: String,
    pub feedback: AnswerFeedback,
    pub answered_at: DateTime<Utc>,
}
