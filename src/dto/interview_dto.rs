use crate::models::feedback::{AnswerFeedback, ComprehensiveFeedback};
use crate::models::question::Question;
use crate::models::session::AnsweredQuestion;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartInterviewRequest {
    #[validate(length(min = 1, message = "job_level is required"))]
    pub job_level: String,
    #[validate(length(min = 1, message = "interview_type is required"))]
    pub interview_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartInterviewResponse {
    pub session_id: uuid::Uuid,
    pub question: Question,
    pub question_number: i32,
    pub total_questions: i32,
    pub job_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: uuid::Uuid,
    #[validate(length(min = 1, message = "answer_text is required"))]
    pub answer_text: String,
    #[validate(range(min = 0, message = "current_question_index must be non-negative"))]
    pub current_question_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub completed: bool,
    pub session_id: uuid::Uuid,
    pub current_question_feedback: AnswerFeedback,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question_index: Option<i32>,
    pub total_questions: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comprehensive_feedback: Option<ComprehensiveFeedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnsweredQuestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResultsResponse {
    pub session_id: uuid::Uuid,
    pub interview_type: String,
    pub job_role: String,
    pub job_level: String,
    pub completed: bool,
    pub total_questions: i32,
    pub duration_seconds: Option<i32>,
    pub overall_score: Option<f64>,
    pub overall_feedback: Option<String>,
    pub improvements: Vec<String>,
    pub answers: Vec<AnsweredQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionByIndexResponse {
    pub question: Question,
    pub question_number: i32,
    pub total_questions: i32,
    pub question_index: i32,
}
