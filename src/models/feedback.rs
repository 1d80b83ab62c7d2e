use serde::{Deserialize, Serialize};

/// Per-answer scoring payload from the external provider. Stored verbatim
/// inside the session's answered-question entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub score: f64,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

/// Whole-session scoring payload, computed once at completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveFeedback {
    pub overall_score: f64,
    pub overall_feedback: String,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_to_improve: Vec<String>,
    #[serde(default)]
    pub per_question_feedback: Vec<PerQuestionFeedback>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerQuestionFeedback {
    pub question_number: i32,
    pub question: String,
    pub feedback: String,
    pub score: f64,
}
