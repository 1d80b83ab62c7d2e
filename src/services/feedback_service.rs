use crate::error::{Error, Result};
use crate::models::feedback::{AnswerFeedback, ComprehensiveFeedback};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct AnswerScoringRequest {
    pub question: String,
    pub answer: String,
    pub job_role: String,
    pub job_level: String,
    pub interview_type: String,
    pub question_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnsweredSummary {
    pub question_number: i32,
    pub question: String,
    pub answer: String,
    pub score: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveScoringRequest {
    pub job_role: String,
    pub job_level: String,
    pub interview_type: String,
    pub questions: Vec<AnsweredSummary>,
}

/// External AI scoring service. Unavailability surfaces as a provider error,
/// never as a silently empty result.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn score_answer(&self, request: &AnswerScoringRequest) -> Result<AnswerFeedback>;

    async fn score_comprehensive(
        &self,
        request: &ComprehensiveScoringRequest,
    ) -> Result<ComprehensiveFeedback>;
}

#[derive(Clone)]
pub struct OpenAiFeedbackProvider {
    client: Client,
    api_key: String,
    timeout: Duration,
}

impl OpenAiFeedbackProvider {
    pub fn new(api_key: String, client: Client, timeout: Duration) -> Self {
        Self {
            client,
            api_key,
            timeout,
        }
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<JsonValue> {
        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("OpenAI API error {}: {}", status, text)));
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| Error::Provider("Invalid OpenAI response format".to_string()))
    }
}

#[async_trait]
impl FeedbackProvider for OpenAiFeedbackProvider {
    async fn score_answer(&self, request: &AnswerScoringRequest) -> Result<AnswerFeedback> {
        let system_prompt = r#"You are a senior interviewer evaluating one answer from a mock interview.
Score the answer against the question, the candidate's target role, level and interview type.
Return a JSON object: {
  "score": <0-10, one decimal allowed>,
  "feedback": "<2-4 sentences of direct, specific feedback>",
  "strengths": ["..."],
  "improvements": ["..."],
  "tips": ["..."]
}
Be honest: a vague or off-topic answer scores low. Never return an empty object."#;

        let payload = serde_json::json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": serde_json::to_string(request)?}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.4
        });

        let response = self.chat_openai(payload).await?;
        let feedback: AnswerFeedback = serde_json::from_value(response)
            .map_err(|e| Error::Provider(format!("Malformed answer feedback: {}", e)))?;

        tracing::info!(score = feedback.score, "single-answer feedback received");
        Ok(feedback)
    }

    async fn score_comprehensive(
        &self,
        request: &ComprehensiveScoringRequest,
    ) -> Result<ComprehensiveFeedback> {
        let system_prompt = r#"You are a senior interviewer writing a final evaluation for a completed mock interview.
You receive every question, the candidate's answer and the per-answer feedback already given.
Return a JSON object: {
  "overall_score": <0-10>,
  "overall_feedback": "<a short paragraph summarising the whole interview>",
  "strengths": ["..."],
  "improvements": ["..."],
  "areas_to_improve": ["..."],
  "per_question_feedback": [
    {"question_number": <n>, "question": "...", "feedback": "...", "score": <0-10>}
  ]
}
Include one per_question_feedback entry for every question, in order."#;

        let payload = serde_json::json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": serde_json::to_string(request)?}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.4
        });

        let response = self.chat_openai(payload).await?;
        let feedback: ComprehensiveFeedback = serde_json::from_value(response)
            .map_err(|e| Error::Provider(format!("Malformed comprehensive feedback: {}", e)))?;

        tracing::info!(
            overall_score = feedback.overall_score,
            questions = request.questions.len(),
            "comprehensive feedback received"
        );
        Ok(feedback)
    }
}
