use crate::error::{Error, Result};
use crate::models::feedback::{AnswerFeedback, ComprehensiveFeedback};
use crate::models::question::Question;
use crate::models::session::{AnsweredQuestion, InterviewSession};
use crate::models::user::User;
use crate::services::catalog::QuestionCatalog;
use crate::services::feedback_service::{
    AnswerScoringRequest, AnsweredSummary, ComprehensiveScoringRequest, FeedbackProvider,
};
use crate::services::session_store::{CompletionUpdate, SessionConfig, SessionStore};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Drives a multi-question interview from start to finish: strictly sequential,
/// catalog-order answering, at-most-once per question, completion exactly once.
///
/// All collaborators are injected trait objects; the engine never talks to the
/// database or the network directly.
#[derive(Clone)]
pub struct SessionProgressionEngine {
    catalog: Arc<dyn QuestionCatalog>,
    store: Arc<dyn SessionStore>,
    feedback: Arc<dyn FeedbackProvider>,
}

#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session_id: Uuid,
    pub first_question: Question,
    pub question_number: i32,
    pub total_questions: i32,
    pub job_role: String,
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    InProgress {
        session_id: Uuid,
        feedback: AnswerFeedback,
        next_question: Question,
        question_number: i32,
        total_questions: i32,
        current_question_index: i32,
    },
    Completed {
        session_id: Uuid,
        feedback: AnswerFeedback,
        comprehensive: ComprehensiveFeedback,
        answers: Vec<AnsweredQuestion>,
        duration_seconds: i32,
    },
}

#[derive(Debug, Clone)]
pub struct SessionResults {
    pub session_id: Uuid,
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

#[derive(Debug, Clone)]
pub struct QuestionLookup {
    pub question: Question,
    pub question_number: i32,
    pub total_questions: i32,
    pub question_index: i32,
}

impl SessionProgressionEngine {
    pub fn new(
        catalog: Arc<dyn QuestionCatalog>,
        store: Arc<dyn SessionStore>,
        feedback: Arc<dyn FeedbackProvider>,
    ) -> Self {
        Self {
            catalog,
            store,
            feedback,
        }
    }

    pub async fn start_interview(
        &self,
        user: &User,
        job_level: &str,
        interview_type: &str,
    ) -> Result<SessionStart> {
        if job_level.trim().is_empty() {
            return Err(Error::Validation("Job level is required".to_string()));
        }
        if interview_type.trim().is_empty() {
            return Err(Error::Validation("Interview type is required".to_string()));
        }

        let job_role = user
            .job_role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                Error::Config("User profile does not have a job role configured".to_string())
            })?
            .to_string();

        let catalog = self.catalog.list_all().await?;
        let first_question = catalog
            .first()
            .cloned()
            .ok_or_else(|| Error::NotFound("No interview questions available".to_string()))?;
        let total_questions = catalog.len() as i32;

        let session = self
            .store
            .create(SessionConfig {
                user_id: user.id,
                job_role: job_role.clone(),
                job_level: job_level.trim().to_string(),
                interview_type: interview_type.trim().to_string(),
                total_questions,
            })
            .await?;

        tracing::info!(
            session_id = %session.id,
            user_id = %user.id,
            total_questions,
            "interview session started"
        );

        Ok(SessionStart {
            session_id: session.id,
            first_question,
            question_number: 1,
            total_questions,
            job_role,
        })
    }

    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answer_text: &str,
        current_question_index: i64,
    ) -> Result<SubmitOutcome> {
        if answer_text.trim().is_empty() {
            return Err(Error::Validation("Answer text is required".to_string()));
        }
        if current_question_index < 0 {
            return Err(Error::Validation(
                "Question index must be a non-negative integer".to_string(),
            ));
        }

        // A lost compare-and-swap means another submission advanced the
        // session between our read and our write. One full re-validation pass
        // gives honest errors (duplicate, out of sequence) instead of a bare
        // conflict where possible.
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .try_submit(session_id, question_id, answer_text, current_question_index)
                .await
            {
                Err(Error::Conflict(reason)) if attempt == 1 => {
                    tracing::warn!(%session_id, reason = %reason, "submission conflict, retrying once");
                }
                outcome => return outcome,
            }
        }
    }

    async fn try_submit(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answer_text: &str,
        current_question_index: i64,
    ) -> Result<SubmitOutcome> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| Error::NotFound("Interview session not found".to_string()))?;

        if session.is_completed() {
            return Err(Error::Validation(
                "Interview session is already completed".to_string(),
            ));
        }

        let catalog = self.catalog.list_all().await?;
        if !catalog.iter().any(|q| q.id == question_id) {
            return Err(Error::NotFound("Question not found".to_string()));
        }

        let index = current_question_index as usize;
        let expected = catalog.get(index).filter(|q| q.id == question_id);
        let Some(question) = expected.cloned() else {
            return Err(Error::Validation(
                "Question does not match the current interview position".to_string(),
            ));
        };

        let mut answered = session.answered()?;
        if answered.iter().any(|a| a.question_id == question_id) {
            // All answers recorded but completed_at still NULL means the
            // comprehensive-feedback call died after the final append. A
            // resubmission of that final answer resumes the completion
            // transition from the stored record instead of conflicting,
            // otherwise the session would be stranded forever.
            if answered.len() == session.total_questions as usize {
                if let Some(last_answer) = answered.pop() {
                    if last_answer.question_id == question_id {
                        tracing::warn!(
                            %session_id,
                            "resuming interrupted completion transition"
                        );
                        let last_feedback = last_answer.feedback.clone();
                        return self
                            .finish_session(&session, answered, last_answer, last_feedback)
                            .await;
                    }
                }
            }
            return Err(Error::Conflict(
                "This question has already been answered".to_string(),
            ));
        }
        if index != answered.len() {
            return Err(Error::Validation(
                "Answer submitted out of sequence".to_string(),
            ));
        }

        // Session metadata and the catalog entry drive the scoring request;
        // nothing scoring-relevant is taken from client input.
        let scoring_request = AnswerScoringRequest {
            question: question.question.clone(),
            answer: answer_text.to_string(),
            job_role: session.job_role.clone(),
            job_level: session.job_level.clone(),
            interview_type: session.interview_type.clone(),
            question_type: question.question_type.clone(),
        };

        // Provider call happens before any write: a failed call aborts the
        // submission with nothing persisted, so the client can safely retry.
        let feedback = self.feedback.score_answer(&scoring_request).await?;

        let answered_question = AnsweredQuestion {
            question_id,
            question: question.question.clone(),
            answer: answer_text.to_string(),
            question_type: question.question_type.clone(),
            feedback: feedback.clone(),
            answered_at: Utc::now(),
        };

        self.store
            .append_answer(session_id, index, &answered_question)
            .await?;

        let total_questions = session.total_questions;
        let next_index = index as i32 + 1;

        if next_index < total_questions {
            let next_question = catalog
                .get(next_index as usize)
                .cloned()
                .ok_or_else(|| Error::Internal("Question catalog shrank mid-session".to_string()))?;

            return Ok(SubmitOutcome::InProgress {
                session_id,
                feedback,
                next_question,
                question_number: next_index + 1,
                total_questions,
                current_question_index: next_index,
            });
        }

        self.finish_session(&session, answered, answered_question, feedback)
            .await
    }

    /// Completion transition: fires once, guarded by the store. The
    /// comprehensive-feedback call precedes the completion write so a provider
    /// failure leaves nothing half-finalized; resubmitting the final answer
    /// re-enters here through the resume branch in `try_submit`.
    async fn finish_session(
        &self,
        session: &InterviewSession,
        previously_answered: Vec<AnsweredQuestion>,
        last_answer: AnsweredQuestion,
        last_feedback: AnswerFeedback,
    ) -> Result<SubmitOutcome> {
        let mut answers = previously_answered;
        answers.push(last_answer);

        let duration_seconds = (Utc::now() - session.started_at).num_seconds().max(0) as i32;

        let questions = answers
            .iter()
            .enumerate()
            .map(|(i, a)| AnsweredSummary {
                question_number: i as i32 + 1,
                question: a.question.clone(),
                answer: a.answer.clone(),
                score: a.feedback.score,
                feedback: a.feedback.feedback.clone(),
            })
            .collect();

        let comprehensive = self
            .feedback
            .score_comprehensive(&ComprehensiveScoringRequest {
                job_role: session.job_role.clone(),
                job_level: session.job_level.clone(),
                interview_type: session.interview_type.clone(),
                questions,
            })
            .await?;

        self.store
            .complete(
                session.id,
                CompletionUpdate {
                    duration_seconds,
                    overall_score: comprehensive.overall_score,
                    overall_feedback: comprehensive.overall_feedback.clone(),
                    improvements: comprehensive.improvements.clone(),
                },
            )
            .await?;

        tracing::info!(
            session_id = %session.id,
            duration_seconds,
            overall_score = comprehensive.overall_score,
            "interview session completed"
        );

        Ok(SubmitOutcome::Completed {
            session_id: session.id,
            feedback: last_feedback,
            comprehensive,
            answers,
            duration_seconds,
        })
    }

    pub async fn get_results(&self, session_id: Uuid, user: &User) -> Result<SessionResults> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| Error::NotFound("Interview session not found".to_string()))?;

        if session.user_id != user.id {
            return Err(Error::Forbidden(
                "You do not have access to this interview session".to_string(),
            ));
        }

        let answers = session.answered()?;
        let improvements = session
            .improvements
            .clone()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        Ok(SessionResults {
            session_id: session.id,
            interview_type: session.interview_type,
            job_role: session.job_role,
            job_level: session.job_level,
            completed: session.completed_at.is_some(),
            total_questions: session.total_questions,
            duration_seconds: session.duration_seconds,
            overall_score: session.overall_score,
            overall_feedback: session.overall_feedback,
            improvements,
            answers,
        })
    }

    /// Pure catalog lookup, deliberately session-independent.
    pub async fn get_question_by_index(&self, index: i64) -> Result<QuestionLookup> {
        if index < 0 {
            return Err(Error::Validation(
                "Question index must be a non-negative integer".to_string(),
            ));
        }

        let catalog = self.catalog.list_all().await?;
        let total_questions = catalog.len() as i32;
        let question = catalog
            .into_iter()
            .nth(index as usize)
            .ok_or_else(|| Error::NotFound("Question index out of range".to_string()))?;

        Ok(QuestionLookup {
            question,
            question_number: index as i32 + 1,
            total_questions,
            question_index: index as i32,
        })
    }
}
