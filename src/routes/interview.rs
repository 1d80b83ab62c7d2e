use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::interview_dto::{
    SessionResultsResponse, StartInterviewRequest, StartInterviewResponse, SubmitAnswerRequest,
    SubmitAnswerResponse,
};
use crate::middleware::auth::Claims;
use crate::services::engine::SubmitOutcome;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartInterviewRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user = state.user_service.resolve_or_create(&claims).await?;

    let start = state
        .engine
        .start_interview(&user, &req.job_level, &req.interview_type)
        .await?;

    Ok(Json(StartInterviewResponse {
        session_id: start.session_id,
        question: start.first_question,
        question_number: start.question_number,
        total_questions: start.total_questions,
        job_role: start.job_role,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    // Resolving the caller keeps unauthenticated-but-signed tokens from
    // driving sessions; ownership itself is checked on the results read.
    let _user = state.user_service.resolve_or_create(&claims).await?;

    let outcome = state
        .engine
        .submit_answer(
            session_id,
            req.question_id,
            &req.answer_text,
            req.current_question_index,
        )
        .await?;

    let response = match outcome {
        SubmitOutcome::InProgress {
            session_id,
            feedback,
            next_question,
            question_number,
            total_questions,
            current_question_index,
        } => SubmitAnswerResponse {
            completed: false,
            session_id,
            current_question_feedback: feedback,
            next_question: Some(next_question),
            question_number: Some(question_number),
            current_question_index: Some(current_question_index),
            total_questions,
            comprehensive_feedback: None,
            answers: None,
            duration_seconds: None,
        },
        SubmitOutcome::Completed {
            session_id,
            feedback,
            comprehensive,
            answers,
            duration_seconds,
        } => SubmitAnswerResponse {
            completed: true,
            session_id,
            current_question_feedback: feedback,
            next_question: None,
            question_number: None,
            current_question_index: None,
            total_questions: answers.len() as i32,
            comprehensive_feedback: Some(comprehensive),
            answers: Some(answers),
            duration_seconds: Some(duration_seconds),
        },
    };

    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn get_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user = state.user_service.resolve_or_create(&claims).await?;
    let results = state.engine.get_results(session_id, &user).await?;

    Ok(Json(SessionResultsResponse {
        session_id: results.session_id,
        interview_type: results.interview_type,
        job_role: results.job_role,
        job_level: results.job_level,
        completed: results.completed,
        total_questions: results.total_questions,
        duration_seconds: results.duration_seconds,
        overall_score: results.overall_score,
        overall_feedback: results.overall_feedback,
        improvements: results.improvements,
        answers: results.answers,
    })
    .into_response())
}
