use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::interview_dto::QuestionByIndexResponse;
use crate::AppState;

/// Public, session-independent catalog lookup.
#[axum::debug_handler]
pub async fn get_question_by_index(
    State(state): State<AppState>,
    Path(index): Path<i64>,
) -> crate::error::Result<Response> {
    let lookup = state.engine.get_question_by_index(index).await?;

    Ok(Json(QuestionByIndexResponse {
        question: lookup.question,
        question_number: lookup.question_number,
        total_questions: lookup.total_questions,
        question_index: lookup.question_index,
    })
    .into_response())
}
