use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::user_dto::{UpdateProfileRequest, UserResponse};
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let user = state.user_service.resolve_or_create(&claims).await?;
    Ok(Json(UserResponse::from(user)).into_response())
}

#[axum::debug_handler]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user = state.user_service.resolve_or_create(&claims).await?;
    let updated = state
        .user_service
        .update_profile(user.id, req.name, req.job_role, req.job_level)
        .await?;
    Ok(Json(UserResponse::from(updated)).into_response())
}
