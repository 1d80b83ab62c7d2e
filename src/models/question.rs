use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One immutable catalog entry. Seeded by migration, ordered by `position`,
/// never mutated after that.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub position: i32,
    pub question: String,
    pub question_type: String,
}
