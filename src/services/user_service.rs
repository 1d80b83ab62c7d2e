use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::models::user::User;
use sqlx::PgPool;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE external_id = $1"#)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Resolve the caller from verified identity-provider claims, creating the
    /// local row on first login. Name/email from the token are only applied at
    /// creation; the local profile is the source of truth afterwards.
    pub async fn resolve_or_create(&self, claims: &Claims) -> Result<User> {
        if let Some(user) = self.find_by_external_id(&claims.sub).await? {
            return Ok(user);
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (external_id) DO UPDATE SET updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(&claims.sub)
        .bind(claims.name.clone().unwrap_or_default())
        .bind(claims.email.clone().unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, "provisioned user from identity provider");
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        user_id: uuid::Uuid,
        name: Option<String>,
        job_role: Option<String>,
        job_level: Option<String>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                job_role = COALESCE($3, job_role),
                job_level = COALESCE($4, job_level),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(job_role)
        .bind(job_level)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
