use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::model::{Role, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, active, \
     password_reset_token_hash, password_reset_expires, created_at";

impl User {
    /// Find an active user by email. Deactivated accounts are invisible here.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND active = TRUE"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Find an active user by id. Used by the authenticate guard on every
    /// request, so a deleted user fails auth even with a live token.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND active = TRUE"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(db)
        .await
    }

    pub async fn list(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE active = TRUE ORDER BY created_at"
        ))
        .fetch_all(db)
        .await
    }

    /// Profile update; only name and email are touchable through this path.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET name = COALESCE($2, name), email = COALESCE($3, email)
             WHERE id = $1 AND active = TRUE
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_one(db)
        .await
    }

    /// New password hash; any pending reset token is consumed with it.
    pub async fn update_password(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET password_hash = $2,
                 password_reset_token_hash = NULL,
                 password_reset_expires = NULL
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users
             SET password_reset_token_hash = $2, password_reset_expires = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Rollback path for a failed reset-email dispatch.
    pub async fn clear_reset_token(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users
             SET password_reset_token_hash = NULL, password_reset_expires = NULL
             WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn find_by_reset_hash(
        db: &PgPool,
        token_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE password_reset_token_hash = $1 AND active = TRUE"
        ))
        .bind(token_hash)
        .fetch_optional(db)
        .await
    }

    /// Soft delete. The row stays; every default lookup stops seeing it.
    pub async fn deactivate(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
