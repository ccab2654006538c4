//! User repository for database operations

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{ProfileUpdate, User};

/// Read and update access to the user directory
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> DatabaseResult<Vec<User>>;
    /// Apply the present fields of `update`; `None` when the user is gone
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate)
    -> DatabaseResult<Option<User>>;
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DatabaseResult<bool>;
}

/// PostgreSQL user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, cnie, password_hash, first_name, last_name, birthday,
                   phone, bank_account, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, cnie, password_hash, first_name, last_name, birthday,
                   phone, bank_account, is_active, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> DatabaseResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, cnie, password_hash, first_name, last_name, birthday,
                   phone, bank_account, is_active, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> DatabaseResult<Option<User>> {
        info!("Updating profile of user {}", id);

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                birthday = COALESCE($4, birthday),
                phone = COALESCE($5, phone),
                bank_account = COALESCE($6, bank_account),
                cnie = COALESCE($7, cnie),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, cnie, password_hash, first_name, last_name, birthday,
                      phone, bank_account, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(update.birthday)
        .bind(&update.phone)
        .bind(&update.bank_account)
        .bind(&update.cnie)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
