//! `PostgreSQL` administrator repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fruit_store_core::{AdminUserId, Username};

use super::{AdminRepository, PgStore, RepositoryError, conflict_on_unique};
use crate::models::AdminUser;

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: i32,
    name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        let name = Username::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid admin name in database: {e}"))
        })?;
        Ok(Self {
            id: AdminUserId::new(row.id),
            name,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl AdminRepository for PgStore {
    async fn create(
        &self,
        name: &Username,
        password_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        let row: AdminRow = sqlx::query_as(
            r"
            INSERT INTO storefront.admin_user (name, password_hash)
            VALUES ($1, $2)
            RETURNING id, name, password_hash, created_at
            ",
        )
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("admin name already exists"))?;

        row.try_into()
    }

    async fn find_by_name(&self, name: &Username) -> Result<Option<AdminUser>, RepositoryError> {
        let row: Option<AdminRow> = sqlx::query_as(
            r"
            SELECT id, name, password_hash, created_at
            FROM storefront.admin_user
            WHERE LOWER(name) = LOWER($1)
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AdminUser::try_from).transpose()
    }
}
