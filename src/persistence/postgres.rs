//! PostgreSQL implementation of the local store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};

use super::models::{NewRepository, RepositoryPatch, RepositoryRecord};
use crate::adapters::local_store::{LocalStore, LocalTx};
use crate::config::GatewayConfig;
use crate::domain::ProjectId;
use crate::error::{GatewayError, StepError};

const COLUMNS: &str =
    "id, project_id, name, description, default_branch, private, remote_id, created_at, updated_at";

type RepositoryRow = (
    i64,
    i64,
    String,
    String,
    String,
    bool,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn into_record(row: RepositoryRow) -> RepositoryRecord {
    let (id, project_id, name, description, default_branch, private, remote_id, created_at, updated_at) =
        row;
    RepositoryRecord {
        id,
        project_id: ProjectId::new(project_id),
        name,
        description,
        default_branch,
        private,
        remote_id,
        created_at,
        updated_at,
    }
}

/// Maps a database error to a step error: missing rows become `NotFound`,
/// unique violations `Conflict`, everything else `LocalFailure`.
fn map_db_error(err: sqlx::Error) -> StepError {
    match &err {
        sqlx::Error::RowNotFound => StepError::not_found(err.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StepError::conflict(db.message().to_string())
        }
        _ => StepError::local(err.to_string()),
    }
}

/// PostgreSQL-backed [`LocalStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the database settings of `config` and applies the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the connection or a
    /// migration fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(Self::new(pool))
    }

    /// Underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LocalStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn LocalTx>, StepError> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn find_repository(&self, id: i64) -> Result<Option<RepositoryRecord>, StepError> {
        let row = sqlx::query_as::<_, RepositoryRow>(&format!(
            "SELECT {COLUMNS} FROM repositories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.map(into_record))
    }

    async fn count_repositories(&self, project_id: ProjectId) -> Result<u64, StepError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM repositories WHERE project_id = $1",
        )
        .bind(project_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

/// An open PostgreSQL transaction. Dropping it rolls back.
struct PgTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl LocalTx for PgTx {
    async fn insert_repository(
        &mut self,
        new: &NewRepository,
    ) -> Result<RepositoryRecord, StepError> {
        let row = sqlx::query_as::<_, RepositoryRow>(&format!(
            "INSERT INTO repositories (project_id, name, description, default_branch, private) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        ))
        .bind(new.project_id.get())
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.default_branch)
        .bind(new.private)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(into_record(row))
    }

    async fn update_repository(
        &mut self,
        id: i64,
        patch: &RepositoryPatch,
    ) -> Result<RepositoryRecord, StepError> {
        let row = sqlx::query_as::<_, RepositoryRow>(&format!(
            "UPDATE repositories SET \
             name = COALESCE($2, name), \
             description = COALESCE($3, description), \
             default_branch = COALESCE($4, default_branch), \
             private = COALESCE($5, private), \
             updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.default_branch.as_deref())
        .bind(patch.private)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        row.map(into_record)
            .ok_or_else(|| StepError::not_found(format!("repository {id}")))
    }

    async fn set_remote_id(&mut self, id: i64, remote_id: Option<&str>) -> Result<(), StepError> {
        let result = sqlx::query(
            "UPDATE repositories SET remote_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(remote_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(StepError::not_found(format!("repository {id}")));
        }
        Ok(())
    }

    async fn delete_repository(&mut self, id: i64) -> Result<RepositoryRecord, StepError> {
        let row = sqlx::query_as::<_, RepositoryRow>(&format!(
            "DELETE FROM repositories WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        row.map(into_record)
            .ok_or_else(|| StepError::not_found(format!("repository {id}")))
    }

    async fn restore_repository(&mut self, record: &RepositoryRecord) -> Result<(), StepError> {
        sqlx::query(
            "INSERT INTO repositories \
             (id, project_id, name, description, default_branch, private, remote_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET \
             project_id = EXCLUDED.project_id, name = EXCLUDED.name, \
             description = EXCLUDED.description, default_branch = EXCLUDED.default_branch, \
             private = EXCLUDED.private, remote_id = EXCLUDED.remote_id, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(record.id)
        .bind(record.project_id.get())
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.default_branch)
        .bind(record.private)
        .bind(record.remote_id.as_deref())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StepError> {
        self.tx.commit().await.map_err(map_db_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StepError> {
        self.tx.rollback().await.map_err(map_db_error)
    }
}
