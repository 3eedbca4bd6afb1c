//! Database Integration - PostgreSQL connectivity for the sync engine
//!
//! Opens a small connection pool and implements the runner's
//! [`SyncBackend`]/[`SyncTransaction`] seam on top of sqlx transactions.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{OrmError, OrmResult};
use crate::migrations::runner::{SyncBackend, SyncTransaction};
use crate::migrations::schema_builder;

/// Database connection pool error types
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Connection acquisition failed: {0}")]
    AcquisitionFailed(#[from] sqlx::Error),

    #[error("Connection timeout after {timeout}s")]
    ConnectionTimeout { timeout: u64 },

    #[error("Pool is closed")]
    PoolClosed,
}

impl PoolError {
    fn classify(err: sqlx::Error, acquire_timeout: u64) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => PoolError::ConnectionTimeout {
                timeout: acquire_timeout,
            },
            sqlx::Error::PoolClosed => PoolError::PoolClosed,
            other => PoolError::AcquisitionFailed(other),
        }
    }
}

impl From<PoolError> for OrmError {
    fn from(err: PoolError) -> Self {
        OrmError::Connection(err.to_string())
    }
}

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// Seconds to wait for a connection before giving up
    pub acquire_timeout: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            // a sync holds exactly one connection for its transaction
            max_connections: 2,
            acquire_timeout: 30,
        }
    }
}

/// Postgres target of a sync
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
    config: PoolConfig,
}

impl PgBackend {
    /// Connect and verify the database is reachable
    pub async fn connect(database_url: &str, config: &PoolConfig) -> OrmResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect(database_url)
            .await
            .map_err(|e| PoolError::classify(e, config.acquire_timeout))?;

        info!("Connected to database");
        Ok(Self::from_pool(pool, config.clone()))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, config: PoolConfig) -> Self {
        Self { pool, config }
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SyncBackend for PgBackend {
    type Transaction = PgSyncTransaction;

    async fn begin(&self) -> OrmResult<PgSyncTransaction> {
        if self.pool.is_closed() {
            return Err(PoolError::PoolClosed.into());
        }

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PoolError::classify(e, self.config.acquire_timeout))?;
        debug!("Database transaction started");
        Ok(PgSyncTransaction { tx })
    }
}

/// An open Postgres transaction used by one sync
pub struct PgSyncTransaction {
    tx: Transaction<'static, Postgres>,
}

fn database_error(err: sqlx::Error) -> OrmError {
    OrmError::sync(None, err.to_string())
}

#[async_trait]
impl SyncTransaction for PgSyncTransaction {
    async fn ensure_tracking_table(&mut self, table: &str) -> OrmResult<()> {
        let sql = schema_builder::create_tracking_table_sql(table);
        sqlx::query(&sql)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn latest_applied(&mut self, table: &str) -> OrmResult<Option<String>> {
        let sql = schema_builder::latest_applied_sql(table);
        sqlx::query_scalar::<_, String>(&sql)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(database_error)
    }

    async fn execute(&mut self, statement: &str) -> OrmResult<()> {
        sqlx::query(statement)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn record_applied(&mut self, table: &str, id: &str, data: &str) -> OrmResult<()> {
        let sql = schema_builder::record_applied_sql(table);
        sqlx::query(&sql)
            .bind(id)
            .bind(data)
            .execute(&mut *self.tx)
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn commit(self) -> OrmResult<()> {
        self.tx.commit().await.map_err(database_error)?;
        debug!("Database transaction committed");
        Ok(())
    }

    async fn rollback(self) -> OrmResult<()> {
        self.tx.rollback().await.map_err(database_error)?;
        debug!("Database transaction rolled back");
        Ok(())
    }
}
