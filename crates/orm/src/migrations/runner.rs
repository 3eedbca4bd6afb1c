//! Migration Runner - applies pending migrations to a live database
//!
//! A sync runs in one transaction: ensure the tracking table, read the
//! frontier (latest applied id), apply every later migration's actions as
//! DDL and record each migration, then commit. Any failure after the
//! transaction begins rolls everything back, so a database is either fully
//! caught up with the log or left exactly as it was.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::definitions::{Migration, SyncReport, SyncState};
use super::manager::MigrationManager;
use super::schema_builder;
use super::snapshot::Snapshot;
use crate::database::{PgBackend, PoolConfig};
use crate::error::{OrmError, OrmResult};

/// A database the runner can open sync transactions against
#[async_trait]
pub trait SyncBackend: Send + Sync {
    type Transaction: SyncTransaction;

    async fn begin(&self) -> OrmResult<Self::Transaction>;
}

/// One open transaction; dropped without commit means rolled back
#[async_trait]
pub trait SyncTransaction: Send {
    /// Create the tracking table if it does not exist
    async fn ensure_tracking_table(&mut self, table: &str) -> OrmResult<()>;

    /// Greatest migration id recorded in the tracking table
    async fn latest_applied(&mut self, table: &str) -> OrmResult<Option<String>>;

    /// Execute one DDL statement
    async fn execute(&mut self, statement: &str) -> OrmResult<()>;

    /// Record a migration as applied, storing its serialized form
    async fn record_applied(&mut self, table: &str, id: &str, data: &str) -> OrmResult<()>;

    async fn commit(self) -> OrmResult<()>;

    async fn rollback(self) -> OrmResult<()>;
}

/// A migration with its actions already translated to DDL
struct PlannedMigration {
    migration: Migration,
    statements: Vec<String>,
}

/// Migration runner that executes migrations against a database
pub struct MigrationRunner<B: SyncBackend> {
    manager: MigrationManager,
    backend: B,
}

impl MigrationRunner<PgBackend> {
    /// Connect to a Postgres database; fails immediately if it is unreachable
    pub async fn connect(
        manager: MigrationManager,
        database_url: &str,
        pool_config: &PoolConfig,
    ) -> OrmResult<Self> {
        debug!(state = %SyncState::Disconnected, "Connecting to database");
        let backend = PgBackend::connect(database_url, pool_config).await?;
        Ok(Self::new(manager, backend))
    }
}

impl<B: SyncBackend> MigrationRunner<B> {
    /// Create a runner over an already connected backend
    pub fn new(manager: MigrationManager, backend: B) -> Self {
        Self { manager, backend }
    }

    /// Get the migration manager
    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    /// Get the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Apply every migration newer than the database's frontier.
    ///
    /// The log is decoded and replayed before the database is touched, so a
    /// log with unknown actions or inconsistent edits never reaches it.
    pub async fn sync(&self) -> OrmResult<SyncReport> {
        let plan = self.plan()?;
        let mut state = SyncState::Connected;
        debug!(%state, migrations = plan.len(), "Starting sync");

        let mut transaction = self.backend.begin().await?;

        let outcome = self.apply(&mut transaction, &plan, &mut state).await;
        match outcome {
            Ok(report) => {
                transaction
                    .commit()
                    .await
                    .map_err(|e| OrmError::sync(None, format!("can't commit: {}", e)))?;
                state = SyncState::Committed;
                info!(
                    %state,
                    applied = report.applied_count(),
                    statements = report.statements_executed,
                    frontier = report.frontier().unwrap_or("none"),
                    "Sync committed"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(%state, error = %e, "Sync failed, rolling back");
                if let Err(rollback_error) = transaction.rollback().await {
                    warn!(error = %rollback_error, "Rollback failed");
                }
                state = SyncState::RolledBack;
                debug!(%state);
                Err(e)
            }
        }
    }

    /// Decode, validate and translate the whole log
    fn plan(&self) -> OrmResult<Vec<PlannedMigration>> {
        let migrations = self.manager.load_migrations()?;
        Snapshot::build(&migrations)?;

        migrations
            .into_iter()
            .map(|migration| {
                let statements = migration
                    .actions
                    .iter()
                    .map(|record| record.decode().map(|action| schema_builder::statement_for(&action)))
                    .collect::<OrmResult<Vec<_>>>()?;
                Ok(PlannedMigration {
                    migration,
                    statements,
                })
            })
            .collect()
    }

    async fn apply(
        &self,
        transaction: &mut B::Transaction,
        plan: &[PlannedMigration],
        state: &mut SyncState,
    ) -> OrmResult<SyncReport> {
        let table = &self.manager.config().migrations_table;

        transaction
            .ensure_tracking_table(table)
            .await
            .map_err(|e| OrmError::sync(None, format!("can't add migrations table: {}", e)))?;
        *state = SyncState::TrackingTableReady;
        debug!(%state, table = %table);

        let frontier = transaction
            .latest_applied(table)
            .await
            .map_err(|e| OrmError::sync(None, format!("can't read current migration state: {}", e)))?;
        *state = SyncState::FrontierKnown;
        debug!(%state, frontier = frontier.as_deref().unwrap_or("none"));

        let pending = plan
            .iter()
            .filter(|p| frontier.as_deref().map_or(true, |f| p.migration.id.as_str() > f));

        let mut report = SyncReport {
            previous_frontier: frontier.clone(),
            applied_migrations: Vec::new(),
            statements_executed: 0,
        };

        *state = SyncState::Applying;
        for planned in pending {
            let id = planned.migration.id.as_str();
            info!(id, description = %planned.migration.description, "Applying migration");

            for statement in &planned.statements {
                debug!(id, %statement, "Executing statement");
                transaction.execute(statement).await.map_err(|e| {
                    OrmError::sync(Some(id), format!("can't apply `{}`: {}", statement, e))
                })?;
                report.statements_executed += 1;
            }

            let data = serde_json::to_string(&planned.migration).map_err(|e| {
                OrmError::sync(Some(id), format!("can't serialize migration: {}", e))
            })?;
            transaction
                .record_applied(table, id, &data)
                .await
                .map_err(|e| {
                    OrmError::sync(Some(id), format!("can't add migration to migrations table: {}", e))
                })?;

            report.applied_migrations.push(id.to_string());
        }

        Ok(report)
    }
}
