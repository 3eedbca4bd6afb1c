//! Shared fixtures: a migration log in a temp directory and an in-memory
//! stand-in for the database a sync runs against.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use cubes_core::ProjectConfig;
use cubes_orm::{MigrationConfig, MigrationManager, OrmError, OrmResult, SyncBackend, SyncTransaction};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub fn manager_in(dir: &TempDir) -> MigrationManager {
    let project = ProjectConfig::new(dir.path());
    MigrationManager::with_config(MigrationConfig::from_project(&project))
}

/// A fixed point in time, `second` seconds into 2024
pub fn at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(second.into())
}

/// Committed state of the fake database
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    pub tables: BTreeSet<String>,
    /// `None` until the tracking table is created
    pub tracking: Option<BTreeMap<String, String>>,
    /// Every DDL statement that was committed
    pub executed: Vec<String>,
}

impl MemoryDatabase {
    pub fn tracked_ids(&self) -> Vec<String> {
        self.tracking
            .as_ref()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    committed: Arc<Mutex<MemoryDatabase>>,
    fail_on: Arc<Mutex<Option<String>>>,
    begins: Arc<AtomicUsize>,
}

impl MemoryBackend {
    /// Make any statement containing `fragment` fail
    pub fn fail_on(&self, fragment: &str) {
        *self.fail_on.lock().unwrap() = Some(fragment.to_string());
    }

    pub fn heal(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    pub fn state(&self) -> MemoryDatabase {
        self.committed.lock().unwrap().clone()
    }

    pub fn transactions_started(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }
}

pub struct MemoryTransaction {
    staged: MemoryDatabase,
    committed: Arc<Mutex<MemoryDatabase>>,
    fail_on: Option<String>,
}

fn failure(message: String) -> OrmError {
    OrmError::Sync {
        migration_id: None,
        message,
    }
}

fn quoted_name(statement: &str, prefix: &str) -> Option<String> {
    let rest = statement.strip_prefix(prefix)?.strip_prefix('"')?;
    rest.split('"').next().map(str::to_string)
}

#[async_trait]
impl SyncBackend for MemoryBackend {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> OrmResult<MemoryTransaction> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTransaction {
            staged: self.state(),
            committed: Arc::clone(&self.committed),
            fail_on: self.fail_on.lock().unwrap().clone(),
        })
    }
}

#[async_trait]
impl SyncTransaction for MemoryTransaction {
    async fn ensure_tracking_table(&mut self, _table: &str) -> OrmResult<()> {
        self.staged.tracking.get_or_insert_with(BTreeMap::new);
        Ok(())
    }

    async fn latest_applied(&mut self, _table: &str) -> OrmResult<Option<String>> {
        Ok(self
            .staged
            .tracking
            .as_ref()
            .and_then(|t| t.keys().next_back().cloned()))
    }

    async fn execute(&mut self, statement: &str) -> OrmResult<()> {
        if let Some(fragment) = &self.fail_on {
            if statement.contains(fragment.as_str()) {
                return Err(failure(format!("simulated failure on {}", statement)));
            }
        }

        if let Some(name) = quoted_name(statement, "CREATE TABLE ") {
            if !self.staged.tables.insert(name.clone()) {
                return Err(failure(format!("relation \"{}\" already exists", name)));
            }
        } else if let Some(name) = quoted_name(statement, "DROP TABLE ") {
            if !self.staged.tables.remove(&name) {
                return Err(failure(format!("table \"{}\" does not exist", name)));
            }
        }

        self.staged.executed.push(statement.to_string());
        Ok(())
    }

    async fn record_applied(&mut self, _table: &str, id: &str, data: &str) -> OrmResult<()> {
        let tracking = self
            .staged
            .tracking
            .as_mut()
            .ok_or_else(|| failure("tracking table missing".to_string()))?;
        if tracking.insert(id.to_string(), data.to_string()).is_some() {
            return Err(failure(format!("duplicate key {}", id)));
        }
        Ok(())
    }

    async fn commit(self) -> OrmResult<()> {
        *self.committed.lock().unwrap() = self.staged;
        Ok(())
    }

    async fn rollback(self) -> OrmResult<()> {
        Ok(())
    }
}
