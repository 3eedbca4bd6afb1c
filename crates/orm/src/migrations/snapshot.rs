//! Snapshot Builder - replays the migration log into an in-memory schema
//!
//! The snapshot is never persisted. It is rebuilt from the ordered action log
//! on demand, and every action is checked against the schema produced by the
//! actions before it.

use serde::{Deserialize, Serialize};

use super::actions::{
    Action, AddColumnParams, AddPrimaryKeyParams, AddRelationParams, AddUniqueConstraintParams,
    DeleteColumnParams, DeletePrimaryKeyParams, DeleteRelationParams, DeleteTableParams,
    DeleteUniqueConstraintParams,
};
use super::definitions::Migration;
use super::schema_builder::primary_key_name;
use crate::error::{OrmError, OrmResult, SchemaViolation};

type Check = Result<(), SchemaViolation>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Foreign key from columns of the owning table to another table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_keys: Vec<String>,
    pub relations: Vec<Relation>,
    pub unique_constraints: Vec<UniqueConstraint>,
}

impl Table {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            relations: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn unique_constraint(&self, name: &str) -> Option<&UniqueConstraint> {
        self.unique_constraints.iter().find(|u| u.name == name)
    }

    fn require_columns(&self, columns: &[String]) -> Check {
        match columns.iter().find(|c| self.column(c).is_none()) {
            Some(missing) => Err(SchemaViolation::ColumnMissing {
                table: self.name.clone(),
                column: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Whether `name` is taken in this table's constraint namespace, which
    /// Postgres shares between the primary key, relations and unique constraints
    fn constraint_named(&self, name: &str) -> bool {
        (!self.primary_keys.is_empty() && primary_key_name(&self.name) == name)
            || self.relation(name).is_some()
            || self.unique_constraint(name).is_some()
    }

    fn require_free_constraint_name(&self, name: &str) -> Check {
        if self.constraint_named(name) {
            return Err(SchemaViolation::ConstraintNameTaken {
                table: self.name.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Name of the first constraint of this table that covers `column`,
    /// including relations of the table onto itself that reference it
    fn constraint_using(&self, column: &str) -> Option<String> {
        let column = column.to_string();
        if self.primary_keys.contains(&column) {
            return Some("primary key".to_string());
        }
        if let Some(unique) = self.unique_constraints.iter().find(|u| u.columns.contains(&column)) {
            return Some(format!("unique constraint {}", unique.name));
        }
        self.relations
            .iter()
            .find(|r| {
                r.columns.contains(&column)
                    || (r.referenced_table == self.name && r.referenced_columns.contains(&column))
            })
            .map(|r| format!("relation {}", r.name))
    }
}

/// Current schema, derived by replaying every migration in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tables in creation order; names are unique
    pub tables: Vec<Table>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay `migrations` (already ordered by id) from an empty schema.
    ///
    /// Stops at the first action that cannot be decoded or applied.
    pub fn build(migrations: &[Migration]) -> OrmResult<Self> {
        let mut snapshot = Self::new();
        for migration in migrations {
            snapshot.apply_migration(migration)?;
        }
        Ok(snapshot)
    }

    /// Decode and apply every action of `migration`
    pub fn apply_migration(&mut self, migration: &Migration) -> OrmResult<()> {
        for (index, record) in migration.actions.iter().enumerate() {
            let action = record
                .decode()
                .map_err(|e| e.in_migration(&migration.id, index))?;
            self.apply(&action).map_err(|violation| OrmError::SchemaConsistency {
                migration_id: migration.id.clone(),
                index,
                method: record.method.clone(),
                violation,
            })?;
        }
        Ok(())
    }

    /// Apply a single action. On failure the snapshot is left unchanged.
    pub fn apply(&mut self, action: &Action) -> Result<(), SchemaViolation> {
        match action {
            Action::AddTable(p) => self.add_table(&p.name),
            Action::DeleteTable(p) => self.delete_table(p),
            Action::AddColumn(p) => self.add_column(p),
            Action::DeleteColumn(p) => self.delete_column(p),
            Action::AddPrimaryKey(p) => self.add_primary_key(p),
            Action::DeletePrimaryKey(p) => self.delete_primary_key(p),
            Action::AddRelation(p) => self.add_relation(p),
            Action::DeleteRelation(p) => self.delete_relation(p),
            Action::AddUniqueConstraint(p) => self.add_unique_constraint(p),
            Action::DeleteUniqueConstraint(p) => self.delete_unique_constraint(p),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    fn require_table(&self, name: &str) -> Result<&Table, SchemaViolation> {
        self.table(name)
            .ok_or_else(|| SchemaViolation::TableMissing(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, SchemaViolation> {
        self.tables
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| SchemaViolation::TableMissing(name.to_string()))
    }

    /// First relation of another table pointing at `table` (optionally at `column` of it)
    fn incoming_relation(&self, table: &str, column: Option<&str>) -> Option<(&Table, &Relation)> {
        self.tables
            .iter()
            .filter(|t| t.name != table)
            .flat_map(|t| t.relations.iter().map(move |r| (t, r)))
            .find(|(_, r)| {
                r.referenced_table == table
                    && column.map_or(true, |c| r.referenced_columns.iter().any(|rc| rc == c))
            })
    }

    fn add_table(&mut self, name: &str) -> Check {
        if self.table(name).is_some() {
            return Err(SchemaViolation::TableExists(name.to_string()));
        }
        self.tables.push(Table::new(name));
        Ok(())
    }

    fn delete_table(&mut self, params: &DeleteTableParams) -> Check {
        self.require_table(&params.name)?;
        if let Some((by, relation)) = self.incoming_relation(&params.name, None) {
            return Err(SchemaViolation::TableReferenced {
                table: params.name.clone(),
                relation: relation.name.clone(),
                by: by.name.clone(),
            });
        }
        self.tables.retain(|t| t.name != params.name);
        Ok(())
    }

    fn add_column(&mut self, params: &AddColumnParams) -> Check {
        let table = self.table_mut(&params.table)?;
        if table.column(&params.column).is_some() {
            return Err(SchemaViolation::ColumnExists {
                table: params.table.clone(),
                column: params.column.clone(),
            });
        }
        table.columns.push(Column {
            name: params.column.clone(),
            column_type: params.column_type.clone(),
            is_nullable: params.is_nullable,
            default_value: params.default_value.clone(),
        });
        Ok(())
    }

    fn delete_column(&mut self, params: &DeleteColumnParams) -> Check {
        let table = self.require_table(&params.table)?;
        if table.column(&params.column).is_none() {
            return Err(SchemaViolation::ColumnMissing {
                table: params.table.clone(),
                column: params.column.clone(),
            });
        }

        let in_use = table.constraint_using(&params.column).or_else(|| {
            self.incoming_relation(&params.table, Some(&params.column))
                .map(|(by, r)| format!("relation {} of table {}", r.name, by.name))
        });
        if let Some(constraint) = in_use {
            return Err(SchemaViolation::ColumnInUse {
                table: params.table.clone(),
                column: params.column.clone(),
                constraint,
            });
        }

        let table = self.table_mut(&params.table)?;
        table.columns.retain(|c| c.name != params.column);
        Ok(())
    }

    fn add_primary_key(&mut self, params: &AddPrimaryKeyParams) -> Check {
        let table = self.table_mut(&params.table)?;
        if !table.primary_keys.is_empty() {
            return Err(SchemaViolation::PrimaryKeyExists(params.table.clone()));
        }
        if params.columns.is_empty() {
            return Err(SchemaViolation::EmptyColumnList("primary key".to_string()));
        }
        table.require_columns(&params.columns)?;
        table.require_free_constraint_name(&primary_key_name(&params.table))?;
        table.primary_keys = params.columns.clone();
        Ok(())
    }

    fn delete_primary_key(&mut self, params: &DeletePrimaryKeyParams) -> Check {
        let table = self.table_mut(&params.table)?;
        if table.primary_keys.is_empty() {
            return Err(SchemaViolation::PrimaryKeyMissing(params.table.clone()));
        }
        table.primary_keys.clear();
        Ok(())
    }

    fn add_relation(&mut self, params: &AddRelationParams) -> Check {
        let table = self.require_table(&params.table)?;
        if table.relation(&params.name).is_some() {
            return Err(SchemaViolation::RelationExists {
                table: params.table.clone(),
                name: params.name.clone(),
            });
        }
        table.require_free_constraint_name(&params.name)?;
        if params.columns.is_empty() {
            return Err(SchemaViolation::EmptyColumnList(format!("relation {}", params.name)));
        }
        if params.columns.len() != params.referenced_columns.len() {
            return Err(SchemaViolation::RelationArity {
                name: params.name.clone(),
                columns: params.columns.len(),
                referenced: params.referenced_columns.len(),
            });
        }
        table.require_columns(&params.columns)?;
        self.require_table(&params.referenced_table)?
            .require_columns(&params.referenced_columns)?;

        let table = self.table_mut(&params.table)?;
        table.relations.push(Relation {
            name: params.name.clone(),
            columns: params.columns.clone(),
            referenced_table: params.referenced_table.clone(),
            referenced_columns: params.referenced_columns.clone(),
        });
        Ok(())
    }

    fn delete_relation(&mut self, params: &DeleteRelationParams) -> Check {
        let table = self.table_mut(&params.table)?;
        if table.relation(&params.name).is_none() {
            return Err(SchemaViolation::RelationMissing {
                table: params.table.clone(),
                name: params.name.clone(),
            });
        }
        table.relations.retain(|r| r.name != params.name);
        Ok(())
    }

    fn add_unique_constraint(&mut self, params: &AddUniqueConstraintParams) -> Check {
        let table = self.table_mut(&params.table)?;
        if table.unique_constraint(&params.name).is_some() {
            return Err(SchemaViolation::UniqueConstraintExists {
                table: params.table.clone(),
                name: params.name.clone(),
            });
        }
        table.require_free_constraint_name(&params.name)?;
        if params.columns.is_empty() {
            return Err(SchemaViolation::EmptyColumnList(format!(
                "unique constraint {}",
                params.name
            )));
        }
        table.require_columns(&params.columns)?;
        table.unique_constraints.push(UniqueConstraint {
            name: params.name.clone(),
            columns: params.columns.clone(),
        });
        Ok(())
    }

    fn delete_unique_constraint(&mut self, params: &DeleteUniqueConstraintParams) -> Check {
        let table = self.table_mut(&params.table)?;
        if table.unique_constraint(&params.name).is_none() {
            return Err(SchemaViolation::UniqueConstraintMissing {
                table: params.table.clone(),
                name: params.name.clone(),
            });
        }
        table.unique_constraints.retain(|u| u.name != params.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::actions::{ActionRecord, AddTableParams};
    use chrono::{TimeZone, Utc};

    fn add_table(name: &str) -> Action {
        Action::AddTable(AddTableParams { name: name.into() })
    }

    fn add_column(table: &str, column: &str, column_type: &str) -> Action {
        Action::AddColumn(AddColumnParams {
            table: table.into(),
            column: column.into(),
            column_type: column_type.into(),
            is_nullable: false,
            default_value: None,
        })
    }

    fn migration(second: u32, actions: Vec<Action>) -> Migration {
        let mut migration = Migration::new(
            "test",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap(),
        );
        migration.actions = actions.iter().map(|a| a.encode().unwrap()).collect();
        migration
    }

    fn users_and_posts() -> Snapshot {
        let mut snapshot = Snapshot::new();
        for action in [
            add_table("users"),
            add_column("users", "id", "uuid"),
            add_column("users", "email", "text"),
            add_table("posts"),
            add_column("posts", "id", "uuid"),
            add_column("posts", "author_id", "uuid"),
            Action::AddPrimaryKey(AddPrimaryKeyParams {
                table: "users".into(),
                columns: vec!["id".into()],
            }),
            Action::AddRelation(AddRelationParams {
                table: "posts".into(),
                name: "posts_author_fk".into(),
                columns: vec!["author_id".into()],
                referenced_table: "users".into(),
                referenced_columns: vec!["id".into()],
            }),
        ] {
            snapshot.apply(&action).unwrap();
        }
        snapshot
    }

    #[test]
    fn test_add_table_and_column() {
        let snapshot = Snapshot::build(&[migration(
            1,
            vec![add_table("users"), add_column("users", "id", "uuid")],
        )])
        .unwrap();

        assert_eq!(snapshot.tables.len(), 1);
        let users = snapshot.table("users").unwrap();
        assert_eq!(users.columns.len(), 1);
        assert_eq!(users.columns[0].column_type, "uuid");
        assert!(!users.columns[0].is_nullable);
    }

    #[test]
    fn test_build_is_deterministic() {
        let log = vec![
            migration(1, vec![add_table("users"), add_column("users", "id", "uuid")]),
            migration(2, vec![add_table("posts"), add_table("tags")]),
        ];

        assert_eq!(Snapshot::build(&log).unwrap(), Snapshot::build(&log).unwrap());
    }

    #[test]
    fn test_failed_apply_leaves_snapshot_unchanged() {
        let mut snapshot = users_and_posts();
        let before = snapshot.clone();

        let result = snapshot.apply(&Action::DeleteColumn(DeleteColumnParams {
            table: "users".into(),
            column: "missing".into(),
        }));

        assert_eq!(
            result,
            Err(SchemaViolation::ColumnMissing {
                table: "users".into(),
                column: "missing".into()
            })
        );
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_duplicate_table_reports_migration_and_index() {
        let log = vec![migration(3, vec![add_table("t"), add_table("t")])];

        match Snapshot::build(&log) {
            Err(OrmError::SchemaConsistency {
                migration_id,
                index,
                method,
                violation,
            }) => {
                assert_eq!(migration_id, log[0].id);
                assert_eq!(index, 1);
                assert_eq!(method, "addTable");
                assert_eq!(violation, SchemaViolation::TableExists("t".into()));
            }
            other => panic!("expected consistency error, got {:?}", other),
        }
    }

    #[test]
    fn test_column_preconditions() {
        let mut snapshot = Snapshot::new();
        assert_eq!(
            snapshot.apply(&add_column("ghost", "id", "uuid")),
            Err(SchemaViolation::TableMissing("ghost".into()))
        );

        snapshot.apply(&add_table("users")).unwrap();
        snapshot.apply(&add_column("users", "id", "uuid")).unwrap();
        assert!(matches!(
            snapshot.apply(&add_column("users", "id", "text")),
            Err(SchemaViolation::ColumnExists { .. })
        ));
    }

    #[test]
    fn test_delete_table_and_column() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(&add_table("users")).unwrap();
        snapshot.apply(&add_column("users", "id", "uuid")).unwrap();
        snapshot.apply(&add_column("users", "name", "text")).unwrap();

        snapshot
            .apply(&Action::DeleteColumn(DeleteColumnParams {
                table: "users".into(),
                column: "id".into(),
            }))
            .unwrap();
        assert_eq!(snapshot.table("users").unwrap().columns.len(), 1);

        snapshot
            .apply(&Action::DeleteTable(DeleteTableParams { name: "users".into() }))
            .unwrap();
        assert!(snapshot.tables.is_empty());

        assert_eq!(
            snapshot.apply(&Action::DeleteTable(DeleteTableParams { name: "users".into() })),
            Err(SchemaViolation::TableMissing("users".into()))
        );
    }

    #[test]
    fn test_primary_key_lifecycle() {
        let mut snapshot = users_and_posts();

        assert_eq!(
            snapshot.apply(&Action::AddPrimaryKey(AddPrimaryKeyParams {
                table: "users".into(),
                columns: vec!["email".into()],
            })),
            Err(SchemaViolation::PrimaryKeyExists("users".into()))
        );

        assert!(matches!(
            snapshot.apply(&Action::AddPrimaryKey(AddPrimaryKeyParams {
                table: "posts".into(),
                columns: vec!["nope".into()],
            })),
            Err(SchemaViolation::ColumnMissing { .. })
        ));

        snapshot
            .apply(&Action::DeletePrimaryKey(DeletePrimaryKeyParams { table: "users".into() }))
            .unwrap();
        assert!(snapshot.table("users").unwrap().primary_keys.is_empty());
        assert_eq!(
            snapshot.apply(&Action::DeletePrimaryKey(DeletePrimaryKeyParams { table: "users".into() })),
            Err(SchemaViolation::PrimaryKeyMissing("users".into()))
        );
    }

    #[test]
    fn test_relation_guards_referenced_table_and_columns() {
        let mut snapshot = users_and_posts();

        assert!(matches!(
            snapshot.apply(&Action::DeleteTable(DeleteTableParams { name: "users".into() })),
            Err(SchemaViolation::TableReferenced { .. })
        ));
        assert!(matches!(
            snapshot.apply(&Action::DeleteColumn(DeleteColumnParams {
                table: "posts".into(),
                column: "author_id".into(),
            })),
            Err(SchemaViolation::ColumnInUse { .. })
        ));
        assert!(matches!(
            snapshot.apply(&Action::DeleteColumn(DeleteColumnParams {
                table: "users".into(),
                column: "id".into(),
            })),
            Err(SchemaViolation::ColumnInUse { .. })
        ));

        snapshot
            .apply(&Action::DeleteRelation(DeleteRelationParams {
                table: "posts".into(),
                name: "posts_author_fk".into(),
            }))
            .unwrap();
        snapshot
            .apply(&Action::DeleteTable(DeleteTableParams { name: "users".into() }))
            .unwrap();
        assert!(snapshot.table("users").is_none());
    }

    #[test]
    fn test_relation_preconditions() {
        let mut snapshot = users_and_posts();
        let relation = |name: &str, columns: Vec<&str>, referenced: Vec<&str>| {
            Action::AddRelation(AddRelationParams {
                table: "posts".into(),
                name: name.into(),
                columns: columns.into_iter().map(String::from).collect(),
                referenced_table: "users".into(),
                referenced_columns: referenced.into_iter().map(String::from).collect(),
            })
        };

        assert!(matches!(
            snapshot.apply(&relation("posts_author_fk", vec!["author_id"], vec!["id"])),
            Err(SchemaViolation::RelationExists { .. })
        ));
        assert!(matches!(
            snapshot.apply(&relation("fk2", vec!["author_id", "id"], vec!["id"])),
            Err(SchemaViolation::RelationArity { .. })
        ));
        assert!(matches!(
            snapshot.apply(&relation("fk3", vec!["author_id"], vec!["missing"])),
            Err(SchemaViolation::ColumnMissing { .. })
        ));
        assert!(matches!(
            snapshot.apply(&relation("fk4", vec![], vec![])),
            Err(SchemaViolation::EmptyColumnList(_))
        ));
        assert!(matches!(
            snapshot.apply(&Action::DeleteRelation(DeleteRelationParams {
                table: "posts".into(),
                name: "fk9".into(),
            })),
            Err(SchemaViolation::RelationMissing { .. })
        ));
    }

    #[test]
    fn test_unique_constraint_lifecycle() {
        let mut snapshot = users_and_posts();
        let add = Action::AddUniqueConstraint(AddUniqueConstraintParams {
            table: "users".into(),
            name: "users_email_key".into(),
            columns: vec!["email".into()],
        });

        snapshot.apply(&add).unwrap();
        assert!(matches!(
            snapshot.apply(&add),
            Err(SchemaViolation::UniqueConstraintExists { .. })
        ));
        assert!(matches!(
            snapshot.apply(&Action::DeleteColumn(DeleteColumnParams {
                table: "users".into(),
                column: "email".into(),
            })),
            Err(SchemaViolation::ColumnInUse { .. })
        ));

        let delete = Action::DeleteUniqueConstraint(DeleteUniqueConstraintParams {
            table: "users".into(),
            name: "users_email_key".into(),
        });
        snapshot.apply(&delete).unwrap();
        assert!(matches!(
            snapshot.apply(&delete),
            Err(SchemaViolation::UniqueConstraintMissing { .. })
        ));
    }

    #[test]
    fn test_constraint_names_are_shared_per_table() {
        let mut snapshot = users_and_posts();
        snapshot
            .apply(&Action::AddUniqueConstraint(AddUniqueConstraintParams {
                table: "users".into(),
                name: "k".into(),
                columns: vec!["email".into()],
            }))
            .unwrap();

        let relation_k = Action::AddRelation(AddRelationParams {
            table: "users".into(),
            name: "k".into(),
            columns: vec!["id".into()],
            referenced_table: "users".into(),
            referenced_columns: vec!["id".into()],
        });
        assert_eq!(
            snapshot.apply(&relation_k),
            Err(SchemaViolation::ConstraintNameTaken {
                table: "users".into(),
                name: "k".into(),
            })
        );

        // a relation on posts already uses this name
        assert!(matches!(
            snapshot.apply(&Action::AddUniqueConstraint(AddUniqueConstraintParams {
                table: "posts".into(),
                name: "posts_author_fk".into(),
                columns: vec!["id".into()],
            })),
            Err(SchemaViolation::ConstraintNameTaken { .. })
        ));

        // users has a primary key, so users_pkey is taken
        assert!(matches!(
            snapshot.apply(&Action::AddUniqueConstraint(AddUniqueConstraintParams {
                table: "users".into(),
                name: "users_pkey".into(),
                columns: vec!["email".into()],
            })),
            Err(SchemaViolation::ConstraintNameTaken { .. })
        ));

        // the same name on another table is fine
        snapshot
            .apply(&Action::AddUniqueConstraint(AddUniqueConstraintParams {
                table: "posts".into(),
                name: "k".into(),
                columns: vec!["id".into()],
            }))
            .unwrap();
    }

    #[test]
    fn test_primary_key_name_must_be_free() {
        let mut snapshot = users_and_posts();
        snapshot
            .apply(&Action::AddUniqueConstraint(AddUniqueConstraintParams {
                table: "posts".into(),
                name: "posts_pkey".into(),
                columns: vec!["id".into()],
            }))
            .unwrap();

        let before = snapshot.clone();
        assert_eq!(
            snapshot.apply(&Action::AddPrimaryKey(AddPrimaryKeyParams {
                table: "posts".into(),
                columns: vec!["id".into()],
            })),
            Err(SchemaViolation::ConstraintNameTaken {
                table: "posts".into(),
                name: "posts_pkey".into(),
            })
        );
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_self_relation_protects_referenced_column() {
        let mut snapshot = Snapshot::new();
        for action in [
            add_table("users"),
            add_column("users", "id", "uuid"),
            add_column("users", "parent_id", "uuid"),
            Action::AddRelation(AddRelationParams {
                table: "users".into(),
                name: "parent_fk".into(),
                columns: vec!["parent_id".into()],
                referenced_table: "users".into(),
                referenced_columns: vec!["id".into()],
            }),
        ] {
            snapshot.apply(&action).unwrap();
        }

        let before = snapshot.clone();
        assert_eq!(
            snapshot.apply(&Action::DeleteColumn(DeleteColumnParams {
                table: "users".into(),
                column: "id".into(),
            })),
            Err(SchemaViolation::ColumnInUse {
                table: "users".into(),
                column: "id".into(),
                constraint: "relation parent_fk".into(),
            })
        );
        assert_eq!(snapshot, before);

        snapshot
            .apply(&Action::DeleteRelation(DeleteRelationParams {
                table: "users".into(),
                name: "parent_fk".into(),
            }))
            .unwrap();
        snapshot
            .apply(&Action::DeleteColumn(DeleteColumnParams {
                table: "users".into(),
                column: "id".into(),
            }))
            .unwrap();
        assert_eq!(snapshot.table("users").unwrap().columns.len(), 1);
    }

    #[test]
    fn test_decode_failure_names_its_migration() {
        let mut bad = migration(3, vec![add_table("users")]);
        bad.actions.push(ActionRecord {
            method: "addTable".into(),
            params: serde_json::json!({ "title": "posts" }),
        });

        match Snapshot::build(&[bad]) {
            Err(OrmError::Decode {
                migration_id,
                index,
                ..
            }) => {
                assert_eq!(migration_id.as_deref(), Some("20240101000003"));
                assert_eq!(index, Some(1));
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = users_and_posts();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["tables"][0]["name"], "users");
        assert_eq!(json["tables"][0]["primaryKeys"][0], "id");
        assert_eq!(json["tables"][0]["columns"][0]["type"], "uuid");
        assert_eq!(json["tables"][0]["columns"][0]["isNullable"], false);
        assert_eq!(json["tables"][1]["relations"][0]["referencedTable"], "users");
    }
}
