use anyhow::Context;
use cubes_orm::{MigrationManager, OrmResult, Snapshot};

/// Print the migration an edit was appended to
pub fn report(result: OrmResult<String>) -> anyhow::Result<()> {
    let id = result.context("can't update migration")?;
    println!("Updated migration {}", id);
    Ok(())
}

pub fn snapshot(manager: &MigrationManager, json: bool) -> anyhow::Result<()> {
    let snapshot = manager
        .current_snapshot()
        .context("can't build schema snapshot")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render(&snapshot));
    }
    Ok(())
}

fn render(snapshot: &Snapshot) -> String {
    if snapshot.tables.is_empty() {
        return "No tables\n".to_string();
    }

    let mut out = String::new();
    for table in &snapshot.tables {
        out.push_str(&format!("{}\n", table.name));
        for column in &table.columns {
            let mut line = format!("  {} {}", column.name, column.column_type);
            if !column.is_nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = &column.default_value {
                line.push_str(&format!(" DEFAULT '{}'", default));
            }
            out.push_str(&line);
            out.push('\n');
        }
        if !table.primary_keys.is_empty() {
            out.push_str(&format!("  PRIMARY KEY ({})\n", table.primary_keys.join(", ")));
        }
        for unique in &table.unique_constraints {
            out.push_str(&format!("  UNIQUE {} ({})\n", unique.name, unique.columns.join(", ")));
        }
        for relation in &table.relations {
            out.push_str(&format!(
                "  RELATION {} ({}) -> {} ({})\n",
                relation.name,
                relation.columns.join(", "),
                relation.referenced_table,
                relation.referenced_columns.join(", ")
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubes_core::ProjectConfig;
    use tempfile::TempDir;

    #[test]
    fn test_render_lists_columns_and_constraints() {
        let dir = TempDir::new().unwrap();
        let manager = crate::commands::manager_for(&ProjectConfig::new(dir.path()));
        manager.create_migration("users").unwrap();
        manager.add_table("users").unwrap();
        manager.add_column("users", "id", "uuid", false, "").unwrap();
        manager.add_column("users", "role", "text", true, "member").unwrap();
        manager.add_primary_key("users", &["id".to_string()]).unwrap();

        let rendered = render(&manager.current_snapshot().unwrap());
        assert_eq!(
            rendered,
            "users\n  id uuid NOT NULL\n  role text DEFAULT 'member'\n  PRIMARY KEY (id)\n"
        );
    }

    #[test]
    fn test_render_empty_snapshot() {
        assert_eq!(render(&Snapshot::default()), "No tables\n");
    }

    #[test]
    fn test_report_propagates_errors() {
        let dir = TempDir::new().unwrap();
        let manager = crate::commands::manager_for(&ProjectConfig::new(dir.path()));
        // no migration to append to
        assert!(report(manager.add_table("users")).is_err());
    }
}
