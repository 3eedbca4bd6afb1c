//! Schema Builder - translates actions into PostgreSQL DDL
//!
//! Each action becomes exactly one statement. Identifiers are always quoted,
//! so names are case-sensitive and may contain any character.

use super::actions::Action;

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Name given to a table's primary key constraint
pub fn primary_key_name(table: &str) -> String {
    format!("{}_pkey", table)
}

/// The DDL statement that applies `action`
pub fn statement_for(action: &Action) -> String {
    match action {
        Action::AddTable(p) => format!("CREATE TABLE {} ()", quote_ident(&p.name)),
        Action::DeleteTable(p) => format!("DROP TABLE {}", quote_ident(&p.name)),
        Action::AddColumn(p) => {
            let mut sql = format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                quote_ident(&p.table),
                quote_ident(&p.column),
                p.column_type
            );
            if !p.is_nullable {
                sql.push_str(" NOT NULL");
            }
            if let Some(default) = &p.default_value {
                sql.push_str(" DEFAULT ");
                sql.push_str(&quote_literal(default));
            }
            sql
        }
        Action::DeleteColumn(p) => format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_ident(&p.table),
            quote_ident(&p.column)
        ),
        Action::AddPrimaryKey(p) => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            quote_ident(&p.table),
            quote_ident(&primary_key_name(&p.table)),
            column_list(&p.columns)
        ),
        Action::DeletePrimaryKey(p) => drop_constraint(&p.table, &primary_key_name(&p.table)),
        Action::AddRelation(p) => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_ident(&p.table),
            quote_ident(&p.name),
            column_list(&p.columns),
            quote_ident(&p.referenced_table),
            column_list(&p.referenced_columns)
        ),
        Action::DeleteRelation(p) => drop_constraint(&p.table, &p.name),
        Action::AddUniqueConstraint(p) => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            quote_ident(&p.table),
            quote_ident(&p.name),
            column_list(&p.columns)
        ),
        Action::DeleteUniqueConstraint(p) => drop_constraint(&p.table, &p.name),
    }
}

fn drop_constraint(table: &str, name: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        quote_ident(table),
        quote_ident(name)
    )
}

/// SQL to create the migrations tracking table
pub fn create_tracking_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    \
            id VARCHAR(255) NOT NULL,\n    \
            data TEXT NOT NULL,\n    \
            PRIMARY KEY (id)\n\
        )",
        quote_ident(table)
    )
}

/// SQL to read the latest applied migration id
pub fn latest_applied_sql(table: &str) -> String {
    format!(
        "SELECT id FROM {} ORDER BY id DESC LIMIT 1",
        quote_ident(table)
    )
}

/// SQL to record a migration as applied; binds `$1` id and `$2` data
pub fn record_applied_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} (id, data) VALUES ($1, $2)",
        quote_ident(table)
    )
}
