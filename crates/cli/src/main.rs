mod commands;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cubes_core::{init_logging, LoggingConfig, ProjectConfig};
use std::path::PathBuf;

use commands::*;

#[derive(Parser, Debug)]
#[command(name = "cubes")]
#[command(about = "Schema migration tooling for cubes projects")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Project root; migrations live in `<root>/migrations`
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// PostgreSQL connection URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Log level (overrides LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, list and inspect migrations
    Migration {
        #[command(subcommand)]
        migration_command: MigrationCommands,
    },

    /// Add or delete tables
    Table {
        #[command(subcommand)]
        table_command: TableCommands,
    },

    /// Add or delete columns
    Column {
        #[command(subcommand)]
        column_command: ColumnCommands,
    },

    /// Add or delete a table's primary key
    PrimaryKey {
        #[command(subcommand)]
        primary_key_command: PrimaryKeyCommands,
    },

    /// Add or delete foreign key relations
    Relation {
        #[command(subcommand)]
        relation_command: RelationCommands,
    },

    /// Add or delete unique constraints
    Unique {
        #[command(subcommand)]
        unique_command: UniqueCommands,
    },

    /// Print the schema produced by replaying every migration
    Snapshot {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply pending migrations to the database
    Sync,
}

#[derive(Subcommand, Debug)]
enum MigrationCommands {
    /// Create a new, empty migration; later edits are appended to it
    Add {
        /// What the migration is for
        description: String,
    },

    /// List migrations in order
    List,

    /// Show one migration's actions
    Show {
        /// Migration id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum TableCommands {
    Add { name: String },
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum ColumnCommands {
    Add {
        table: String,
        column: String,

        /// SQL type, passed through verbatim
        #[arg(long = "type")]
        column_type: String,

        #[arg(long)]
        nullable: bool,

        #[arg(long)]
        default: Option<String>,
    },
    Delete {
        table: String,
        column: String,
    },
}

#[derive(Subcommand, Debug)]
enum PrimaryKeyCommands {
    Add {
        table: String,

        #[arg(required = true)]
        columns: Vec<String>,
    },
    Delete {
        table: String,
    },
}

#[derive(Subcommand, Debug)]
enum RelationCommands {
    Add {
        table: String,
        name: String,

        /// Local columns, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        #[arg(long)]
        references: String,

        /// Referenced columns, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        referenced_columns: Vec<String>,
    },
    Delete {
        table: String,
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum UniqueCommands {
    Add {
        table: String,
        name: String,

        #[arg(required = true)]
        columns: Vec<String>,
    },
    Delete {
        table: String,
        name: String,
    },
}

fn project_config(global: &GlobalArgs) -> anyhow::Result<ProjectConfig> {
    let mut config = ProjectConfig::from_env(&global.root)?;
    if let Some(url) = &global.database_url {
        config = config.with_database_url(url);
    }
    if let Some(level) = &global.log_level {
        config = config.with_log_level(level.to_lowercase());
    }
    if global.json_logs {
        config.json_logs = true;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = project_config(&cli.global).context("invalid configuration")?;
    init_logging(&LoggingConfig::from_project(&config))
        .map_err(|e| anyhow::anyhow!(e))
        .context("can't initialize logging")?;

    tracing::debug!(
        root = %config.root().display(),
        json_logs = config.json_logs,
        "Loaded project configuration"
    );

    let manager = manager_for(&config);

    match cli.command {
        Commands::Migration { migration_command } => match migration_command {
            MigrationCommands::Add { description } => migration::add(&manager, &description)?,
            MigrationCommands::List => migration::list(&manager)?,
            MigrationCommands::Show { id } => migration::show(&manager, &id)?,
        },
        Commands::Table { table_command } => match table_command {
            TableCommands::Add { name } => schema::report(manager.add_table(&name))?,
            TableCommands::Delete { name } => schema::report(manager.delete_table(&name))?,
        },
        Commands::Column { column_command } => match column_command {
            ColumnCommands::Add {
                table,
                column,
                column_type,
                nullable,
                default,
            } => schema::report(manager.add_column(
                &table,
                &column,
                &column_type,
                nullable,
                default.as_deref().unwrap_or(""),
            ))?,
            ColumnCommands::Delete { table, column } => {
                schema::report(manager.delete_column(&table, &column))?
            }
        },
        Commands::PrimaryKey { primary_key_command } => match primary_key_command {
            PrimaryKeyCommands::Add { table, columns } => {
                schema::report(manager.add_primary_key(&table, &columns))?
            }
            PrimaryKeyCommands::Delete { table } => {
                schema::report(manager.delete_primary_key(&table))?
            }
        },
        Commands::Relation { relation_command } => match relation_command {
            RelationCommands::Add {
                table,
                name,
                columns,
                references,
                referenced_columns,
            } => schema::report(manager.add_relation(
                &table,
                &name,
                &columns,
                &references,
                &referenced_columns,
            ))?,
            RelationCommands::Delete { table, name } => {
                schema::report(manager.delete_relation(&table, &name))?
            }
        },
        Commands::Unique { unique_command } => match unique_command {
            UniqueCommands::Add {
                table,
                name,
                columns,
            } => schema::report(manager.add_unique_constraint(&table, &name, &columns))?,
            UniqueCommands::Delete { table, name } => {
                schema::report(manager.delete_unique_constraint(&table, &name))?
            }
        },
        Commands::Snapshot { json } => schema::snapshot(&manager, json)?,
        Commands::Sync => sync::run(&config, manager).await?,
    }

    Ok(())
}
