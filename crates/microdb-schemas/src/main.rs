//! microdb-admin CLI
//!
//! Creates, upgrades, inspects and restores microdb database files.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use microdb::{Connector, ConnectorConfig};
use microdb_schemas::SchemaKind;

/// Administration tool for microdb database files.
#[derive(Parser)]
#[command(name = "microdb-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Time allowed for opening a file, in milliseconds.
    #[arg(long, env = "MICRODB_OPEN_TIMEOUT_MS", default_value_t = 3_000)]
    open_timeout_ms: u64,

    /// Time allowed for waiting on the connection lock, in milliseconds.
    #[arg(long, env = "MICRODB_LOCK_TIMEOUT_MS", default_value_t = 15_000)]
    lock_timeout_ms: u64,

    /// Statements running longer than this are logged, in milliseconds.
    #[arg(long, env = "MICRODB_SOFT_TIMEOUT_MS", default_value_t = 15_000)]
    soft_timeout_ms: u64,

    /// Statements running longer than this are abandoned, in milliseconds.
    #[arg(long, env = "MICRODB_HARD_TIMEOUT_MS", default_value_t = 60_000)]
    hard_timeout_ms: u64,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn config(&self) -> ConnectorConfig {
        ConnectorConfig {
            open_timeout: Duration::from_millis(self.open_timeout_ms),
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            soft_timeout: Duration::from_millis(self.soft_timeout_ms),
            hard_timeout: Duration::from_millis(self.hard_timeout_ms),
        }
    }

    fn connector(&self, schema: SchemaKind, path: PathBuf) -> Connector {
        schema.connector(path).with_config(self.config())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new database file at the schema's current version.
    Create {
        /// Schema of the file.
        schema: SchemaKind,
        /// Database file.
        path: PathBuf,
    },

    /// Upgrade a database file to the schema's current version.
    Upgrade {
        /// Schema of the file.
        schema: SchemaKind,
        /// Database file.
        path: PathBuf,
    },

    /// Print the schema version stored in a file.
    Version {
        /// Database file.
        path: PathBuf,
    },

    /// Compact a database file.
    Vacuum {
        /// Schema of the file.
        schema: SchemaKind,
        /// Database file.
        path: PathBuf,
    },

    /// Replace a database file with a backup copy.
    Restore {
        /// Schema of the file.
        schema: SchemaKind,
        /// Database file.
        path: PathBuf,
        /// Backup to copy over the file.
        backup: PathBuf,
    },

    /// List the known schemas.
    Schemas,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &cli.command {
        Commands::Create { schema, path } => {
            cli.connector(*schema, path.clone()).create().await?;
        }

        Commands::Upgrade { schema, path } => {
            let report = cli.connector(*schema, path.clone()).upgrade().await?;
            if report.is_noop() {
                info!(version = report.to, "Already up to date");
            } else {
                info!(
                    from = report.from,
                    to = report.to,
                    steps = report.applied.len(),
                    "Upgrade complete"
                );
            }
        }

        Commands::Version { path } => {
            // Any schema reads the marker; none is upgraded.
            let version = cli
                .connector(SchemaKind::NameValuePairs, path.clone())
                .stored_version()
                .await?;
            println!("{version}");
        }

        Commands::Vacuum { schema, path } => {
            let conn = cli.connector(*schema, path.clone()).connect().await?;
            conn.vacuum().await?;
            conn.close().await?;
        }

        Commands::Restore {
            schema,
            path,
            backup,
        } => {
            cli.connector(*schema, path.clone()).restore(backup).await?;
        }

        Commands::Schemas => {
            println!("\nKnown schemas:");
            println!("{:-<60}", "");
            for kind in SchemaKind::ALL {
                let schema = kind.definition();
                println!(
                    " {:<16} v{}  ({} tables)",
                    schema.name,
                    schema.target_version,
                    schema.tables.len()
                );
            }
            println!();
        }
    }

    Ok(())
}
