mod status;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use migrun_config::{AppConfig, ConfigLoader, LogConfig};
use migrun_db::Runner;
use rusqlite::Connection;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "migrun", version, about = "Inspect and initialise migration bookkeeping")]
struct Cli {
    /// Config file (TOML or YAML). Defaults to ~/.migrun/config.toml
    #[arg(short, long, env = "MIGRUN_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file; overrides `database.path`
    #[arg(long, env = "MIGRUN_DATABASE")]
    db: Option<PathBuf>,

    /// Bookkeeping table; overrides `migrations.table`
    #[arg(long)]
    table: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the bookkeeping table if it does not exist
    Init,
    /// List applied migrations, oldest first
    Status {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_tracing(&config.log);

    let db_path = cli
        .db
        .clone()
        .or_else(|| config.database.path.clone())
        .context("no database given; pass --db or set database.path in the config")?;
    if !db_path.exists() && matches!(cli.command, Command::Status { .. }) {
        bail!("database {} does not exist", db_path.display());
    }

    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let runner = Runner::from_config(&config.migrations);

    match cli.command {
        Command::Init => {
            runner
                .run(&conn, &[])
                .context("failed to initialise bookkeeping table")?;
            info!("bookkeeping table {} ready in {}", runner.table(), db_path.display());
            println!("Bookkeeping table '{}' is ready.", runner.table());
        }
        Command::Status { json } => {
            let records = runner
                .applied(&conn)
                .context("failed to read applied migrations")?;
            let mut out = std::io::stdout().lock();
            if json {
                status::print_json(&mut out, &records)?;
            } else {
                status::print_table(&mut out, runner.table(), &records)?;
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ConfigLoader::load_or_default(&ConfigLoader::default_path())
            .context("failed to load default config")?,
    };

    if let Some(table) = &cli.table {
        config.migrations.table = table.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
