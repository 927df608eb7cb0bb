//! openlrs CLI - serve, seed, and inspect a Learning Record Store

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use openlrs::config;
use openlrs::generate;
use openlrs::storage::SqliteStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "openlrs")]
#[command(version = "0.1.0")]
#[command(about = "Lightweight Learning Record Store - xAPI statement ingestion and query")]
#[command(long_about = r#"
openlrs stores xAPI-style activity statements (actor, verb, object, result,
context) in SQLite, deduplicating actors/verbs/objects by natural key.

Example usage:
  openlrs init
  openlrs token create
  openlrs serve --port 8787
  openlrs generate --count 1000
  openlrs stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write openlrs.toml and initialize the database schema
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Run the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8787")]
        port: u16,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Manage auth tokens for the HTTP API
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Generate synthetic xAPI statements into the store
    Generate {
        /// Number of statements to generate
        #[arg(short, long, default_value = "100")]
        count: usize,

        /// Statements per bulk-ingest transaction
        #[arg(short, long, default_value = "100")]
        bulk_size: usize,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show statistics about the store
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Mint a new auth token (or register a supplied one)
    Create {
        /// Token value; random when omitted
        #[arg(short, long)]
        token: Option<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

/// Flag wins over config file, config file over the default
fn resolve_database(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(config) = config::load_config(None)? {
        if let Some(database) = config.database {
            return Ok(PathBuf::from(database));
        }
    }
    Ok(PathBuf::from("openlrs.db"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { database, force } => {
            let database = database.unwrap_or_else(|| PathBuf::from("openlrs.db"));
            let config = config::OpenlrsConfig {
                database: Some(database.to_string_lossy().to_string()),
                port: None,
            };
            config::write_config(&config::default_config_path(), &config, force)?;
            config::ensure_db_dir(&database)?;
            SqliteStore::open(&database)?;
            println!("Initialized store at {:?}", database);
            println!("Config written to {:?}", config::default_config_path());
        }

        Commands::Serve { port, database } => {
            let database = resolve_database(database)?;
            config::ensure_db_dir(&database)?;
            openlrs::server::start_server(port, database).await?;
        }

        Commands::Token { command } => match command {
            TokenCommands::Create { token, database } => {
                let database = resolve_database(database)?;
                let store = SqliteStore::open(&database)?;
                let token =
                    token.unwrap_or_else(|| format!("{:032x}", rand::random::<u128>()));
                store.insert_token(&token)?;
                println!("Auth token registered: {}", token);
                println!("Send it in the Authorization header of /api requests.");
            }
        },

        Commands::Generate {
            count,
            bulk_size,
            database,
        } => {
            let database = resolve_database(database)?;
            let mut store = SqliteStore::open(&database)?;
            println!("Generating {} statements into {:?}...", count, database);
            let created = generate::generate(&mut store, count, bulk_size)?;
            println!("Done. {} statements ingested.", created);
            println!("{}", store.stats()?);
        }

        Commands::Stats { database } => {
            let database = resolve_database(database)?;
            let store = SqliteStore::open(&database)?;
            println!("openlrs Statistics ({:?})", database);
            println!("------------------------------------");
            println!("{}", store.stats()?);
        }
    }

    Ok(())
}
