//! Itemstore CLI - manage items directly or serve them as MCP tools

use clap::{Args, Parser, Subcommand};
use itemstore::config::{self, Settings};
use itemstore::storage::Backend;
use itemstore::ItemService;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "itemstore")]
#[command(version)]
#[command(about = "Item persistence engine with document and relational backends")]
#[command(long_about = r#"
Itemstore keeps a collection of named, priced items in either a JSON document
or a SQLite database, and publishes add/list/edit/remove as MCP tools.

Example usage:
  itemstore add --name Widget --price 9.99
  itemstore list
  itemstore --backend relational --database-url sqlite://items.db list
  itemstore serve
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON envelopes instead of human output
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where settings come from and which backend to open
#[derive(Args)]
struct StoreArgs {
    /// Path to the config file (defaults to ./itemstore.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend: document or relational
    #[arg(short, long, global = true)]
    backend: Option<Backend>,

    /// JSON file used by the document backend
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Connection string used by the relational backend
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Hold an advisory lock across each document load-mutate-save
    #[arg(long, global = true)]
    lock: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the item tools over MCP stdio
    Serve,

    /// Add an item
    Add {
        /// Item name
        #[arg(short, long)]
        name: String,

        /// Item price
        #[arg(short, long, allow_negative_numbers = true)]
        price: f64,

        /// Use this id instead of a generated one
        #[arg(long)]
        id: Option<String>,
    },

    /// List all items
    List,

    /// Show one item
    Show {
        /// Item id
        id: String,
    },

    /// Replace the name and price of an item
    Edit {
        /// Item id
        id: String,

        /// New name
        #[arg(short, long)]
        name: String,

        /// New price
        #[arg(short, long, allow_negative_numbers = true)]
        price: f64,
    },

    /// Remove an item
    Remove {
        /// Item id
        id: String,
    },

    /// Write a default itemstore.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Print the resolved settings
    Settings,
}

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print `{"status":"ok","command":..,"data":..}` in JSON mode
pub fn emit_success(
    output_mode: OutputMode,
    command: &str,
    data: serde_json::Value,
) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "status": "ok",
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn emit_error(command: &str, err: &anyhow::Error) {
    let kind = err
        .downcast_ref::<itemstore::Error>()
        .map(|e| format!("{:?}", e.kind()))
        .unwrap_or_else(|| "Internal".to_string());
    let envelope = serde_json::json!({
        "status": "error",
        "command": command,
        "kind": kind,
        "message": err.to_string(),
    });
    println!("{}", envelope);
}

/// Defaults, then config file, then environment, then CLI flags
fn resolve_settings(cli: &StoreArgs) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    if let Some(file) = config::load_config(cli.config.as_deref())? {
        settings.merge(&file);
    }
    settings.apply_env()?;

    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    if let Some(data_file) = &cli.data_file {
        settings.data_file = data_file.clone();
    }
    if let Some(url) = &cli.database_url {
        settings.database_url = url.clone();
    }
    if cli.lock {
        settings.lock_documents = true;
    }
    Ok(settings)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout belongs to the MCP transport
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let command_name = command_name(&cli.command);

    let result = run(cli, output_mode);
    if let Err(err) = &result {
        if output_mode == OutputMode::Json {
            emit_error(command_name, err);
            std::process::exit(1);
        }
    }
    result
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Serve => "serve",
        Commands::Add { .. } => "add",
        Commands::List => "list",
        Commands::Show { .. } => "show",
        Commands::Edit { .. } => "edit",
        Commands::Remove { .. } => "remove",
        Commands::Init { .. } => "init",
        Commands::Settings => "settings",
    }
}

fn open_service(store: &StoreArgs) -> anyhow::Result<ItemService> {
    let settings = resolve_settings(store)?;
    tracing::debug!("Resolved settings: {:?}", settings);
    Ok(ItemService::open(&settings)?)
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    match cli.command {
        // Settings are not resolved here so init can replace a broken config
        Commands::Init { force } => {
            let path = cli.store.config.clone().unwrap_or_else(config::default_config_path);
            commands::run_init(output_mode, &path, force)
        }

        Commands::Settings => commands::run_settings(output_mode, &resolve_settings(&cli.store)?),

        Commands::Serve => {
            let service = open_service(&cli.store)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(itemstore::server::McpService::new(service).run_stdio())
        }

        Commands::Add { name, price, id } => {
            let service = open_service(&cli.store)?;
            commands::run_add(output_mode, &service, name, price, id)
        }

        Commands::List => {
            let service = open_service(&cli.store)?;
            commands::run_list(output_mode, &service)
        }

        Commands::Show { id } => {
            let service = open_service(&cli.store)?;
            commands::run_show(output_mode, &service, &id)
        }

        Commands::Edit { id, name, price } => {
            let service = open_service(&cli.store)?;
            commands::run_edit(output_mode, &service, &id, name, price)
        }

        Commands::Remove { id } => {
            let service = open_service(&cli.store)?;
            commands::run_remove(output_mode, &service, &id)
        }
    }
}
