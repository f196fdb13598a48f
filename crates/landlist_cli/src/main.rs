//! `landlist` command line front end.
//!
//! # Responsibility
//! - Wire a blob backend, a console notification sink and the engine config
//!   into one `ListingStore`.
//! - Ask for explicit confirmation (`--yes`) before destructive operations.
//! - Exit non-zero whenever the store refuses or fails an operation.

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use landlist_core::lifecycle::{self, LifecycleStatus};
use landlist_core::{
    format_expiration, init_logging, sanitize, BlobStore, ContractType, EngineConfig,
    FileBlobStore, Listing, ListingId, ListingStore, Notification, NotificationSink, Severity,
    SqliteBlobStore, StorageError, StoreError,
};
use log::{info, warn};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const SQLITE_FILE_NAME: &str = "landlist.sqlite3";
const CONFIG_FILE_NAME: &str = "landlist.toml";

/// Land listing catalog maintenance tool
#[derive(Parser, Debug)]
#[command(name = "landlist", version, about = "Manage the land listing catalog")]
struct Cli {
    /// Directory holding the persisted catalog and logs
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Persistence backend
    #[arg(long, value_enum, default_value_t = Backend::File)]
    backend: Backend,

    /// TOML config file (default: {data_dir}/landlist.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    File,
    Sqlite,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every listing with its lifecycle status
    List,

    /// Print one listing as JSON
    Show { id: ListingId },

    /// Register a new listing
    Add {
        #[command(flatten)]
        fields: ListingFields,

        /// Contract term: six-months, one-year or indefinite
        #[arg(long, value_parser = parse_contract)]
        contract: Option<ContractType>,
    },

    /// Change fields of an existing listing
    Update {
        id: ListingId,

        #[command(flatten)]
        fields: ListingFields,
    },

    /// Remove a listing
    Delete {
        id: ListingId,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Replace the whole catalog with the default listings
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Push a listing's expiration forward
    Extend {
        id: ListingId,

        /// Months to add (default: extension_months from config)
        #[arg(long)]
        months: Option<u32>,
    },

    /// Show store and configuration details
    Info,
}

/// Editable listing fields. Unset flags leave the field untouched.
#[derive(Args, Debug, Default, Clone)]
struct ListingFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    full_address: Option<String>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    area: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    solar_position: Option<String>,
    #[arg(long)]
    property_type: Option<String>,
    /// Comma-separated tags
    #[arg(long)]
    tags: Option<String>,
    /// Comma-separated features
    #[arg(long)]
    features: Option<String>,
    /// Comma-separated image URLs; the first one is the cover
    #[arg(long)]
    images: Option<String>,
}

impl ListingFields {
    /// Writes every set flag into a raw listing record.
    fn apply(&self, record: &mut Map<String, Value>) {
        let text_fields = [
            ("title", &self.title),
            ("code", &self.code),
            ("location", &self.location),
            ("fullAddress", &self.full_address),
            ("price", &self.price),
            ("area", &self.area),
            ("description", &self.description),
            ("solarPosition", &self.solar_position),
            ("propertyType", &self.property_type),
            ("tags", &self.tags),
            ("features", &self.features),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                record.insert(key.to_string(), Value::String(value.clone()));
            }
        }

        if let Some(images) = &self.images {
            let urls: Vec<Value> = images
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(|url| Value::String(url.to_string()))
                .collect();
            record.remove("imageUrl");
            record.insert("images".to_string(), Value::Array(urls));
        }
    }
}

fn parse_contract(value: &str) -> Result<ContractType, String> {
    ContractType::parse(value).ok_or_else(|| {
        format!("unknown contract `{value}`; expected six-months, one-year or indefinite")
    })
}

#[derive(Debug)]
enum CliError {
    Io(std::io::Error),
    Storage(StorageError),
    Store(StoreError),
    Json(serde_json::Error),
    NotFound(ListingId),
    ConfirmationRequired(&'static str),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "listing not found: {id}"),
            Self::ConfirmationRequired(op) => {
                write!(f, "`{op}` is destructive; pass --yes to confirm")
            }
        }
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StorageError> for CliError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Prints notifications to stderr, one per line.
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&mut self, notification: Notification) {
        let tag = match notification.severity {
            Severity::Success => "ok",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        eprintln!("[{tag}] {}", notification.message);
    }
}

type Store = ListingStore<Box<dyn BlobStore>, ConsoleSink>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let data_dir = absolute(&cli.data_dir)?;
    std::fs::create_dir_all(&data_dir)?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME));
    let config = EngineConfig::load_or_default(&config_path);

    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let log_dir = data_dir.join("logs");
    if let Err(err) = init_logging(level, &log_dir.to_string_lossy()) {
        eprintln!("warning: file logging disabled: {err}");
    }
    info!(
        "event=cli_start module=cli status=ok backend={:?} command={}",
        cli.backend,
        command_name(&cli.command)
    );

    let blobs: Box<dyn BlobStore> = match cli.backend {
        Backend::File => Box::new(FileBlobStore::new(&data_dir)),
        Backend::Sqlite => Box::new(SqliteBlobStore::open(data_dir.join(SQLITE_FILE_NAME))?),
    };
    let mut store: Store = ListingStore::with_config(config, blobs, ConsoleSink);
    store.load();

    match cli.command {
        Command::List => print_listings(&store),
        Command::Show { id } => {
            let listing = store.get(id).ok_or(CliError::NotFound(id))?;
            println!("{}", serde_json::to_string_pretty(listing)?);
            println!("expiration: {}", format_expiration(listing));
        }
        Command::Add { fields, contract } => {
            let mut record = Map::new();
            fields.apply(&mut record);
            let draft = sanitize(&Value::Object(record));
            let listing = store.add(draft, contract)?;
            println!("{}", listing.id);
        }
        Command::Update { id, fields } => {
            let listing = edited_listing(&store, id, &fields)?;
            store.update(listing)?;
        }
        Command::Delete { id, yes } => {
            if !yes {
                return Err(CliError::ConfirmationRequired("delete"));
            }
            if !store.delete(id)? {
                warn!("event=cli_delete module=cli status=noop id={id}");
                return Err(CliError::NotFound(id));
            }
        }
        Command::Reset { yes } => {
            if !yes {
                return Err(CliError::ConfirmationRequired("reset"));
            }
            store.reset()?;
        }
        Command::Extend { id, months } => {
            let months = months.unwrap_or(store.config().extension_months);
            let listing = store.extend(id, months)?;
            println!("{}", format_expiration(&listing));
        }
        Command::Info => print_info(&store, &cli.backend, &data_dir, &config_path),
    }
    Ok(())
}

/// Current listing with the flag overrides applied and re-sanitized.
fn edited_listing(
    store: &Store,
    id: ListingId,
    fields: &ListingFields,
) -> Result<Listing, CliError> {
    let current = store.get(id).cloned().unwrap_or(Listing {
        id,
        ..Listing::default()
    });
    let Value::Object(mut record) = serde_json::to_value(&current)? else {
        return Err(CliError::NotFound(id));
    };
    fields.apply(&mut record);
    Ok(sanitize(&Value::Object(record)))
}

fn print_listings(store: &Store) {
    let now = Utc::now();
    let window = store.config().expiring_window_days;
    for listing in store.listings() {
        let status = match lifecycle::status(listing, now, window) {
            LifecycleStatus::Untracked => "untracked".to_string(),
            LifecycleStatus::Active => "active".to_string(),
            LifecycleStatus::ExpiringSoon { days } => format!("expires in {days}d"),
            LifecycleStatus::Expired => "expired".to_string(),
        };
        let contract = listing.contract_type.map_or("-", ContractType::label);
        println!(
            "{}\t{}\t{}\t{}\t{}",
            listing.id,
            if listing.code.is_empty() { "-" } else { listing.code.as_str() },
            listing.title,
            contract,
            status
        );
    }
}

fn print_info(store: &Store, backend: &Backend, data_dir: &Path, config_path: &Path) {
    let config = store.config();
    println!("landlist_core {}", landlist_core::core_version());
    println!("backend: {backend:?}");
    println!("data_dir: {}", data_dir.display());
    println!("config: {}", config_path.display());
    println!("storage_key: {}", config.storage_key);
    println!("listings: {}", store.len());
    println!(
        "expiring within {} days: {}",
        config.expiring_window_days,
        store.expiring_soon().len()
    );
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::List => "list",
        Command::Show { .. } => "show",
        Command::Add { .. } => "add",
        Command::Update { .. } => "update",
        Command::Delete { .. } => "delete",
        Command::Reset { .. } => "reset",
        Command::Extend { .. } => "extend",
        Command::Info => "info",
    }
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
