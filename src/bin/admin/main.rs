//! xmlstore Admin Binary
//!
//! Inspects and maintains the documents of the known entity types.

mod entities;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};
use xmlstore::{Config, DocumentStore, Entity, Result, SchemaSynchronizer, Session};

use entities::{Employee, User};

/// xmlstore admin tool
#[derive(Parser, Debug)]
#[command(name = "xmlstore-admin")]
#[command(about = "Inspect and maintain xmlstore documents")]
#[command(version)]
struct Args {
    /// Data directory holding the documents and schemas
    #[arg(short, long, default_value = "./xmlstore_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Print properties, descriptors, hooks and fingerprint
    Describe {
        entity: EntityKind,
    },

    /// Print the generated schema
    Schema {
        entity: EntityKind,
    },

    /// Create an empty document if none exists
    Init {
        entity: EntityKind,
    },

    /// Regenerate a stale schema and validate the document
    Sync {
        entity: EntityKind,
    },

    /// Print every stored row
    List {
        entity: EntityKind,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum EntityKind {
    User,
    Employee,
}

impl Command {
    fn entity(&self) -> EntityKind {
        match *self {
            Command::Describe { entity }
            | Command::Schema { entity }
            | Command::Init { entity }
            | Command::Sync { entity }
            | Command::List { entity } => entity,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xmlstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("xmlstore admin v{}", xmlstore::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    let config = Config::builder().data_dir(&args.data_dir).build();

    let result = match args.command.entity() {
        EntityKind::User => run::<User>(args.command, config),
        EntityKind::Employee => run::<Employee>(args.command, config),
    };

    if let Err(e) = result {
        tracing::error!(kind = ?e.kind(), "{}", e);
        std::process::exit(1);
    }
}

fn run<E: Entity>(command: Command, config: Config) -> Result<()> {
    let mut session = Session::new();
    let metadata = session.describe::<E>()?;
    let shape = metadata.shape();

    match command {
        Command::Describe { .. } => {
            println!("{} ({})", metadata.name(), shape.document_file_name());
            for property in metadata.properties() {
                let descriptor = property.descriptor();
                println!(
                    "  {:<16} <{}> {}{}{}  [{}]",
                    property.name(),
                    property.element(),
                    descriptor.storage_type,
                    if descriptor.nullable { " nullable" } else { "" },
                    if descriptor.unique { " unique" } else { "" },
                    property.runtime_type()
                );
            }
            for (event, hooks) in metadata.lifecycle_hooks() {
                println!("  {}: {}", event, hooks.join(", "));
            }
            println!("  fingerprint: {}", metadata.fingerprint());
        }
        Command::Schema { .. } => {
            print!("{}", SchemaSynchronizer::generate(shape));
        }
        Command::Init { .. } => {
            let path = config.data_dir.join(shape.document_file_name());
            if path.exists() {
                println!("{} already exists", path.display());
            } else {
                let config = Config {
                    create_missing_documents: true,
                    ..config
                };
                let store = DocumentStore::open(&config, shape)?;
                println!("Created {}", store.document_path().display());
            }
        }
        Command::Sync { .. } => {
            let store = DocumentStore::open(&config, shape)?;
            println!(
                "{} is valid against {} ({} rows)",
                store.document_path().display(),
                store.schema_path().display(),
                store.len()
            );
        }
        Command::List { .. } => {
            let store = DocumentStore::open(&config, shape)?;
            for row in store.rows() {
                let fields: Vec<String> = row
                    .fields
                    .iter()
                    .map(|f| {
                        if f.nil {
                            format!("{}=<nil>", f.name)
                        } else {
                            format!("{}={}", f.name, f.value)
                        }
                    })
                    .collect();
                println!("{}", fields.join(" "));
            }
            println!("{} rows", store.len());
        }
    }

    Ok(())
}
