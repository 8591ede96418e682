//! Recordport CLI - move nested records through spreadsheet CSV
//!
//! ```bash
//! recordport serve                                # Start HTTP server (port 3000)
//! recordport export --type bookings records.json  # Records JSON -> CSV
//! recordport export --type bookings               # Stored records -> CSV
//! recordport import --type bookings edited.csv    # CSV -> store
//! recordport decode edited.csv                    # CSV -> records JSON
//! recordport types                                # Configured record types
//! ```

use clap::{Parser, Subcommand};
use recordport::{
    decode_document, export_document, import_document, record_from_json, record_to_json,
    CodecConfig, JsonFileStore, PolicyKind, Record, RecordStore,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "recordport")]
#[command(about = "Export nested records to CSV and import them back", long_about = None)]
struct Cli {
    /// JSON config file (defaults to $RECORDPORT_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Record store directory
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// Export records as CSV
    Export {
        /// JSON file holding an array of records (default: the store)
        input: Option<PathBuf>,

        /// Record type label
        #[arg(short = 't', long = "type")]
        record_type: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Expansion policy for array fields of different lengths
        #[arg(long, value_enum)]
        policy: Option<PolicyKind>,

        /// Record store directory
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// Import a CSV file into the store
    Import {
        /// Input CSV file
        input: PathBuf,

        /// Record type label
        #[arg(short = 't', long = "type")]
        record_type: String,

        /// Record store directory
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// Rebuild records from a CSV file and print them as JSON
    Decode {
        /// Input CSV file
        input: PathBuf,

        /// Record type whose declared schema to use
        #[arg(short = 't', long = "type")]
        record_type: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List configured record types
    Types,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CodecConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port, store_dir } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = store_dir {
                config.store_dir = dir;
            }
            cmd_serve(config).await
        }

        Commands::Export {
            input,
            record_type,
            output,
            policy,
            store_dir,
        } => {
            if let Some(policy) = policy {
                config.expansion_policy = policy;
            }
            if let Some(dir) = store_dir {
                config.store_dir = dir;
            }
            cmd_export(&config, &record_type, input.as_deref(), output.as_deref()).await
        }

        Commands::Import {
            input,
            record_type,
            store_dir,
        } => {
            if let Some(dir) = store_dir {
                config.store_dir = dir;
            }
            cmd_import(&config, &record_type, &input).await
        }

        Commands::Decode {
            input,
            record_type,
            output,
        } => cmd_decode(&config, &input, record_type.as_deref(), output.as_deref()),

        Commands::Types => cmd_types(&config),
    }
}

async fn cmd_serve(config: CodecConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn RecordStore> = Arc::new(JsonFileStore::with_dir(&config.store_dir));
    recordport::server::start_server(config, store).await
}

async fn cmd_export(
    config: &CodecConfig,
    record_type: &str,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = match input {
        Some(path) => {
            eprintln!("📄 Reading records: {}", path.display());
            read_records(path)?
        }
        None => {
            let store = JsonFileStore::with_dir(&config.store_dir);
            eprintln!("📦 Reading store: {}", store.dir().display());
            store.list(record_type).await?
        }
    };

    let doc = export_document(record_type, &records, config)?;
    eprintln!(
        "   {} records → {} rows ({})",
        doc.record_count, doc.row_count, doc.filename
    );
    write_output(&doc.body, output)?;

    Ok(())
}

async fn cmd_import(
    config: &CodecConfig,
    record_type: &str,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Importing: {}", input.display());

    let bytes = fs::read(input)?;
    let store = JsonFileStore::with_dir(&config.store_dir);
    let report = import_document(&bytes, record_type, config, &store).await?;

    eprintln!("\n📊 {}", report.result.summary());
    for error in &report.result.errors {
        eprintln!("   - {}", error);
    }
    eprintln!("💾 Store: {}", store.dir().display());

    if !report.result.is_clean() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_decode(
    config: &CodecConfig,
    input: &Path,
    record_type: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = match record_type {
        Some(label) => config
            .record_type(label)
            .ok_or_else(|| format!("Unknown record type: {}", label))?
            .schema
            .as_ref(),
        None => None,
    };

    let bytes = fs::read(input)?;
    let decoded = decode_document(&bytes, schema)?;

    let json: Vec<serde_json::Value> = decoded.records.into_iter().map(record_to_json).collect();
    write_output(&serde_json::to_string_pretty(&json)?, output)?;

    Ok(())
}

fn cmd_types(config: &CodecConfig) -> Result<(), Box<dyn std::error::Error>> {
    for (name, type_config) in &config.record_types {
        println!("📄 {}", name);
        if !type_config.required_fields.is_empty() {
            println!("   Required: {}", type_config.required_fields.join(", "));
        }
        if let Some(schema) = &type_config.schema {
            for (path, kind) in &schema.fields {
                println!("   {}: {:?}", path, kind);
            }
        }
    }
    Ok(())
}

fn read_records(path: &Path) -> Result<Vec<Record>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&content)?;

    let records: Result<Vec<Record>, String> = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            record_from_json(value)
                .ok_or_else(|| format!("Record {} is not a JSON object", i + 1))
        })
        .collect();

    Ok(records?)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
