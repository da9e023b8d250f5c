//! zipshards command line.
//!
//! Builds shards from source files, splits the unified shard per country and
//! runs lookups.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};
use zipshards::countries::COUNTRY_CODES;
use zipshards::record::ShardRecord;
use zipshards::{import, Controller, Partitioner, ShardConfig, ShardId, ShardStore};

/// Per-country postal code shards
#[derive(Parser, Debug)]
#[command(name = "zipshards")]
#[command(about = "Split and query per-country postal code shards")]
#[command(version)]
struct Args {
    /// Directory holding the shard files (defaults to $ZIPSHARDS_DB_FOLDER or ./data)
    #[arg(short, long)]
    db_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split the unified shard into one shard per country
    Split,

    /// Compare every per-country shard with the unified shard
    Verify,

    /// Build the unified shard from a GeoNames postal code dump
    ///
    /// Only numeric postal codes are kept. Rows such as `AD100`, `00-001` or
    /// `1011 AB` are skipped, so countries using them (AD, GB, NL, PL, ...)
    /// get no shard.
    ImportGeonames {
        /// Tab separated GeoNames file
        file: PathBuf,
    },

    /// Build the Italy shard from the municipality list
    ///
    /// Rows with a wildcard CAP (e.g. `001xx`) are skipped.
    ImportComuni {
        /// Semicolon separated listacomuni file
        file: PathBuf,
    },

    /// Print the postal code of a place
    Zipcode {
        placename: String,
        countrycode: String,
    },

    /// Print the places using a postal code
    Placenames {
        countrycode: String,
        zipcode: u32,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zipshards=debug"));

    // Lookup results go to stdout
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match args.db_folder {
        Some(folder) => ShardConfig::new(folder),
        None => ShardConfig::from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!("Shard folder: {}", config.db_folder().display());

    let store = ShardStore::new(config);
    let succeeded = match args.command {
        Commands::Split => Partitioner::new(&store).split(COUNTRY_CODES).is_ok(),
        Commands::Verify => match Partitioner::new(&store).verify(COUNTRY_CODES) {
            Ok(report) => {
                tracing::info!(
                    verified = report.verified.len(),
                    missing = ?report.missing,
                    mismatched = ?report.mismatched,
                    unexpected = ?report.unexpected,
                    "verification finished"
                );
                report.is_clean()
            }
            Err(_) => false,
        },
        Commands::ImportGeonames { file } => {
            build_shard(&store, ShardId::Unified, &file, import::read_geonames)
        }
        Commands::ImportComuni { file } => {
            build_shard(&store, ShardId::Italy, &file, import::read_comuni)
        }
        Commands::Zipcode {
            placename,
            countrycode,
        } => {
            let mut controller = Controller::new(store);
            if let Some(zipcode) = controller.zipcode_by_placename(&placename, &countrycode) {
                println!("{}", zipcode);
            }
            true
        }
        Commands::Placenames {
            countrycode,
            zipcode,
        } => {
            let mut controller = Controller::new(store);
            for name in controller
                .placenames_by_zipcode(&countrycode, zipcode)
                .unwrap_or_default()
            {
                println!("{}", name);
            }
            true
        }
    };

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Reads `file` with `read` and writes its rows into a freshly created shard.
fn build_shard<R, F>(store: &ShardStore, id: ShardId, file: &Path, read: F) -> bool
where
    R: ShardRecord,
    F: FnOnce(BufReader<File>) -> zipshards::Result<import::Imported<R>>,
{
    let result = File::open(file)
        .map_err(zipshards::Error::from)
        .and_then(|f| read(BufReader::new(f)))
        .and_then(|imported| {
            let shard = store.create(&id)?;
            shard.create_schema()?;
            let rows = shard.insert_batch(&imported.records)?;
            Ok((rows, imported.skipped))
        });

    match result {
        Ok((rows, skipped)) => {
            tracing::info!(shard = %id, rows, skipped, "shard built from {}", file.display());
            true
        }
        Err(e) => {
            tracing::error!(shard = %id, "failed to build shard from {}: {}", file.display(), e);
            false
        }
    }
}
