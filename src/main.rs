// Drumscribe CLI
// Exercises upload, transcription, and dataset partitioning end to end

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use drumscribe::beat::BeatQuantizer;
use drumscribe::dataset::{partition_workspace, WorkspaceLayout};
use drumscribe::service::{self, ErrorPayload, FsObjectStore, ServiceConfig};

#[derive(Parser)]
#[command(name = "drumscribe", version, about = "Drum transcription backend utilities")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a WAV file to the object store
    Upload {
        /// Path to the WAV file
        path: PathBuf,

        /// Object key; defaults to the file name
        #[arg(long)]
        key: Option<String>,
    },

    /// Transcribe a stored WAV file
    Transcribe {
        /// Object key of the stored WAV
        key: String,

        /// Beat subdivision counts
        #[arg(long, value_delimiter = ',', default_values_t = vec![3u32, 4, 6])]
        divisions: Vec<u32>,
    },

    /// Partition a workspace of WAV/MIDI pairs into training and
    /// inference sets
    Partition {
        /// Workspace root containing audio/ and midi/ directories
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env();

    if let Err(payload) = run(cli, config).await {
        eprintln!(
            "{}",
            serde_json::to_string(&payload).unwrap_or_else(|_| payload.error.clone())
        );
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ServiceConfig) -> Result<(), ErrorPayload> {
    match cli.command {
        Command::Upload { path, key } => {
            let store = FsObjectStore::open(&config)?;

            let key = match key {
                Some(key) => key,
                None => path
                    .file_name()
                    .ok_or_else(|| ErrorPayload {
                        error: format!("not a file path: {}", path.display()),
                    })?
                    .to_string_lossy()
                    .to_string(),
            };

            let data = tokio::fs::read(&path).await?;
            let response = service::upload_wav(&store, &key, data).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::Transcribe { key, divisions } => {
            let store = FsObjectStore::open(&config)?;
            let quantizer = Arc::new(BeatQuantizer::with_divisions(divisions));

            let result = service::transcribe(&store, quantizer, &key).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Partition { root } => {
            let layout = WorkspaceLayout::new(root);
            let report = partition_workspace(&layout)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
