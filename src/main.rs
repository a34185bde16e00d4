//! Moradias CLI - convert survey address CSVs
//!
//! # Commands
//!
//! ```bash
//! moradias xml entrada.csv         # One building XML per record, zipped
//! moradias convert entrada.csv     # Normalize/merge into the 44-column CSV
//! moradias convert --chunked big.csv
//! moradias validate entrada.csv    # Check the required column set
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use moradias::{
    convert_csv, convert_csv_chunked, generate_xml_batch, validate_required_columns, Config,
    ConversionOutcome, ProgressReporter, ProgressStatus,
};

/// Files above this size take the chunked conversion path automatically.
const LARGE_FILE_MB: f64 = 100.0;

#[derive(Parser)]
#[command(name = "moradias")]
#[command(about = "Convert survey address CSVs into building XMLs or the merged CSV layout", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one building XML per record and package them into a zip
    Xml {
        /// Input CSV file (`;`-separated)
        input: PathBuf,
    },

    /// Normalize and merge a `|`-separated survey CSV into the final layout
    Convert {
        /// Input CSV file (`|`-separated, latin-1)
        input: PathBuf,

        /// Force the chunked path regardless of file size
        #[arg(long)]
        chunked: bool,
    },

    /// Check a conversion input against the required column set
    Validate {
        /// Input CSV file
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Xml { input } => cmd_xml(&input).await,
        Commands::Convert { input, chunked } => cmd_convert(input, chunked).await,
        Commands::Validate { input } => cmd_validate(&input),
    };

    if let Err(e) = result {
        eprintln!("❌ Erro: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_xml(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processando: {}", input.display());

    let config = Config::from_env()?;
    let reporter = Arc::new(ProgressReporter::new());
    let printer = spawn_progress_printer(&reporter);

    let outcome = {
        let reporter = Arc::clone(&reporter);
        let input = input.to_path_buf();
        tokio::task::spawn_blocking(move || generate_xml_batch(&input, &config, &reporter)).await?
    }?;
    printer.await.ok();

    eprintln!();
    eprintln!("📦 Arquivo: {}", outcome.zip_name);
    eprintln!("📊 Registros: {}", outcome.records);
    if let Some(ref summary) = outcome.summary {
        eprintln!("{}", summary);
    }
    if !outcome.transcript.is_empty() {
        eprintln!("\n{}", outcome.transcript);
    }

    if outcome.had_errors() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_convert(input: PathBuf, chunked: bool) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processando: {}", input.display());

    // column check first, like the upload flow: an invalid schema is a
    // report, not a crash
    let report = validate_required_columns(&input)?;
    if !report.valid {
        eprintln!(
            "❌ Arquivo inválido! Colunas faltantes: {}",
            report.missing_columns.join(", ")
        );
        std::process::exit(1);
    }

    let config = Config::from_env()?;
    let file_size_mb = std::fs::metadata(&input)?.len() as f64 / (1024.0 * 1024.0);
    let use_chunked = chunked || file_size_mb > LARGE_FILE_MB;
    if use_chunked {
        eprintln!("🔧 Usando processamento otimizado para arquivo grande...");
    }

    let reporter = Arc::new(ProgressReporter::new());
    let printer = spawn_progress_printer(&reporter);

    let outcome: ConversionOutcome = {
        let reporter = Arc::clone(&reporter);
        tokio::task::spawn_blocking(move || {
            if use_chunked {
                convert_csv_chunked(&input, &config, &reporter)
            } else {
                convert_csv(&input, &config, &reporter)
            }
        })
        .await?
    }?;
    printer.await.ok();

    eprintln!();
    eprintln!("✨ Conversão concluída (job {})", outcome.job_id);
    eprintln!("💾 Arquivo: {}", outcome.file_name);
    eprintln!("📊 Linhas: {}", outcome.rows);
    if outcome.duplicates_removed > 0 {
        eprintln!("📊 Duplicatas removidas: {}", outcome.duplicates_removed);
    }
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validando: {}", input.display());

    let report = validate_required_columns(input)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

/// Print progress events until the batch completes or fails.
fn spawn_progress_printer(reporter: &Arc<ProgressReporter>) -> tokio::task::JoinHandle<()> {
    let mut stream = BroadcastStream::new(reporter.subscribe());
    tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            let Ok(update) = event else { continue };
            match update.progress {
                Some(pct) => eprintln!("[{:>5.1}%] {}", pct, update.message),
                None => eprintln!("        {}", update.message),
            }
            if matches!(
                update.status,
                Some(ProgressStatus::Completed) | Some(ProgressStatus::Error)
            ) {
                break;
            }
        }
    })
}
