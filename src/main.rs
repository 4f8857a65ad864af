// pdfembed/src/main.rs
use clap::Parser;
use pdfembed::config::ConfigOverrides;
use pdfembed::logging::{init_tracing, LogFormat, LoggingConfig};
use pdfembed::PipelineError;
use std::path::PathBuf;
use std::process::ExitCode;

/// Turn a PDF into word chunks with embeddings, written as JSON.
#[derive(Debug, Parser)]
#[command(name = "pdfembed", version)]
struct Cli {
    /// PDF file to process
    pdf: PathBuf,

    /// Words per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Embedding model identifier
    #[arg(long)]
    model: Option<String>,

    /// Directory for the JSON artifact
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Extra option as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Write rotated JSON logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// JSON console logs
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn overrides(&self) -> Result<ConfigOverrides, PipelineError> {
        let mut overrides = ConfigOverrides::from_pairs(&self.set)?;
        if let Some(size) = self.chunk_size {
            overrides.chunk_size = Some(size);
        }
        if let Some(model) = &self.model {
            overrides.embedding_model = Some(model.clone());
        }
        if let Some(dir) = &self.output_dir {
            overrides.output_directory = Some(dir.clone());
        }
        Ok(overrides)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if let Some(dir) = &cli.log_dir {
        logging.log_dir = Some(dir.clone());
    }
    if cli.json_logs {
        logging.console_format = LogFormat::Json;
    }
    let _guard = match init_tracing(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.overrides() {
        Ok(overrides) => pdfembed::run_pipeline(&cli.pdf, overrides).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("[{}] {}", e.stage(), e);
            eprintln!("hint: {}", e.recovery_hint());
            ExitCode::FAILURE
        }
    }
}
