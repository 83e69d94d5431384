use std::path::PathBuf;

use clap::{Parser, Subcommand};
use studymate::Result;
use studymate::commands::{ask_question, run_chat, show_status};
use studymate::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "studymate")]
#[command(about = "Ask questions about your PDF study material using local models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Check the Ollama server and configured models
    Status,
    /// Answer one question about the given PDFs
    Ask {
        /// The question to answer
        question: String,
        /// PDF files to read
        #[arg(long = "pdf", required = true, num_args = 1..)]
        pdfs: Vec<PathBuf>,
        /// Number of chunks to retrieve, overriding the configuration
        #[arg(long)]
        top_k: Option<usize>,
        /// Print the chunks the answer was based on
        #[arg(long)]
        show_sources: bool,
    },
    /// Start an interactive question session
    Chat {
        /// PDF files to load at startup
        files: Vec<PathBuf>,
        /// Print the chunks behind every answer
        #[arg(long)]
        show_sources: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Status => {
            show_status().await?;
        }
        Commands::Ask {
            question,
            pdfs,
            top_k,
            show_sources,
        } => {
            ask_question(&question, &pdfs, top_k, show_sources).await?;
        }
        Commands::Chat {
            files,
            show_sources,
        } => {
            run_chat(&files, show_sources).await?;
        }
    }

    Ok(())
}
