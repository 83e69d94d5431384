
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error};

use crate::StudyMateError;
use crate::config::Config;
use crate::ollama::{OllamaClient, model_matches};
use crate::session::{Answer, ProcessingReport, Session};

/// One line typed into the chat loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Ask(String),
    Load(Vec<PathBuf>),
    Sources,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ChatCommand {
    /// Lines starting with `:` are commands, anything else is a question
    #[inline]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        let Some(command) = line.strip_prefix(':') else {
            return Self::Ask(line.to_string());
        };

        let mut words = command.split_whitespace();
        match words.next().unwrap_or_default() {
            "load" | "l" => Self::Load(words.map(PathBuf::from).collect()),
            "sources" | "s" => Self::Sources,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Answer a single question about `pdfs` and exit
#[inline]
pub async fn ask_question(
    question: &str,
    pdfs: &[PathBuf],
    top_k: Option<usize>,
    show_sources: bool,
) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(top_k) = top_k {
        config.retrieval.top_k = top_k;
    }

    let mut session = start_session(config).await?;
    process_with_progress(&mut session, pdfs)
        .await
        .inspect_err(print_failures)?;

    let bar = spinner("Thinking...");
    let result = session.ask(question).await;
    bar.finish_and_clear();

    print_answer(result?, show_sources);
    Ok(())
}

/// Interactive question loop over a set of documents
#[inline]
pub async fn run_chat(files: &[PathBuf], show_sources: bool) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let mut session = start_session(config).await?;

    eprintln!("{}", style("📚 StudyMate").bold().cyan());
    eprintln!("Type a question, or {} for commands.", style(":help").cyan());
    eprintln!();

    if !files.is_empty() {
        report_processing(process_with_progress(&mut session, files).await);
    }

    while let Some(line) = read_line()? {
        match ChatCommand::parse(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => print_help(),
            ChatCommand::Load(paths) if paths.is_empty() => {
                eprintln!("{}", style("Usage: :load <file.pdf>...").yellow());
            }
            ChatCommand::Load(paths) => {
                report_processing(process_with_progress(&mut session, &paths).await);
            }
            ChatCommand::Sources => match session.last_answer() {
                Some(answer) => print_sources(answer),
                None => eprintln!("{}", style("No answer yet.").yellow()),
            },
            ChatCommand::Unknown(command) => {
                eprintln!(
                    "{} Unknown command :{} (try :help)",
                    style("⚠️").yellow(),
                    command
                );
            }
            ChatCommand::Ask(question) => {
                let bar = spinner("Thinking...");
                let result = session.ask(&question).await;
                bar.finish_and_clear();

                match result {
                    Ok(answer) => print_answer(answer, show_sources),
                    Err(StudyMateError::DocumentsNotProcessed) => {
                        eprintln!(
                            "{} {}",
                            style("⚠️").yellow(),
                            style(StudyMateError::DocumentsNotProcessed).yellow()
                        );
                        eprintln!("   Use {} to add documents.", style(":load <file.pdf>").cyan());
                    }
                    Err(e) => {
                        error!("Question failed: {}", e);
                        eprintln!("{} {}", style("❌").red(), e);
                    }
                }
            }
        }
    }

    debug!("Chat session {} ended", session.id());
    Ok(())
}

/// Check the server and both configured models
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 StudyMate Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Ollama Status:");
    let ollama = config.ollama.clone();
    let listing = tokio::task::spawn_blocking(move || {
        OllamaClient::new(&ollama)?
            .with_retry_attempts(1)
            .list_models()
    })
    .await
    .context("Status check task failed")?;

    match listing {
        Ok(models) => {
            println!(
                "   ✅ Ollama: Connected ({}:{})",
                config.ollama.host, config.ollama.port
            );
            println!("   📦 Models pulled: {}", models.len());

            for (role, wanted) in [
                ("Embedding", &config.ollama.embedding_model),
                ("Generation", &config.ollama.generation_model),
            ] {
                if models.iter().any(|m| model_matches(wanted, &m.name)) {
                    println!("   ✅ {} model: {}", role, wanted);
                } else {
                    println!(
                        "   ❌ {} model: {} (not pulled, run `ollama pull {}`)",
                        role, wanted, wanted
                    );
                }
            }
        }
        Err(e) => {
            println!("   ❌ Ollama: Failed to connect - {:#}", e);
        }
    }

    println!();
    println!("⚙️  Settings:");
    println!(
        "   Chunking: {} characters, {} overlap",
        config.chunking.chunk_size, config.chunking.overlap
    );
    println!("   Top K: {}", config.retrieval.top_k);
    println!(
        "   Generation: {} tokens, temperature {}, {}s timeout",
        config.generation.max_tokens, config.generation.temperature, config.generation.timeout_secs
    );
    println!("   Config file: {}", config.config_file_path().display());

    Ok(())
}

async fn start_session(config: Config) -> Result<Session> {
    let bar = spinner("Connecting to Ollama...");
    let session = Session::start(config).await;
    bar.finish_and_clear();

    Ok(session?)
}

async fn process_with_progress(
    session: &mut Session,
    paths: &[PathBuf],
) -> crate::Result<ProcessingReport> {
    let bar = spinner(&format!("Processing {} document(s)...", paths.len()));
    let result = session.process_documents(paths).await;
    bar.finish_and_clear();

    let report = result?;
    print_report(&report);
    Ok(report)
}

fn report_processing(result: crate::Result<ProcessingReport>) {
    if let Err(e) = result {
        eprintln!("{} {}", style("❌").red(), e);
        print_failures(&e);
    }
}

fn print_failures(error: &StudyMateError) {
    for failure in error.extraction_failures() {
        eprintln!("   {} {}", style("⚠️  Skipped:").yellow(), failure);
    }
}

fn print_report(report: &ProcessingReport) {
    eprintln!(
        "{} Indexed {} chunks from {} document(s) in {:.1?}",
        style("✅").green(),
        style(report.chunk_count).cyan(),
        report.documents.len(),
        report.elapsed
    );
    for name in &report.documents {
        eprintln!("   📄 {}", name);
    }
    for failure in &report.failures {
        eprintln!("   {} {}", style("⚠️  Skipped:").yellow(), failure);
    }
    debug!(
        "Embedding dimension {}, processed at {}",
        report.dimension,
        report.processed_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{}", answer.text);
    if show_sources {
        print_sources(answer);
    }
}

fn print_sources(answer: &Answer) {
    eprintln!();
    eprintln!("{}", style("Sources:").bold().yellow());
    for (rank, source) in answer.sources.iter().enumerate() {
        eprintln!(
            "{} chunk #{} from {} (distance {:.4})",
            style(format!("[{}]", rank + 1)).cyan(),
            source.position,
            source_label(&source.sources),
            source.distance
        );
        eprintln!("    {}", style(source.text.replace('\n', " ")).dim());
    }
}

fn source_label(names: &[String]) -> String {
    if names.is_empty() {
        "unknown document".to_string()
    } else {
        names.join(", ")
    }
}

fn print_help() {
    eprintln!("{}", style("Commands:").bold().yellow());
    eprintln!("  {}  process PDFs, replacing the current documents", style(":load <files>").cyan());
    eprintln!("  {}        show the chunks behind the last answer", style(":sources").cyan());
    eprintln!("  {}           show this help", style(":help").cyan());
    eprintln!("  {}           leave the chat", style(":quit").cyan());
    eprintln!("Anything else is asked as a question.");
}

fn spinner(message: &str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Next chat line, or `None` at end of input
fn read_line() -> Result<Option<String>> {
    if console::user_attended() {
        let line = Input::<String>::new()
            .with_prompt("❓")
            .allow_empty(true)
            .interact_text();
        return match line {
            Ok(line) => Ok(Some(line)),
            Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e).context("Failed to read input"),
        };
    }

    eprint!("> ");
    std::io::stderr().flush().ok();
    std::io::stdin()
        .lock()
        .lines()
        .next()
        .transpose()
        .context("Failed to read input")
}
