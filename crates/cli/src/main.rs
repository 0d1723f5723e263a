//! `research` command-line client.
//!
//! Streams report generation progress from a research server and prints the
//! finished report, lists stored reports, answers follow-up questions, and
//! resolves PDF export links.

mod render;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use colored::Colorize;
use render::{render_follow_up, render_report, render_report_list, render_steps, ProgressPrinter};
use rk_core::client::ResearchClient;
use rk_core::config::{load_settings, ClientSettings};
use rk_core::state::SessionContext;
use rk_protocol::config_models::{GenerateRequest, ResearchSettings, SourceKind};
use rk_protocol::ipc::Event;
use rk_protocol::report_models::ReportId;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "research", version, about = "Generate literature research reports")]
struct Cli {
    /// Project root containing `.research-kit/config.toml`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Server URL, overriding the config file and RESEARCH_KIT_BASE_URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a report and follow its progress.
    Generate {
        question: String,

        /// Number of sources kept in the report.
        #[arg(long)]
        max_sources: Option<u32>,

        /// Skip open-access full text enrichment.
        #[arg(long)]
        no_fulltext: bool,

        /// Do not search this source (pubmed, openalex, europe-pmc, crossref, clinical-trials).
        #[arg(long = "disable", value_name = "SOURCE")]
        disable: Vec<SourceKind>,
    },

    /// List the reports stored on the server.
    List,

    /// Print a stored report.
    Report { id: String },

    /// Ask a follow-up question about a report.
    Followup { id: String, question: String },

    /// Print the PDF export link of a report.
    Export { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let settings = load_settings(&cli.root, cli.base_url.clone()).await?;
    init_tracing(&settings);
    debug!(base_url = %settings.base_url, root = %cli.root.display(), "loaded settings");

    let client = ResearchClient::from_settings(&settings)?;

    match cli.command {
        Command::Generate {
            question,
            max_sources,
            no_fulltext,
            disable,
        } => {
            let research = research_settings(&settings, max_sources, no_fulltext, &disable);
            generate(&client, GenerateRequest::new(question).with_settings(research)).await
        }
        Command::List => {
            let reports = client.list_reports().await?;
            println!("{}", render_report_list(&reports));
            Ok(())
        }
        Command::Report { id } => {
            let report = client.get_report(&ReportId::from(id)).await?;
            println!("{}", render_report(&report));
            Ok(())
        }
        Command::Followup { id, question } => {
            let session = SessionContext::new();
            session.set(ReportId::from(id));
            let answer = client.follow_up(&session, &question).await?;
            println!("{}", render_follow_up(&answer));
            Ok(())
        }
        Command::Export { id } => {
            let session = SessionContext::new();
            session.set(ReportId::from(id));
            println!("{}", client.export_pdf_url(&session)?);
            Ok(())
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` or the configured level.
fn init_tracing(settings: &ClientSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn research_settings(
    settings: &ClientSettings,
    max_sources: Option<u32>,
    no_fulltext: bool,
    disable: &[SourceKind],
) -> ResearchSettings {
    let mut research = settings.research.clone();
    if let Some(max_sources) = max_sources {
        research.max_sources = max_sources;
    }
    if no_fulltext {
        research.include_fulltext = false;
    }
    for kind in disable {
        research.set_enabled(*kind, false);
    }
    research
}

async fn generate(client: &ResearchClient, request: GenerateRequest) -> Result<()> {
    let session = SessionContext::new();
    let engine = client.engine(session.clone());
    let (events_tx, mut events_rx) = mpsc::channel(64);

    let run = tokio::spawn(async move { engine.run(request, events_tx).await });
    let mut printer = ProgressPrinter::new();

    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(Event::RunStarted { question, .. }) => {
                    println!("{} {question}", "Researching:".bold());
                }
                Some(Event::ProgressUpdated { progress, .. }) => {
                    if progress.is_terminal() {
                        println!("{}", render_steps(&progress));
                    } else if let Some(line) = printer.update(&progress) {
                        println!("{line}");
                    }
                }
                Some(Event::ReportReady { report, .. }) => {
                    println!("\n{}", render_report(&report));
                }
                Some(Event::RunFailed { message, .. }) => {
                    eprintln!("{} {message}", "Error:".red().bold());
                }
                Some(Event::RunFinished { .. }) | None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                // Dropping the engine's stream aborts the request
                run.abort();
                return Err(eyre!("generation cancelled"));
            }
        }
    }

    let outcome = run.await?.map_err(|e| eyre!(e))?;

    if !outcome.succeeded() {
        return Err(eyre!("report generation failed"));
    }
    if let Ok(url) = client.export_pdf_url(&session) {
        println!("{} {url}", "PDF:".bold());
    }
    Ok(())
}
