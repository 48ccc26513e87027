//! The `research-agent` command line: one-shot queries or a REPL.

#[macro_use]
extern crate tracing;

use std::fs::{self, File};
use std::io::Write as _;
use std::path::PathBuf;
use std::pin::pin;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use research_agent::core::{GraphEvent, Node, ResearchGraph, ResearchReport};
use research_agent::logging::LogLevel;
use research_agent::search::SearchProvider;
use research_agent::{AppConfig, Session, SessionBuilder};
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

/// Research a topic with an LLM and web search.
#[derive(Parser, Debug)]
#[command(name = "research-agent", version)]
struct Cli {
    /// The research query. Starts the REPL when omitted.
    query: Vec<String>,

    /// Start the REPL even when a query is given.
    #[arg(short, long)]
    interactive: bool,

    /// Log level, overrides `LOG_LEVEL`.
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Use the mock model even if an API key is configured.
    #[arg(long)]
    mock: bool,

    /// Chat model, overrides `RESEARCH_PLANNER_MODEL`.
    #[arg(long)]
    model: Option<String>,

    /// Search backend, overrides `RESEARCH_SEARCH_PROVIDER`.
    #[arg(long, value_enum)]
    search_provider: Option<SearchProvider>,

    /// Searches allowed per query, overrides
    /// `RESEARCH_MAX_SEARCH_ITERATIONS`.
    #[arg(long)]
    max_search_iterations: Option<u32>,

    /// Print the research graph as a Mermaid flowchart and exit.
    #[arg(long)]
    show_graph: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.show_graph {
        print!("{}", ResearchGraph::topology().to_mermaid());
        return ExitCode::SUCCESS;
    }

    let config = AppConfig::from_env();
    let log_level = cli
        .log_level
        .or_else(|| config.as_ref().ok().map(|c| c.log_level))
        .unwrap_or_default();
    if let Err(err) = init_logging(log_level, cli.log_file.as_ref()) {
        eprintln!("cannot open log file: {err}");
        return ExitCode::FAILURE;
    }

    let mut config = match config {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {err}");
            eprintln!("{} {err}", "Configuration error:".bright_red().bold());
            return ExitCode::FAILURE;
        }
    };
    apply_overrides(&cli, &mut config);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session = SessionBuilder::with_config(config)
        .on_event(move |event| {
            event_tx.send(event.clone()).ok();
        })
        .build();
    let session = match session {
        Ok(session) => session,
        Err(err) => {
            error!("invalid configuration: {err}");
            eprintln!("{} {err}", "Configuration error:".bright_red().bold());
            return ExitCode::FAILURE;
        }
    };

    if session.uses_mock_model() {
        eprintln!(
            "{}",
            "Using mock responses for testing (no valid API key found)"
                .dimmed()
        );
    } else {
        eprintln!("{}", "Using OpenAI for LLM".dimmed());
    }

    let query = cli.query.join(" ");
    let query = query.trim();
    if !query.is_empty() {
        let ok = run_query(&session, query, &mut event_rx).await;
        if !cli.interactive {
            return if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE };
        }
    }

    repl(&session, &mut event_rx).await;
    ExitCode::SUCCESS
}

fn apply_overrides(cli: &Cli, config: &mut AppConfig) {
    if cli.mock {
        config.openai_api_key = None;
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(provider) = cli.search_provider {
        config.search_provider = provider;
    }
    if let Some(max) = cli.max_search_iterations {
        config.max_search_iterations = max;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
}

fn init_logging(
    level: LogLevel,
    log_file: Option<&PathBuf>,
) -> std::io::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::new(level.filter_directives()),
    );
    match log_file {
        Some(path) => {
            if let Some(parent) =
                path.parent().filter(|dir| !dir.as_os_str().is_empty())
            {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

async fn repl(session: &Session, event_rx: &mut UnboundedReceiver<GraphEvent>) {
    println!("{}", "Research Agent started!".bright_green().bold());
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("{}", "Enter your research query: ".bold());
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut lines).await else {
            println!();
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit")
        {
            break;
        }
        run_query(session, query, event_rx).await;
    }
}

/// Runs one query behind a spinner and prints the outcome.
async fn run_query(
    session: &Session,
    query: &str,
    event_rx: &mut UnboundedReceiver<GraphEvent>,
) -> bool {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style);
    progress_bar.set_message("🤔 Thinking...");

    let mut research = pin!(session.research(query));
    let result = loop {
        select! {
            result = &mut research => break result,
            Some(event) = event_rx.recv() => {
                match event {
                    GraphEvent::NodeStarted(Node::CallModel) => {
                        progress_bar.set_message("🤔 Thinking...");
                    }
                    GraphEvent::ToolCallStarted(step) => {
                        progress_bar.set_message(format!("🔍 {step}"));
                    }
                    GraphEvent::NodeStarted(_) => {}
                }
            }
            _ = sleep(Duration::from_millis(100)) => {
                progress_bar.inc(1);
            }
        }
    };
    // Finish the progress bar before printing anything else.
    progress_bar.finish_and_clear();
    while event_rx.try_recv().is_ok() {}

    match result {
        Ok(report) => {
            print_report(&report);
            true
        }
        Err(err) => {
            error!("research failed: {err}");
            eprintln!(
                "{}{} {err}",
                BAR_CHAR.bright_red(),
                "Error:".bright_red().bold()
            );
            false
        }
    }
}

fn print_report(report: &ResearchReport) {
    println!("{}", report.to_string().bright_white());
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {err}");
            None
        }
    }
}
