use crate::engine::{EngineOutput, ProcessEngine};
use crate::error::DispatchError;
use crate::model::{OperationResult, UiRequest};
use crate::normalize::Normalizer;
use crate::orchestrator::{Dispatcher, Operation};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "mailgrid-bridge",
    version,
    about = "Normalize campaign requests and dispatch them to the mailgrid engine"
)]
pub struct Cli {
    /// Path to the mailgrid executable
    #[arg(long, global = true, default_value = "mailgrid")]
    pub engine: PathBuf,

    /// Directory for temporary template/CSV files (defaults to the system temp dir)
    #[arg(long, global = true)]
    pub temp_dir: Option<PathBuf>,

    /// How often a running scheduler checks for a stop request
    #[arg(long, global = true, default_value = "100ms")]
    pub poll_interval: humantime::Duration,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Send a campaign
    Run(RequestArgs),
    /// Start the engine's preview server for a campaign
    Preview(RequestArgs),
    /// Schedule a campaign for deferred or recurring delivery
    Schedule(RequestArgs),
    /// Inspect or cancel scheduled jobs
    #[command(subcommand)]
    Jobs(JobsCommand),
    /// Run the scheduler daemon until interrupted (Ctrl-C)
    Scheduler {
        /// Scheduler database path (defaults to mailgrid.db)
        #[arg(long)]
        db: Option<String>,
    },
}

#[derive(Debug, Args, Clone)]
pub struct RequestArgs {
    /// JSON request file as produced by the GUI, or `-` for stdin
    #[arg(long, short, default_value = "-")]
    pub request: PathBuf,
}

#[derive(Debug, Subcommand, Clone)]
pub enum JobsCommand {
    /// List scheduled jobs
    List {
        /// Scheduler database path (defaults to mailgrid.db)
        #[arg(long)]
        db: Option<String>,
    },
    /// Cancel a scheduled job
    Cancel {
        /// Job identifier
        id: String,
        /// Scheduler database path (defaults to mailgrid.db)
        #[arg(long)]
        db: Option<String>,
    },
}

type CampaignFn = fn(&Dispatcher<ProcessEngine>, &UiRequest) -> Result<EngineOutput, DispatchError>;

/// Build the dispatcher described by the global options.
pub fn build_dispatcher(args: &Cli) -> Dispatcher<ProcessEngine> {
    let engine =
        ProcessEngine::new(&args.engine).with_poll_interval(Duration::from(args.poll_interval));
    let normalizer = match args.temp_dir.as_ref() {
        Some(dir) => Normalizer::new(dir),
        None => Normalizer::default(),
    };
    tracing::debug!(
        engine = %engine.program().display(),
        temp_dir = %normalizer.temp_dir().display(),
        "dispatcher configured"
    );
    Dispatcher::new(engine, normalizer)
}

pub async fn run(args: Cli) -> Result<OperationResult> {
    let dispatcher = build_dispatcher(&args);

    match args.command {
        Command::Run(req) => campaign(dispatcher, Operation::Run, &req, Dispatcher::run).await,
        Command::Preview(req) => {
            campaign(dispatcher, Operation::Preview, &req, Dispatcher::preview).await
        }
        Command::Schedule(req) => {
            campaign(dispatcher, Operation::Schedule, &req, Dispatcher::schedule).await
        }
        Command::Jobs(JobsCommand::List { db }) => {
            let outcome = tokio::task::spawn_blocking(move || {
                dispatcher.list_jobs(db.as_deref().unwrap_or(""))
            })
            .await
            .context("job listing task failed")?;
            Ok(OperationResult::from_listing(outcome))
        }
        Command::Jobs(JobsCommand::Cancel { id, db }) => {
            let outcome = tokio::task::spawn_blocking(move || {
                dispatcher.cancel_job(&id, db.as_deref().unwrap_or(""))
            })
            .await
            .context("job cancel task failed")?;
            Ok(OperationResult::from_outcome(
                outcome,
                Operation::CancelJob.success_message(),
            ))
        }
        Command::Scheduler { db } => run_scheduler(&dispatcher, db.as_deref().unwrap_or("")).await,
    }
}

/// Read the request, run the blocking dispatch off the async runtime and shape the result.
async fn campaign(
    dispatcher: Dispatcher<ProcessEngine>,
    operation: Operation,
    args: &RequestArgs,
    dispatch: CampaignFn,
) -> Result<OperationResult> {
    let ui = read_request(&args.request)?;
    let outcome = tokio::task::spawn_blocking(move || dispatch(&dispatcher, &ui))
        .await
        .with_context(|| format!("{} task failed", operation.as_str()))?;
    Ok(OperationResult::from_outcome(outcome, operation.success_message()))
}

/// Run the scheduler in the foreground, streaming its events to stderr until it ends.
async fn run_scheduler(
    dispatcher: &Dispatcher<ProcessEngine>,
    db: &str,
) -> Result<OperationResult> {
    let mut handle = dispatcher.start_scheduler(db);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = handle.next_event() => {
                match event {
                    Some(event) => eprintln!("{}", event.to_message()),
                    None => break,
                }
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if signal.is_ok() {
                    eprintln!("Stopping scheduler…");
                    handle.stop();
                }
            }
        }
    }

    let outcome = handle.wait().await;
    let message = if interrupted {
        "Scheduler stopped"
    } else {
        "Scheduler exited"
    };
    Ok(OperationResult::from_outcome(outcome, message))
}

/// Parse a GUI request from `path`, with `-` meaning stdin.
fn read_request(path: &Path) -> Result<UiRequest> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("read request {}", path.display()))?
    };
    serde_json::from_str(&raw).context("parse request JSON")
}
