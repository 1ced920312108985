//! Teamflow Server
//!
//! CLI entry point: runs workflows from the terminal, browses the output
//! archive and memory, drives the ISO 19115 engine, or serves the HTTP API.

mod api;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use teamflow_core::config::{ExecutionMode, TeamflowConfig};
use teamflow_core::iso19115::{self, MetadataBuilder, MetadataParams};
use teamflow_core::state::{ensure_runtime_dir, OutputArchive};
use teamflow_core::workflow::{
    RunStatus, WorkflowEvent, WorkflowEventKind, WorkflowKind, WorkflowOrchestrator, WorkflowRequest,
};

#[derive(Parser, Clone)]
#[command(author, version, about = "Teamflow - multi-team LLM agent workflows")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the HTTP API server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
    },
    /// Run a workflow and print the composite report
    Run {
        /// Workflow kind (see `teamflow kinds`)
        kind: String,
        /// The user request
        query: String,
        /// Reference document passed to every team
        #[arg(short, long)]
        document: Option<PathBuf>,
        /// `pre-search` or `native-tools`
        #[arg(short, long)]
        mode: Option<String>,
        /// Outer deadline for the whole run
        #[arg(long)]
        deadline_secs: Option<u64>,
    },
    /// Browse the output archive
    Runs {
        #[command(subcommand)]
        command: RunsCommand,
    },
    /// Inspect cross-run memory
    Memory {
        #[command(subcommand)]
        command: MemoryCommand,
    },
    /// ISO 19115 metadata engine
    Iso {
        #[command(subcommand)]
        command: IsoCommand,
    },
    /// List workflow kinds and their team pipelines
    Kinds,
}

#[derive(Subcommand, Clone)]
enum RunsCommand {
    /// Archived runs, newest first
    List,
    /// Print one run's composite report (or its team files)
    Show {
        run_id: String,
        /// Print each team file instead of the composite
        #[arg(long)]
        teams: bool,
    },
    /// Totals by status and by workflow kind
    Summary,
}

#[derive(Subcommand, Clone)]
enum MemoryCommand {
    /// Distinct topics of remembered runs
    Topics,
}

#[derive(Subcommand, Clone)]
enum IsoCommand {
    /// Build a record from a JSON parameter file and print the XML
    Build {
        #[arg(short, long)]
        params: PathBuf,
        /// Write the XML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate an ISO 19139 XML file
    Validate { file: PathBuf },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runtime directory, its `.env` and the merged configuration
async fn load_config() -> anyhow::Result<(PathBuf, TeamflowConfig)> {
    let runtime_dir = ensure_runtime_dir().await?;
    let env_path = runtime_dir.join(".env");
    if env_path.exists() {
        dotenvy::from_path(&env_path).with_context(|| format!("Failed to load {:?}", env_path))?;
    }
    let config = TeamflowConfig::load_with_env(&runtime_dir).await?;
    Ok((runtime_dir, config))
}

fn print_event(event: &WorkflowEvent) {
    let team = event.team.as_deref().unwrap_or("");
    match event.kind {
        WorkflowEventKind::RunStarted => eprintln!("🚀 Run {} started", event.run_id),
        WorkflowEventKind::PreSearchCompleted => eprintln!("🔎 Pre-search completed"),
        WorkflowEventKind::TeamStarted => eprintln!("▶  {}", team),
        WorkflowEventKind::TeamCompleted => eprintln!("✅ {}", team),
        WorkflowEventKind::TeamFailed => eprintln!("❌ {}", team),
        WorkflowEventKind::RunCompleted => eprintln!("🏁 Run completed"),
        WorkflowEventKind::RunFailed => eprintln!("⚠️  Run failed"),
    }
}

async fn run_command(
    runtime_dir: &Path,
    config: TeamflowConfig,
    kind: &str,
    query: &str,
    document: Option<PathBuf>,
    mode: Option<String>,
    deadline_secs: Option<u64>,
) -> anyhow::Result<()> {
    let kind: WorkflowKind = kind.parse()?;
    let mode = mode
        .as_deref()
        .map(str::parse::<ExecutionMode>)
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let document_context = match document {
        Some(path) => Some(
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read document {:?}", path))?,
        ),
        None => None,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let orchestrator = WorkflowOrchestrator::open(config, runtime_dir)?.with_events(tx);
    let request = WorkflowRequest {
        document_context,
        mode,
        deadline_secs,
        ..WorkflowRequest::default()
    };
    let response = orchestrator.run_workflow(kind, query, request).await?;
    drop(orchestrator);
    let _ = printer.await;

    println!("{}", response.composite_output);
    eprintln!("Run ID: {}", response.run_id);

    if response.status == RunStatus::Failed {
        let (code, team) = response
            .error
            .map(|e| (e.code, e.team.unwrap_or_else(|| "none".to_string())))
            .unwrap_or_default();
        bail!("workflow failed ({}), last team executed: {}", code, team);
    }
    Ok(())
}

async fn runs_command(runtime_dir: &Path, command: RunsCommand) -> anyhow::Result<()> {
    let archive = OutputArchive::in_runtime(runtime_dir);
    match command {
        RunsCommand::List => {
            let runs = archive.list().await?;
            if runs.is_empty() {
                println!("No archived runs in {:?}", archive.root());
            }
            for run in runs {
                println!(
                    "{}  {:<8} {:<24} {:>2} teams  {}",
                    run.started_at.format("%Y-%m-%d %H:%M"),
                    run.status.as_str(),
                    run.workflow_kind.as_str(),
                    run.teams.len(),
                    run.query.chars().take(60).collect::<String>()
                );
                println!("    {}", run.run_id);
            }
        }
        RunsCommand::Show { run_id, teams } => {
            let Some(run) = archive.read(&run_id).await? else {
                bail!("run '{}' not found", run_id);
            };
            if teams || run.composite.is_none() {
                for team in &run.teams {
                    println!("===== {} =====\n{}", team.file, team.content);
                }
            } else if let Some(composite) = &run.composite {
                println!("{}", composite);
            }
        }
        RunsCommand::Summary => {
            let summary = archive.summary().await?;
            println!("Total runs: {}", summary.total_runs);
            for (status, count) in &summary.by_status {
                println!("  status {:<10} {}", status, count);
            }
            for (kind, count) in &summary.by_kind {
                println!("  kind   {:<24} {}", kind, count);
            }
        }
    }
    Ok(())
}

async fn iso_command(command: IsoCommand) -> anyhow::Result<()> {
    match command {
        IsoCommand::Build { params, output } => {
            let raw = tokio::fs::read_to_string(&params)
                .await
                .with_context(|| format!("Failed to read {:?}", params))?;
            let params: MetadataParams = serde_json::from_str(&raw).context("Invalid metadata parameters")?;
            let generated = iso19115::generate(&MetadataBuilder::default(), &params)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &generated.xml)
                        .await
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    eprintln!("Wrote {:?}", path);
                }
                None => print!("{}", generated.xml),
            }
            eprintln!("{}", generated.report.to_markdown());
        }
        IsoCommand::Validate { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {:?}", file))?;
            let report = iso19115::validate(&bytes);
            println!("{}", report.to_markdown());
            if !report.valid {
                bail!("{} issue(s) found", report.total_issues);
            }
        }
    }
    Ok(())
}

fn kinds_command() {
    for kind in WorkflowKind::all() {
        let teams: Vec<&str> = kind.pipeline().iter().map(|t| t.name()).collect();
        println!("{:<24} {}", kind.as_str(), kind.display_name());
        println!("    {}", teams.join(" → "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Some(CliCommand::Iso { command }) => iso_command(command).await,
        Some(CliCommand::Kinds) => {
            kinds_command();
            Ok(())
        }
        Some(CliCommand::Run {
            kind,
            query,
            document,
            mode,
            deadline_secs,
        }) => {
            let (runtime_dir, config) = load_config().await?;
            run_command(&runtime_dir, config, &kind, &query, document, mode, deadline_secs).await
        }
        Some(CliCommand::Runs { command }) => {
            let (runtime_dir, _) = load_config().await?;
            runs_command(&runtime_dir, command).await
        }
        Some(CliCommand::Memory {
            command: MemoryCommand::Topics,
        }) => {
            let (runtime_dir, config) = load_config().await?;
            let orchestrator = WorkflowOrchestrator::open(config, &runtime_dir)?;
            match orchestrator.memory() {
                Some(memory) => {
                    for topic in memory.topics().await? {
                        println!("{}", topic);
                    }
                }
                None => println!("Memory is disabled"),
            }
            Ok(())
        }
        Some(CliCommand::Serve { port, host }) => serve(host, port).await,
        None => serve(IpAddr::from([127, 0, 0, 1]), 8080).await,
    }
}

async fn serve(host: IpAddr, port: u16) -> anyhow::Result<()> {
    let (runtime_dir, config) = load_config().await?;
    tracing::info!(
        runtime_dir = ?runtime_dir,
        backend = ?config.llm.backend,
        model = %config.llm.model,
        mode = config.mode.as_str(),
        "Loaded configuration"
    );
    let state = Arc::new(api::AppState {
        orchestrator: WorkflowOrchestrator::open(config, &runtime_dir)?,
        metadata: MetadataBuilder::default(),
    });
    api::serve(state, SocketAddr::new(host, port)).await
}
