//! `flowdesk` command-line designer.

mod approval;
mod config;
mod error;

use crate::approval::LoggingApprovalService;
use crate::config::DesignerConfig;
use crate::error::DesignerError;
use clap::{Parser, Subcommand, ValueEnum};
use flowdesk_core::WorkflowId;
use flowdesk_editor::{EditorSession, FileWorkflowStore, SubmissionOutcome};
use flowdesk_workflow::{
    CanvasState, NodeCatalog, Priority, Reachability, StoredWorkflow, SubmissionRequest,
    ValidationIssue, ValidationPolicy, WorkflowStats, get_stats, validate_with,
};
use rootcause::Report;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Design, check, and submit CRM workflows
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file [default: ./flowdesk.toml if present]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the node types available on the palette
    Catalog,
    /// Validate a canvas JSON file
    Validate {
        file: PathBuf,
        /// Override the configured reachability rule
        #[arg(long, value_enum)]
        reachability: Option<ReachabilityArg>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count the nodes of a canvas JSON file by category
    Stats { file: PathBuf },
    /// Create an empty draft in the store
    New {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List the workflows in the store
    List,
    /// Rename a stored workflow
    Rename { workflow_id: WorkflowId, name: String },
    /// Validate, save, and submit a stored draft for review
    Submit {
        workflow_id: WorkflowId,
        #[arg(short, long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
        #[arg(short, long, default_value = "")]
        notes: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReachabilityArg {
    AnyTrigger,
    EveryTrigger,
}

impl From<ReachabilityArg> for Reachability {
    fn from(arg: ReachabilityArg) -> Self {
        match arg {
            ReachabilityArg::AnyTrigger => Self::AnyTrigger,
            ReachabilityArg::EveryTrigger => Self::EveryTrigger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
    Urgent,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
            PriorityArg::Urgent => Self::Urgent,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,flowdesk_editor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(%error, "command failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Report<DesignerError>> {
    let config =
        DesignerConfig::load(cli.config.as_deref()).map_err(|e| DesignerError::Config {
            details: e.to_string(),
        })?;
    tracing::debug!(store_dir = %config.store_dir.display(), "loaded configuration");
    let catalog = Arc::new(NodeCatalog::builtin());

    match cli.command {
        Command::Catalog => {
            print_catalog(&catalog);
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate {
            file,
            reachability,
            json,
        } => {
            let canvas = read_canvas(&file).await?;
            let mut policy = config.editor.validation_policy();
            if let Some(reachability) = reachability {
                policy = ValidationPolicy {
                    reachability: reachability.into(),
                };
            }
            let result = validate_with(&catalog, &canvas.nodes, &canvas.edges, &policy);
            if json {
                let out = serde_json::to_string_pretty(&result).map_err(|e| {
                    DesignerError::Editor {
                        details: e.to_string(),
                    }
                })?;
                println!("{out}");
            } else {
                print_issues("error", &result.errors);
                print_issues("warning", &result.warnings);
                print_stats(&get_stats(&canvas.nodes, &canvas.edges));
                println!("{}", if result.is_valid { "valid" } else { "invalid" });
            }
            Ok(if result.is_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Stats { file } => {
            let canvas = read_canvas(&file).await?;
            print_stats(&get_stats(&canvas.nodes, &canvas.edges));
            Ok(ExitCode::SUCCESS)
        }
        Command::New { name, description } => {
            let store = open_store(&config).await?;
            let mut workflow = StoredWorkflow::new(name.trim());
            if let Some(description) = description {
                workflow = workflow.with_description(description);
            }
            store.create(&workflow).await.map_err(store_error)?;
            tracing::info!(workflow_id = %workflow.id, "draft created");
            println!("{}", workflow.id);
            Ok(ExitCode::SUCCESS)
        }
        Command::List => {
            let store = open_store(&config).await?;
            for workflow in store.list().await.map_err(store_error)? {
                println!(
                    "{}  {:<17}  {}",
                    workflow.id,
                    workflow.status.as_str(),
                    workflow.name
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Rename { workflow_id, name } => {
            let store = open_store(&config).await?;
            let mut session = open_session(workflow_id, catalog, store, &config).await?;
            session.rename(&name).await.map_err(editor_error)?;
            session.close().await.map_err(editor_error)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Submit {
            workflow_id,
            priority,
            notes,
        } => {
            let store = open_store(&config).await?;
            let mut session = open_session(workflow_id, catalog, store, &config).await?;
            let outcome = session
                .submit(SubmissionRequest::new(notes, priority.into()))
                .await
                .map_err(editor_error)?;
            let code = match outcome {
                SubmissionOutcome::Blocked(result) => {
                    println!("submission blocked");
                    print_issues("error", &result.errors);
                    print_issues("warning", &result.warnings);
                    ExitCode::FAILURE
                }
                SubmissionOutcome::Submitted {
                    status,
                    stats,
                    warnings,
                } => {
                    print_issues("warning", &warnings);
                    print_stats(&stats);
                    println!("submitted, status is now {status}");
                    ExitCode::SUCCESS
                }
            };
            session.close().await.map_err(editor_error)?;
            Ok(code)
        }
    }
}

async fn read_canvas(path: &Path) -> Result<CanvasState, Report<DesignerError>> {
    let read_error = |details: String| DesignerError::ReadCanvas {
        path: path.to_path_buf(),
        details,
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| read_error(e.to_string()))?;
    Ok(CanvasState::from_json(&raw).map_err(|e| read_error(e.to_string()))?)
}

async fn open_store(config: &DesignerConfig) -> Result<Arc<FileWorkflowStore>, Report<DesignerError>> {
    let store = FileWorkflowStore::open(&config.store_dir)
        .await
        .map_err(store_error)?;
    Ok(Arc::new(store))
}

async fn open_session(
    workflow_id: WorkflowId,
    catalog: Arc<NodeCatalog>,
    store: Arc<FileWorkflowStore>,
    config: &DesignerConfig,
) -> Result<EditorSession, Report<DesignerError>> {
    let approval = Arc::new(LoggingApprovalService::new(Arc::clone(&store)));
    EditorSession::open(workflow_id, catalog, store, approval, &config.editor)
        .await
        .map_err(editor_error)?
        .ok_or_else(|| DesignerError::NotFound { workflow_id }.into())
}

fn store_error(error: impl std::fmt::Display) -> DesignerError {
    DesignerError::Store {
        details: error.to_string(),
    }
}

fn editor_error(error: impl std::fmt::Display) -> DesignerError {
    DesignerError::Editor {
        details: error.to_string(),
    }
}

fn print_catalog(catalog: &NodeCatalog) {
    for category in catalog.categories() {
        println!("{}", category.display_name());
        for definition in catalog.list_by_category(category) {
            println!(
                "  {:<32} {}  {}",
                definition.node_type.to_string(),
                definition.label,
                definition.description
            );
            for field in &definition.fields {
                let marker = if field.required { "*" } else { " " };
                println!("      {marker} {} ({})", field.name, field.label);
            }
        }
    }
}

fn print_issues(level: &str, issues: &[ValidationIssue]) {
    for issue in issues {
        let anchor = issue
            .node_id
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| issue.edge_id.as_ref().map(ToString::to_string));
        match anchor {
            Some(anchor) => println!("{level}: [{anchor}] {}", issue.message),
            None => println!("{level}: {}", issue.message),
        }
    }
}

fn print_stats(stats: &WorkflowStats) {
    println!(
        "{} nodes, {} edges ({} triggers, {} actions, {} logic, {} ai, {} integrations)",
        stats.total_nodes,
        stats.total_edges,
        stats.triggers,
        stats.actions,
        stats.logic,
        stats.ai,
        stats.integrations
    );
}
