// crates/wfcli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wfcore::{ExecutionEvent, FlowError, NodeEvent, NodeSpec, NodeType, Value, Workflow};
use wfruntime::{FlowRuntime, RuntimeConfig, WorkflowExecutionResult, WorkflowExecutor};

#[derive(Parser)]
#[command(name = "wf")]
#[command(about = "Workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Show debug logs
        #[arg(short, long)]
        verbose: bool,

        /// Print every node's result after the run
        #[arg(short, long)]
        trace: bool,
    },

    /// Validate a workflow file and print its execution order
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    init_logging(verbose);

    match cli.command {
        Commands::Run { file, trace, .. } => run_workflow(&file, trace).await,
        Commands::Validate { file } => validate_workflow(&file),
        Commands::Nodes => {
            list_nodes();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { output } => {
            create_example_workflow(&output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Logs go to stderr so stdout carries only the result envelope
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read a workflow document and run the structural checks the engine assumes
fn load_workflow(file: &Path) -> Result<Workflow> {
    let workflow_json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read workflow file {}", file.display()))?;
    let workflow: Workflow = serde_json::from_str(&workflow_json)
        .with_context(|| format!("Failed to parse workflow file {}", file.display()))?;
    workflow.validate()?;
    Ok(workflow)
}

async fn run_workflow(file: &Path, trace: bool) -> Result<ExitCode> {
    eprintln!("🚀 Loading workflow from: {}", file.display());

    let workflow = match load_workflow(file) {
        Ok(workflow) => workflow,
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&error_envelope(&format!("{:#}", e)))?);
            return Ok(ExitCode::FAILURE);
        }
    };

    eprintln!("   Nodes: {}", workflow.nodes.len());
    eprintln!("   Connections: {}", workflow.connections.len());

    let runtime = FlowRuntime::with_registry(
        Arc::new(wfnodes::default_registry()),
        RuntimeConfig::default(),
    );

    // Subscribe to events for real-time output
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(event);
        }
    });

    let outcome = runtime.execute(&workflow).await;

    // closing the bus ends the listener once it has drained
    drop(runtime);
    let _ = event_task.await;

    if let Ok(result) = &outcome {
        eprintln!(
            "   Executed {} nodes in {}ms (execution {})",
            result.nodes_executed, result.execution_time, result.execution_id
        );
        if trace {
            print_node_results(result);
        }
    }

    println!("{}", serde_json::to_string_pretty(&envelope(&outcome))?);

    Ok(if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_event(event: ExecutionEvent) {
    match event {
        ExecutionEvent::WorkflowStarted { node_count, .. } => {
            eprintln!("▶️  Workflow started ({} nodes)", node_count);
        }
        ExecutionEvent::NodeStarted {
            node_id, node_type, ..
        } => {
            eprintln!("  ⚡ Starting node: {} ({})", node_id, node_type);
        }
        ExecutionEvent::NodeCompleted {
            node_id,
            duration_ms,
            ..
        } => {
            eprintln!("  ✅ Node {} completed in {}ms", node_id, duration_ms);
        }
        ExecutionEvent::NodeFailed { node_id, error, .. } => {
            eprintln!("  ❌ Node {} failed: {}", node_id, error);
        }
        ExecutionEvent::NodeEvent { node_id, event, .. } => {
            let icon = match event {
                NodeEvent::Info { .. } => "ℹ️",
                NodeEvent::Warning { .. } => "⚠️",
            };
            eprintln!("     {}  [{}] {}", icon, node_id, event.message());
        }
        ExecutionEvent::WorkflowCompleted {
            success,
            duration_ms,
            ..
        } => {
            if success {
                eprintln!("✨ Workflow completed successfully in {}ms", duration_ms);
            } else {
                eprintln!("💥 Workflow failed after {}ms", duration_ms);
            }
        }
    }
}

fn print_node_results(result: &WorkflowExecutionResult) {
    eprintln!();
    eprintln!("📤 Node results:");
    for node_id in &result.order {
        if let Some(value) = result.result_of(node_id) {
            eprintln!("   {}: {}", node_id, value);
        }
    }
    eprintln!();
}

/// `{success: true, data}` on success, `{success: false, error}` otherwise
fn envelope(outcome: &Result<WorkflowExecutionResult, FlowError>) -> Value {
    match outcome {
        Ok(result) => json!({ "success": true, "data": result.data }),
        Err(e) => error_envelope(&e.to_string()),
    }
}

fn error_envelope(message: &str) -> Value {
    json!({ "success": false, "error": message })
}

fn validate_workflow(file: &Path) -> Result<ExitCode> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = load_workflow(file)?;
    let order = WorkflowExecutor::execution_order(&workflow)?;

    let registry = wfnodes::default_registry();
    for node in &workflow.nodes {
        registry.get(node.node_type)?;
    }

    println!("✅ Workflow is valid:");
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Connections: {}", workflow.connections.len());
    println!("   Execution order: {}", order.join(" → "));

    Ok(ExitCode::SUCCESS)
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = wfnodes::default_registry();

    for node_type in registry.list_node_types() {
        if let Some(metadata) = registry.get_metadata(node_type) {
            println!("  • {} ({})", node_type, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", node_type);
        }
    }
}

/// Set → code → set: seed data, summarize it, then format a message
fn example_workflow() -> Workflow {
    let mut workflow = Workflow::new();

    workflow.add_node(NodeSpec::new("users", NodeType::Set).with_parameter(
        "values",
        json!({
            "users": [
                {"name": "Ada", "age": 36},
                {"name": "Alan", "age": 41}
            ]
        }),
    ));
    workflow.add_node(NodeSpec::new("summarize", NodeType::Code).with_parameter(
        "code",
        "const names = items[0].users.map(u => u.name);\nreturn { count: names.length, names: names.join(', ') };",
    ));
    workflow.add_node(NodeSpec::new("message", NodeType::Set).with_parameter(
        "values",
        json!({ "message": "={{ `Processed ${$json.count} users: ${$json.names}` }}" }),
    ));

    workflow.connect("users", "summarize");
    workflow.connect("summarize", "message");
    workflow
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&example_workflow())?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  wf run --file {}", output.display());

    Ok(())
}
