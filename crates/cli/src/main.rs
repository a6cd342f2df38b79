use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use sw_core::config::{load_config, ClientConfig};
use sw_core::snapshot::{HttpSnapshotLoader, InitialStateLoader};
use sw_core::state::AggregatedState;
use sw_core::WorkflowClient;
use sw_protocol::WorkflowStatus;
use tokio::sync::mpsc;

mod render;

use render::Printer;

/// Follow workflow progress in real time.
#[derive(Parser, Debug)]
#[command(name = "stagewatch", version, about)]
struct Cli {
    /// Directory containing `.stagewatch/config.toml`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe to a workflow and print every state change.
    Watch(WatchArgs),
    /// Fetch and print the server's current snapshot of a workflow.
    Snapshot(SnapshotArgs),
}

#[derive(Args, Debug)]
struct WatchArgs {
    workflow_id: String,

    /// Event stream base URL, e.g. ws://localhost:8000.
    #[arg(long)]
    ws_url: Option<String>,

    /// REST API base URL, e.g. http://localhost:8000.
    #[arg(long)]
    api_url: Option<String>,

    /// Stage whose completion completes the workflow.
    #[arg(long)]
    terminal_stage: Option<String>,

    #[arg(long)]
    reconnect_delay_ms: Option<u64>,

    #[arg(long)]
    ping_interval_ms: Option<u64>,

    /// Print the full state as JSON on every change.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    workflow_id: String,

    /// REST API base URL, e.g. http://localhost:8000.
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli.root)
        .await
        .wrap_err("failed to load .stagewatch/config.toml")?;

    match cli.command {
        Command::Watch(args) => watch(config, args).await,
        Command::Snapshot(args) => snapshot(config, args).await,
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

async fn watch(mut config: ClientConfig, args: WatchArgs) -> color_eyre::Result<ExitCode> {
    let settings = &mut config.settings;
    if let Some(url) = args.ws_url {
        settings.ws_base_url = url;
    }
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    if let Some(stage) = args.terminal_stage {
        settings.terminal_stage = Some(stage);
    }
    if let Some(ms) = args.reconnect_delay_ms {
        settings.reconnect_delay_ms = ms;
    }
    if let Some(ms) = args.ping_interval_ms {
        settings.ping_interval_ms = ms;
    }
    config.validate()?;

    let workflow_id = args.workflow_id;
    let (views_tx, mut views_rx) = mpsc::unbounded_channel();
    let view_id = workflow_id.clone();

    let mut client = WorkflowClient::from_config(config);
    client
        .on_change(Arc::new(move |state: &AggregatedState| {
            let _ = views_tx.send(state.to_view(&view_id));
        }))
        .await;
    client.subscribe(&workflow_id).await?;

    let mut printer = Printer::new(args.json);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let code = loop {
        tokio::select! {
            view = views_rx.recv() => {
                let Some(view) = view else {
                    break ExitCode::SUCCESS;
                };
                for line in printer.render(&view)? {
                    println!("{line}");
                }
                match view.workflow_status {
                    WorkflowStatus::Completed => break ExitCode::SUCCESS,
                    WorkflowStatus::Error => break ExitCode::FAILURE,
                    _ => {}
                }
            }
            _ = &mut ctrl_c => {
                tracing::debug!("interrupted");
                break ExitCode::SUCCESS;
            }
        }
    };

    client.unsubscribe().await;
    Ok(code)
}

async fn snapshot(mut config: ClientConfig, args: SnapshotArgs) -> color_eyre::Result<ExitCode> {
    if let Some(url) = args.api_url {
        config.settings.api_base_url = url;
    }
    config.validate()?;

    let loader = HttpSnapshotLoader::new(config.settings.api_base_url);
    let snapshot = loader.fetch(&args.workflow_id).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(ExitCode::SUCCESS)
}
