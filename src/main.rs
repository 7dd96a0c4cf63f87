use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goq_client::{
    create_router, AppState, CallSessionController, CallSnapshot, Config, ConsoleRecognizer,
    HttpCallBackend, Speaker, SpeechRecognizer, TurnId, WsConnector,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goq-client", version, about = "Voice conversation client")]
struct Cli {
    /// Config file path (extension optional)
    #[arg(short, long, default_value = "config/goq-client")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start a call and talk to it from the console (default)
    Run {
        /// Display name sent to the backend
        #[arg(long)]
        display_name: Option<String>,

        /// Only serve the control API; wait for POST /call/start
        #[arg(long)]
        no_autostart: bool,
    },
    /// Check backend health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Backend: {} (events: {})", cfg.backend.base_url, cfg.backend.ws_url);

    let backend = HttpCallBackend::new(&cfg.backend.base_url, cfg.request_timeout())
        .context("Failed to build backend client")?;

    match cli.command.unwrap_or(Command::Run {
        display_name: None,
        no_autostart: false,
    }) {
        Command::Health => health(&backend).await,
        Command::Run {
            display_name,
            no_autostart,
        } => run(cfg, backend, display_name, no_autostart).await,
    }
}

async fn health(backend: &HttpCallBackend) -> Result<()> {
    let health = backend
        .health()
        .await
        .context("Backend health check failed")?;

    info!(
        "Backend {}: {} active sessions, {} active connections",
        health.status, health.active_sessions, health.active_connections
    );
    Ok(())
}

async fn run(
    cfg: Config,
    backend: HttpCallBackend,
    display_name: Option<String>,
    no_autostart: bool,
) -> Result<()> {
    let recognizer: Option<Box<dyn SpeechRecognizer>> = if cfg.speech.enabled {
        Some(Box::new(ConsoleRecognizer::new(cfg.recognizer_config())))
    } else {
        None
    };

    let controller = CallSessionController::new(
        cfg.session_config(),
        Arc::new(backend),
        Arc::new(WsConnector::new(cfg.backend.ws_url.clone())),
        recognizer,
    );

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind control API on {}", addr))?;
    info!("Control API listening on http://{}", addr);

    let router = create_router(AppState::new(controller.clone()));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Control API stopped: {}", e);
        }
    });

    tokio::spawn(render(controller.subscribe()));

    if !no_autostart {
        let name = display_name.unwrap_or_else(|| cfg.call.display_name.clone());
        match controller.start_call(&name).await {
            Ok(_) => {
                info!("Each line you type is one utterance. Ctrl-C ends the call.");
                if let Err(e) = controller.toggle_capture().await {
                    warn!("Voice input disabled: {}", e);
                }
            }
            Err(e) => warn!("{}", e),
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    controller.end_call().await;

    Ok(())
}

/// Print new transcript turns and errors as snapshots arrive
async fn render(mut snapshots: watch::Receiver<CallSnapshot>) {
    let mut last_printed: Option<TurnId> = None;
    let mut last_error: Option<String> = None;

    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();

        for turn in &snapshot.transcript {
            if last_printed.is_some_and(|printed| turn.id <= printed) {
                continue;
            }
            let who = match turn.speaker {
                Speaker::User => "You",
                Speaker::Assistant => "Bot",
            };
            println!("[{}] {}: {}", turn.display_time(), who, turn.text);
            last_printed = Some(turn.id);
        }

        if snapshot.status.error != last_error {
            if let Some(e) = &snapshot.status.error {
                eprintln!("! {}", e);
            }
            last_error = snapshot.status.error.clone();
        }
    }
}
