//! Examiner CLI and interview server entry point.
//!
//! Binary name: `examiner`
//!
//! Parses CLI arguments, initializes tracing, database and services, then
//! dispatches to an admin command or starts the HTTP/WebSocket server.

mod cli;
mod http;
mod state;

use std::time::Duration;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, QuotaAction, TokenAction};
use examiner_observe::tracing_setup::{default_directive, init_tracing, shutdown_tracing};
use state::AppState;

/// How long live interviews get to settle after shutdown is requested.
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(
        cli.log_format,
        default_directive(cli.verbose, cli.quiet),
        cli.otel,
    )
    .map_err(|e| anyhow::anyhow!(e))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "examiner", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    let result = match cli.command {
        Commands::Serve { host, port } => serve(state, host, port, cli.quiet).await,

        Commands::Quota { action } => match action {
            QuotaAction::Show { user_id } => cli::quota::show_quota(&state, user_id, cli.json).await,
            QuotaAction::Set {
                user_id,
                seconds,
                username,
            } => cli::quota::set_quota(&state, user_id, seconds, username.as_deref(), cli.json).await,
        },

        Commands::Token { action } => match action {
            TokenAction::Issue { user_id } => cli::token::issue_token(&state, user_id, cli.json).await,
            TokenAction::Revoke { token } => cli::token::revoke_token(&state, &token, cli.json).await,
        },

        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}

async fn serve(
    state: AppState,
    host: Option<String>,
    port: Option<u16>,
    quiet: bool,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);

    state.start_gateway().await;

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, data_dir = %state.data_dir.display(), "Interview server listening");

    if !quiet {
        println!(
            "  {} Examiner listening on {}",
            console::style("⚡").bold(),
            console::style(format!("ws://{addr}/api/v1/ws/ai-interview")).cyan()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let router = http::router::build_router(state.clone());
    let shutdown = state.shutdown.clone();

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown requested, closing live interviews");
            shutdown.cancel();
        })
        .await?;

    // Upgraded sockets are detached from the server; wait for their
    // sessions to settle quota before exiting.
    drain_sessions(&state).await;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

async fn drain_sessions(state: &AppState) {
    state.shutdown.cancel();
    let deadline = tokio::time::Instant::now() + SESSION_DRAIN_TIMEOUT;
    while !state.sessions.is_empty() {
        if tokio::time::Instant::now() >= deadline {
            for entry in state.sessions.iter() {
                tracing::warn!(
                    session_id = %entry.key(),
                    user_id = entry.identity.user_id,
                    started_at = %entry.started_at,
                    "Interview session still open at exit"
                );
            }
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examiner_types::config::GlobalConfig;
    use examiner_types::identity::UserIdentity;
    use state::SessionEntry;

    #[tokio::test]
    async fn test_drain_returns_once_sessions_are_gone() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::with_config(dir.path(), GlobalConfig::default())
            .await
            .unwrap();
        let id = uuid::Uuid::new_v4();
        state.sessions.insert(
            id,
            SessionEntry {
                identity: UserIdentity::new(1, "ada"),
                started_at: chrono::Utc::now(),
            },
        );

        let sessions = state.sessions.clone();
        let token = state.shutdown.clone();
        tokio::spawn(async move {
            token.cancelled().await;
            sessions.remove(&id);
        });

        tokio::time::timeout(Duration::from_secs(5), drain_sessions(&state))
            .await
            .unwrap();
        assert!(state.shutdown.is_cancelled());
        assert!(state.sessions.is_empty());
    }
}
