//! Fight Arena Server
//!
//! Resolves two-player keyboard fights on the server. The arena page opens a
//! WebSocket, picks two fighters, then streams raw `key_down`/`key_up`
//! codes from the shared keyboard. Each fight runs as its own task that
//! classifies presses, rolls hit and block power, gates the critical combo and
//! reports health bars and the winner back to the page. Fighter records come
//! from the external fighter API and are cached in memory.

mod app;
mod config;
mod game;
mod http;
mod store;
mod util;
mod ws;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::FighterSide;
use crate::http::build_router;
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level);
    init_server_time();

    log_arena_setup(&config);

    let listener = TcpListener::bind(config.server_addr).await?;
    let router = build_router(AppState::new(config.clone()));

    info!(addr = %config.server_addr, "Arena open: GET /fighters, GET /controls, WS /ws");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Arena closed");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Log where fighters come from and which keys each side plays with
fn log_arena_setup(config: &Config) {
    info!(
        fighter_api = %config.fighter_api_url,
        client_origin = %config.client_origin,
        repeat_limit = config.input_rate_limit,
        "Starting Fight Arena Server"
    );

    for side in [FighterSide::Left, FighterSide::Right] {
        let keys = config.controls.mapping(side);
        info!(
            %side,
            attack = %keys.attack,
            block = %keys.block,
            combo = %keys.critical_combo.join("+"),
            "Controls"
        );
    }
}

/// Resolves on Ctrl+C or SIGTERM. Open fights end when their sockets close.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, closing the arena"),
        _ = terminate => info!("SIGTERM received, closing the arena"),
    }
}
