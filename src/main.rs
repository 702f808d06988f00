use discipline_tracker::{load_data, router, tick_channel, AppState, Config, Ticker};
use std::net::SocketAddr;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let data = load_data(&config.data_path).await;
    let (ticks, triggers) = tick_channel();
    let state = AppState::new(&config, data, ticks);
    let ticker = Ticker::spawn(state.clone(), triggers, config.tick_interval);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    ticker.shutdown().await;
    Ok(())
}

/// Resolves on SIGTERM or ctrl-c.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
                    _ = tokio::signal::ctrl_c() => info!("ctrl-c received, shutting down"),
                }
                return;
            }
            Err(err) => warn!("cannot listen for SIGTERM: {err}"),
        }
    }
    let _ = tokio::signal::ctrl_c().await;
    info!("ctrl-c received, shutting down");
}
