use chrono::Utc;
use habit_chain::{load_data, logging, persist_data, router, AppState, Config};
use tokio::fs;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut data = load_data(&config.data_path).await?;
    let refreshed = data.refresh_streaks(Utc::now().date_naive());
    if refreshed > 0 {
        info!(refreshed, "refreshed stale streaks");
        persist_data(&config.data_path, &data).await?;
    }
    info!(habits = data.habits.len(), path = %config.data_path.display(), "loaded data");

    let app = router(AppState::new(config.data_path.clone(), data));

    let addr = config.socket_addr();
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
