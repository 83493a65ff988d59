//! SAMEH STORE - storefront and admin service

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sameh_store::api::{build_app, AppState};
use sameh_store::config::AppConfig;
use sameh_store::seed::seed_if_empty;
use sameh_store::shop::Shop;
use sameh_store::store::{FileStore, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();

    let mut storage = match &config.store_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using file store");
            Storage::new(FileStore::open(path)?)
        }
        None => {
            tracing::warn!("STORE_PATH not set, data will not survive a restart");
            Storage::in_memory()
        }
    };
    if config.seed_sample_data {
        let seeded = seed_if_empty(&mut storage, &config.currency)?;
        if !seeded.is_empty() { tracing::info!(keys = ?seeded, "seeded sample data"); }
    }

    let app = build_app(AppState::new(Shop::new(storage, &config)));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, currency = %config.currency, "SAMEH STORE listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => { signal.recv().await; }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
