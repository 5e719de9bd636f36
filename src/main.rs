use anyhow::{Context, Result};
use profile_directory::{build_router, AppConfig, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Check if we should enable tokio-console
    if std::env::var("TOKIO_CONSOLE").is_ok() {
        console_subscriber::init();
        info!("tokio-console enabled on port 6669");
    } else {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,profile_directory=debug,tower_http=info")
        });
        fmt().with_env_filter(env_filter).with_target(true).init();
    }

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let state = AppState::from_config(&config).context("Failed to build HTTP client")?;
    let app = build_router(state, config.max_upload_bytes);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    println!("\nProfile directory starting");
    println!("HTTP: http://{}", config.bind_addr);
    println!("\nConfiguration:");
    println!("- Environment: {:?}", config.environment);
    println!("- Backend: {}", config.backend.name());
    println!(
        "- Admin auth: {}",
        if config.admin_secret.is_some() { "enabled" } else { "disabled" }
    );
    println!("- Max upload: {} bytes", config.max_upload_bytes);
    println!(
        "- Slug check: {}, {} insert attempts",
        config.intake.slug_check_policy, config.intake.slug_insert_attempts
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received, stopping server...");
}
