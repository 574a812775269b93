//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use blogd_core::constants::format_file_size;
use blogd_core::{AttachmentClass, Config};

/// Start the server with graceful shutdown
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let image_rules = config.rules_for(AttachmentClass::Image);
    let file_rules = config.rules_for(AttachmentClass::File);
    tracing::info!(
        max_image_size = %format_file_size(image_rules.max_size_bytes),
        max_file_size = %format_file_size(file_rules.max_size_bytes),
        image_extensions = %image_rules.allowed_extensions.join(","),
        file_extensions = %file_rules.allowed_extensions.join(","),
        delivery_mode = ?config.delivery_mode(),
        upload_root = %config.upload_root(),
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM signals to initiate graceful shutdown.
///
/// # Panics
/// - Panics if Ctrl+C signal handler cannot be installed (unrecoverable system error)
/// - On Unix systems, panics if SIGTERM signal handler cannot be installed (unrecoverable system error)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
