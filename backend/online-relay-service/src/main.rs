/// Online Relay Service Main Entry Point
///
/// Starts:
/// - gRPC relay API (push, batch push, online status, kick) with gRPC health
/// - HTTP server exposing /health and /metrics
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use online_relay_service::{
    config::Config,
    grpc::{correlation_interceptor, OnlineRelayServer},
    logging,
    metrics,
    nova::online_relay::v1::online_message_relay_service_server::OnlineMessageRelayServiceServer,
    services::{ManagerAuthorizer, RelayService, SenderEchoFilter},
    ConnectionRegistry,
};
use std::sync::Arc;
use tokio::signal;
use tonic::transport::Server as GrpcServer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    logging::init_tracing(config.log_json);

    info!(app_env = %config.app_env, "Starting online relay service");

    // Connections are registered by the gateway transport sharing this registry
    let registry = ConnectionRegistry::new();
    let relay = RelayService::new(
        Arc::new(registry.clone()),
        Arc::new(SenderEchoFilter),
        Arc::new(ManagerAuthorizer::new(config.auth.manager_user_ids.clone())),
        config.relay.max_push_workers,
    );

    let grpc_addr = config.server.grpc_addr()?;
    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<OnlineMessageRelayServiceServer<OnlineRelayServer>>()
        .await;

    let grpc_service = OnlineMessageRelayServiceServer::with_interceptor(
        OnlineRelayServer::new(relay),
        correlation_interceptor,
    );

    info!("gRPC server listening on {}", grpc_addr);
    let grpc_server = tokio::spawn(async move {
        GrpcServer::builder()
            .add_service(health_service)
            .add_service(grpc_service)
            .serve_with_shutdown(grpc_addr, shutdown_signal())
            .await
            .context("gRPC server error")
    });

    let http_addr = config.server.http_addr();
    info!("HTTP server listening on {}", http_addr);
    let http_server = HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
    })
    .disable_signals()
    .bind(&http_addr)
    .with_context(|| format!("Failed to bind HTTP server on {}", http_addr))?
    .run();
    let http_handle = http_server.handle();

    tokio::select! {
        res = grpc_server => {
            res.context("gRPC task join error")??;
        }
        res = http_server => {
            if let Err(e) = res {
                error!("HTTP server error: {}", e);
            }
        }
    }

    http_handle.stop(true).await;
    info!("Online relay service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
