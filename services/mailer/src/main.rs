use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::serve;
use bulk_relay_mailer::{
    api::{create_router, ApiState},
    config::MailerConfig,
    mail::SmtpTransportFactory,
};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = MailerConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config);

    info!(
        relay = %config.smtp_relay,
        quota_cap = config.quota_cap,
        reset_interval_secs = config.quota_reset_interval_secs,
        policy = ?config.dispatch_policy,
        "bulk-relay-mailer starting"
    );

    let transports = Arc::new(SmtpTransportFactory::new(
        config.smtp_relay.clone(),
        config.smtp_timeout(),
    ));
    let addr: SocketAddr = config
        .listen_addr()
        .parse()
        .context("invalid server bind address")?;

    let state = Arc::new(ApiState::from_config(config, transports));
    let _reset_task = state.quota().start_reset_task(state.reset_interval());
    let router = create_router(Arc::clone(&state));

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    let local_addr = listener
        .local_addr()
        .context("failed to read bound address")?;
    info!(%local_addr, "bulk-relay-mailer listening");

    serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server encountered an unrecoverable error")?;

    info!("bulk-relay-mailer shutdown complete");
    Ok(())
}

fn init_tracing(config: &MailerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
