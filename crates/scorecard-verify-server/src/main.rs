use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use scorecard_verify::{Verifier, VerifierConfig};
use scorecard_verify_server::{router, telemetry, LogFormat};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "scorecard-verify-server",
    version,
    about = "Verify Scorecard results against their Rekor signing certificate"
)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "SCORECARD_VERIFY_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Log output format
    #[arg(long, value_enum, env = "SCORECARD_VERIFY_LOG_FORMAT", default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init(args.log_format)?;

    let config = VerifierConfig::from_env();
    info!(
        rekor = %config.rekor_url,
        github = %config.github_api_url,
        workflow = %config.workflow_path(),
        authenticated = config.github_token.is_some(),
        "starting"
    );
    let verifier = Verifier::from_config(config).context("failed to build verifier")?;

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "listening");

    axum::serve(listener, router(Arc::new(verifier)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
