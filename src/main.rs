use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use kvprobe::app::{self, AppState};
use kvprobe::cache::RedisStore;
use kvprobe::config::{Config, EnvSnapshot, Identity};
use kvprobe::server::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    config.validate()?;

    info!(cpln_location = config.location.as_deref().unwrap_or("<unset>"), "CPLN_LOCATION");
    let identity = Identity::detect(config.location.as_deref());
    let env = EnvSnapshot::capture();
    debug!(environment = %env.to_json_pretty()?, "captured environment");

    let state = Arc::new(AppState::new(config, identity, env, RedisStore::new())?);
    let pipeline = Arc::new(app::pipeline(Arc::clone(&state)));

    let server = Server::bind(state.config.listen_addr()).await?;
    info!(
        version = state.identity.version,
        url = %format!("http://{}:{}", state.identity.hostname, server.local_addr().port()),
        "server running"
    );

    server
        .run_until(
            move |req| {
                let pipeline = Arc::clone(&pipeline);
                async move { pipeline.handle(req).await }
            },
            shutdown_signal(),
        )
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}
