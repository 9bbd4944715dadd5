//! Deskpilot - voice-driven desktop command pipeline.
//!
//! Classifies free-text commands, decomposes them into capability plans and
//! executes them against the local desktop, exposed over HTTP and WebSocket.

use std::sync::Arc;

use deskpilot_controller::{PipelineBuilder, ScreenContextProvider};
use deskpilot_core::config::AppConfig;
use deskpilot_core::traits::CapabilityRegistry;
use deskpilot_gateway::{GatewayConfig, GatewayServer};
use deskpilot_skills::{register_builtin_modules, DefaultCapabilityRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    deskpilot_governance::configure_tracing(&config.logging)?;
    tracing::info!("Starting Deskpilot v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Capabilities
    // =========================================================================
    let registry = Arc::new(DefaultCapabilityRegistry::new());
    let _modules = register_builtin_modules(&registry, &config).await?;
    let registry: Arc<dyn CapabilityRegistry> = registry;

    // =========================================================================
    // Controller
    // =========================================================================
    let context_provider = Arc::new(ScreenContextProvider::new(registry.clone())?);
    let pipeline = PipelineBuilder::from_config(&config)?
        .with_registry(registry)
        .with_context_provider(context_provider)
        .build()?;

    tracing::info!(
        settle_delay_ms = config.executor.settle_delay_ms,
        success_policy = ?config.executor.success_policy,
        "Command pipeline initialized"
    );

    // =========================================================================
    // Gateway
    // =========================================================================
    let metrics_handle = deskpilot_governance::setup_metrics_recorder()?;
    let server = GatewayServer::new(GatewayConfig::from(&config.server), Arc::new(pipeline))
        .with_metrics(metrics_handle);

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Gateway initialized"
    );

    server.run().await?;
    Ok(())
}
