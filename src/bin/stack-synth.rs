// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Synthesizer
//!
//! Reads deployment flags from the environment, synthesizes the
//! infrastructure and frontend stacks, and prints both templates as one
//! JSON document on stdout. Logs go to stderr.
//!
//! Run with: cargo run --bin stack-synth
//!
//! Environment:
//! - `STACK_CONTEXT_FILE` - optional `cdk.json`-style file with a `context` object
//! - `STACK_<KEY>` - per-flag overrides, e.g. `STACK_PERSISTENT_MODE=true`
//! - `STACK_DEPLOYMENT_ID` - suffix source for generated key names (random if unset)
//! - `RUST_LOG` - log filter

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;
use twin_stack::{synthesize, FrontendStack, StackConfig};
use uuid::Uuid;

/// Variable holding the deployment id
const DEPLOYMENT_ID_ENV: &str = "STACK_DEPLOYMENT_ID";

fn deployment_id() -> String {
    std::env::var(DEPLOYMENT_ID_ENV)
        .ok()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("🚀 Synthesizing stacks");

    let config = StackConfig::from_env().context("Failed to load stack flags")?;
    info!("📋 Flags loaded:");
    info!("  - Architecture: {}", config.architecture);
    info!("  - Exposed: {}", config.expose_publicly);
    info!("  - Persistent: {}", config.persistent_mode);
    info!("  - Fleet: {}", config.fleet_mode);

    let deployment_id = deployment_id();
    let infrastructure =
        synthesize(&config, &deployment_id).context("Failed to synthesize InfrastructureStack")?;
    info!(
        "✅ InfrastructureStack: {} ({} resources)",
        infrastructure.topology_kind(),
        infrastructure.graph.len()
    );

    let frontend = FrontendStack::synthesize().context("Failed to synthesize FrontendStack")?;
    info!("✅ FrontendStack: {} resources", frontend.graph.len());

    let document = json!({
        "InfrastructureStack": infrastructure.to_template(),
        "FrontendStack": frontend.to_template(),
    });
    let rendered = serde_json::to_string_pretty(&document).context("Failed to render templates")?;
    println!("{}", rendered);

    Ok(())
}
