//! Server command: `voting-api serve`.

use anyhow::Result;
use std::path::Path;

use voting_api::config::{CliOverrides, VotingConfig};

pub async fn cmd_serve(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<()> {
    let mut config = VotingConfig::load(config_path)?;
    config.apply_cli(overrides);
    config.ensure_valid()?;

    // Held until the server returns so buffered file logs are flushed.
    let _guard = voting_api::telemetry::init(&config.logging)?;
    tracing::info!(
        backend = %config.store.backend,
        table = %config.store.table_name,
        "starting voting-api {}",
        env!("CARGO_PKG_VERSION")
    );

    voting_api::polls::server::start_server(config).await
}
