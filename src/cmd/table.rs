//! Table management command: `voting-api create-table`.

use anyhow::{Context, Result};
use std::path::Path;

use voting_api::config::{CliOverrides, StoreBackend, VotingConfig};
use voting_api::errors::PollError;
use voting_api::polls::dynamo::DynamoPollStore;

pub async fn cmd_create_table(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<()> {
    let mut config = VotingConfig::load(config_path)?;
    config.apply_cli(overrides);
    config.ensure_valid()?;

    if config.store.backend != StoreBackend::Dynamo {
        anyhow::bail!(
            "create-table requires the dynamo backend (configured: {})",
            config.store.backend
        );
    }

    let _guard = voting_api::telemetry::init(&config.logging)?;

    let store = DynamoPollStore::connect(
        config.store.table_name.clone(),
        config.store.region.clone(),
        config.store.endpoint_url.clone(),
    )
    .await;

    match store.ensure_table().await {
        Ok(()) => {
            println!("Created table '{}'.", store.table());
            Ok(())
        }
        Err(PollError::Conflict { .. }) => {
            println!("Table '{}' already exists.", store.table());
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to create table '{}'", store.table())),
    }
}
