//! Configuration view and validation commands: `voting-api config`.

use anyhow::Result;
use std::path::Path;

use voting_api::config::{DEFAULT_CONFIG_FILE, VotingConfig};

use super::super::ConfigCommands;

fn describe_source(config_path: Option<&Path>) -> String {
    match config_path {
        Some(path) => path.display().to_string(),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => DEFAULT_CONFIG_FILE.to_string(),
        None => "none (defaults)".to_string(),
    }
}

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    let config = VotingConfig::load(config_path)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!("# Config file: {}", describe_source(config_path));
            println!("# Effective values (file, then environment)");
            println!();
            print!("{}", config.to_toml()?);
        }
        Some(ConfigCommands::Validate) => {
            let problems = config.validate();
            if problems.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration problems:");
                for problem in &problems {
                    println!("  - {}", problem);
                }
                anyhow::bail!("{} configuration problem(s) found", problems.len());
            }
        }
    }

    Ok(())
}
