//! Data command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use std::io::Write;

use crate::api::ApiClient;
use crate::config::Config;

/// Data subcommands
#[derive(Subcommand)]
pub enum DataCommands {
    /// Delete every job and the profile
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn handle_data_command(command: DataCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);

    match command {
        DataCommands::Clear { yes } => {
            if !yes && !confirm("This deletes all jobs and the profile. Continue?")? {
                println!("{}", "Aborted.".yellow());
                return Ok(());
            }

            client.clear_data().await?;
            println!("{} All data cleared", "✓".green());
        }
    }

    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
