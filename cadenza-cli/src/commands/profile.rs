//! Profile command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use cadenza_core::domain::profile::UserProfile;
use cadenza_core::dto::profile::UpsertProfile;

use crate::api::ApiClient;
use crate::config::Config;

/// Profile subcommands
#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the local profile
    Show,
    /// Create or update the local profile
    Set {
        /// Display name (empty string clears it)
        #[arg(long)]
        name: Option<String>,

        /// Contact email (empty string clears it)
        #[arg(long)]
        email: Option<String>,
    },
}

pub async fn handle_profile_command(command: ProfileCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);

    match command {
        ProfileCommands::Show => match client.get_profile().await? {
            Some(profile) => print_profile(&profile),
            None => {
                println!("{}", "No profile yet.".yellow());
                println!(
                    "  {}",
                    "Create one with: cadenza profile set --name <NAME>".dimmed()
                );
            }
        },
        ProfileCommands::Set { name, email } => {
            if name.is_none() && email.is_none() {
                anyhow::bail!("Nothing to update: pass --name and/or --email");
            }

            let profile = client.update_profile(&UpsertProfile { name, email }).await?;
            println!("{} Profile saved", "✓".green());
            print_profile(&profile);
        }
    }

    Ok(())
}

fn print_profile(profile: &UserProfile) {
    println!("{}", "Profile:".bold());
    println!("  ID:      {}", profile.id.cyan());
    println!("  Name:    {}", profile.name.as_deref().unwrap_or("-"));
    println!("  Email:   {}", profile.email.as_deref().unwrap_or("-"));
    println!(
        "  Created: {}",
        profile.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}
