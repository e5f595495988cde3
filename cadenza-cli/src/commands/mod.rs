//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod data;
mod job;
mod profile;

pub use data::DataCommands;
pub use job::JobCommands;
pub use profile::ProfileCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generation jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Local profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Stored data
    Data {
        #[command(subcommand)]
        command: DataCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Profile { command } => profile::handle_profile_command(command, config).await,
        Commands::Data { command } => data::handle_data_command(command, config).await,
    }
}
