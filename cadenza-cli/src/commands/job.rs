//! Job command handlers
//!
//! Handles all job-related CLI commands: submission, listing, details,
//! deletion, refresh, downloads and watching a job until it finishes.

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::*;
use cadenza_core::domain::job::{GenerationMode, Job, JobStats, LifecycleState};
use cadenza_core::dto::job::SubmitParams;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::ApiClient;
use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::types::IdOrPrefix;

/// Generation mode as typed on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Free-text description; the provider writes lyrics and style
    Inspiration,
    /// Explicit lyrics, style tags and title
    Custom,
    /// Extend an existing clip from a given offset
    Continuation,
}

impl From<ModeArg> for GenerationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Inspiration => GenerationMode::Inspiration,
            ModeArg::Custom => GenerationMode::Custom,
            ModeArg::Continuation => GenerationMode::Continuation,
        }
    }
}

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Submit a new generation job
    Submit {
        /// Description (inspiration) or lyrics (custom, continuation)
        prompt: String,

        #[arg(short, long, value_enum, default_value = "inspiration")]
        mode: ModeArg,

        /// Comma-separated style tags
        #[arg(long)]
        tags: Option<String>,

        #[arg(long)]
        title: Option<String>,

        /// Requested duration in seconds
        #[arg(long)]
        duration: Option<u32>,

        /// Strip vocals from the request
        #[arg(short, long)]
        instrumental: bool,

        /// Provider task id of the clip to continue
        #[arg(long)]
        source_task: Option<String>,

        /// Provider clip id to continue
        #[arg(long)]
        source_clip: Option<String>,

        /// Offset in seconds to continue from
        #[arg(long)]
        continue_at: Option<f64>,

        /// Owner of the job (defaults to the profile)
        #[arg(long)]
        owner: Option<String>,

        /// Keep following the job until it finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// List jobs
    List {
        /// Only jobs of this owner
        #[arg(long)]
        owner: Option<String>,
    },
    /// Get job details
    Get {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Delete a job and stop polling it
    Delete {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Check the provider once for a job
    Refresh {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Resolve the WAV download link of a completed job
    Download {
        /// Job ID or unambiguous prefix
        id: String,

        /// Save the file here instead of printing the link
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Follow a job until it completes or fails
    Watch {
        /// Job ID or unambiguous prefix
        id: String,

        /// Seconds between checks
        #[arg(long, default_value_t = 3)]
        interval: u64,
    },
    /// Show per-state job counts
    Stats {
        /// Only jobs of this owner
        #[arg(long)]
        owner: Option<String>,
    },
}

/// Handle job commands
///
/// # Arguments
/// * `command` - The job command to execute
/// * `config` - The CLI configuration
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);

    match command {
        JobCommands::Submit {
            prompt,
            mode,
            tags,
            title,
            duration,
            instrumental,
            source_task,
            source_clip,
            continue_at,
            owner,
            watch,
        } => {
            let params = SubmitParams {
                style_tags: tags,
                title,
                requested_duration_seconds: duration,
                instrumental_only: instrumental,
                source_task_id: source_task,
                source_clip_id: source_clip,
                continue_at,
                owner_id: owner,
                ..SubmitParams::new(mode.into(), prompt)
            };
            submit_job(&client, params, watch).await
        }
        JobCommands::List { owner } => list_jobs(&client, owner.as_deref()).await,
        JobCommands::Get { id } => get_job(&client, &id).await,
        JobCommands::Delete { id } => delete_job(&client, &id).await,
        JobCommands::Refresh { id } => refresh_job(&client, &id).await,
        JobCommands::Download { id, output } => download_job(&client, &id, output).await,
        JobCommands::Watch { id, interval } => {
            let uuid = resolve_job_id(&client, &IdOrPrefix::parse(&id)).await?;
            watch_job(&client, uuid, Duration::from_secs(interval.max(1))).await
        }
        JobCommands::Stats { owner } => show_stats(&client, owner.as_deref()).await,
    }
}

/// Submit a job and optionally follow it
async fn submit_job(client: &ApiClient, params: SubmitParams, watch: bool) -> Result<()> {
    let id = client.submit_job(&params).await?;

    println!("{} Job submitted: {}", "✓".green(), id.to_string().cyan());

    if watch {
        println!();
        watch_job(client, id, Duration::from_secs(3)).await?;
    } else {
        println!(
            "  {}",
            format!("Follow it with: cadenza job watch {}", &id.to_string()[..8]).dimmed()
        );
    }

    Ok(())
}

/// List jobs, most recent first
async fn list_jobs(client: &ApiClient, owner: Option<&str>) -> Result<()> {
    let jobs = client.list_jobs(owner).await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Get and display a single job
async fn get_job(client: &ApiClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.get_job(uuid).await?;

    print_job_details(&job);

    Ok(())
}

async fn delete_job(client: &ApiClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    client.delete_job(uuid).await?;

    println!("{} Job {} deleted", "✓".green(), uuid.to_string().dimmed());
    Ok(())
}

async fn refresh_job(client: &ApiClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.refresh_job(uuid).await?;

    print_job_details(&job);
    Ok(())
}

/// Print the download link, or save the file when an output path is given
async fn download_job(client: &ApiClient, id: &str, output: Option<PathBuf>) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let link = client.download_link(uuid).await?;

    match output {
        Some(path) => {
            let bytes = client.fetch_bytes(&link.file_url).await?;
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Saved {} ({} bytes)",
                "✓".green(),
                path.display().to_string().cyan(),
                bytes.len()
            );
        }
        None => {
            println!("{}", "Download:".bold());
            println!("  Clip: {}", link.clip_id.dimmed());
            println!("  URL:  {}", link.file_url.cyan());
        }
    }

    Ok(())
}

/// Poll the server until the job reaches a terminal state
async fn watch_job(client: &ApiClient, id: uuid::Uuid, interval: Duration) -> Result<()> {
    let mut last: Option<(LifecycleState, u8)> = None;
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let job = client.get_job(id).await?;
        let current = (job.lifecycle_state, job.progress_percent);

        if last != Some(current) {
            println!(
                "{} {} {}",
                chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
                colorize_state(&job.lifecycle_state),
                progress_bar(job.progress_percent)
            );
            last = Some(current);
        }

        if job.lifecycle_state.is_terminal() {
            println!();
            print_job_details(&job);
            return Ok(());
        }
    }
}

async fn show_stats(client: &ApiClient, owner: Option<&str>) -> Result<()> {
    let stats = client.job_stats(owner).await?;
    print_stats(&stats);

    if let Ok(health) = client.poller_health().await {
        println!(
            "  {}",
            format!(
                "{} active polling loop(s), {} empty completion(s)",
                health.active_loops, health.empty_completions
            )
            .dimmed()
        );
    }

    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

/// Print a job summary line block
fn print_job_summary(job: &Job) {
    println!("  {} {}", "▸".cyan(), job.display_title().bold());
    println!("    ID:       {}", job.id.to_string().dimmed());
    println!(
        "    State:    {} {}",
        colorize_state(&job.lifecycle_state),
        progress_bar(job.progress_percent)
    );
    println!("    Mode:     {}", job.mode);
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.id.to_string().cyan());
    println!("  Title:       {}", job.display_title());
    println!("  Mode:        {}", job.mode);
    println!("  State:       {}", colorize_state(&job.lifecycle_state));
    println!("  Progress:    {}", progress_bar(job.progress_percent));
    println!("  Owner:       {}", job.owner_id.dimmed());
    if let Some(task_id) = &job.remote_task_id {
        println!("  Task ID:     {}", task_id.dimmed());
    }
    if let Some(tags) = &job.style_tags {
        println!("  Tags:        {}", tags);
    }
    if job.instrumental_only {
        println!("  Vocals:      {}", "instrumental only".yellow());
    }
    if let Some(source) = &job.continuation {
        println!(
            "  Continues:   clip {} of task {} at {}s",
            source.clip_id, source.task_id, source.continue_at
        );
    }
    println!(
        "  Created:     {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Updated:     {}",
        job.updated_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(result) = &job.result {
        println!("\n{}", "Result:".bold());
        println!("  Audio:    {}", result.audio_url.cyan());
        if let Some(cover) = &result.cover_url {
            println!("  Cover:    {}", cover);
        }
        if let Some(video) = &result.video_url {
            println!("  Video:    {}", video);
        }
        if let Some(duration) = result.duration_seconds {
            println!("  Duration: {}", format_duration(duration));
        }
        if let Some(clip_id) = &result.clip_id {
            println!("  Clip ID:  {}", clip_id.dimmed());
        }
    }

    if let Some(error) = &job.error_message {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

fn print_stats(stats: &JobStats) {
    println!("{}", "Job Statistics:".bold());
    println!("  Total:       {}", stats.total.to_string().bold());
    println!("  Submitting:  {}", stats.submitting.to_string().yellow());
    println!("  Processing:  {}", stats.processing.to_string().cyan());
    println!("  Completed:   {}", stats.completed.to_string().green());
    println!("  Failed:      {}", stats.failed.to_string().red());
}

/// Colorize lifecycle state for display
fn colorize_state(state: &LifecycleState) -> ColoredString {
    let label = format!("{:?}", state);
    match state {
        LifecycleState::Submitting => label.yellow(),
        LifecycleState::Processing => label.cyan(),
        LifecycleState::Completed => label.green(),
        LifecycleState::Failed => label.red(),
    }
}

fn progress_bar(percent: u8) -> String {
    const WIDTH: usize = 20;
    let percent = percent.min(100) as usize;
    let filled = percent * WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled),
        percent
    )
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
