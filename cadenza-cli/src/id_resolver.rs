//! ID resolver module
//!
//! Resolves job id prefixes to full UUIDs by listing jobs from the server,
//! so users can type a few characters instead of a whole UUID.

use anyhow::{Context, Result, anyhow};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::types::IdOrPrefix;

/// Resolve a job ID or prefix to a full UUID
///
/// If the input is already a full UUID, returns it without contacting the server.
///
/// # Errors
/// Returns an error if:
/// - No job matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_job_id(client: &ApiClient, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    let prefix = match id_or_prefix {
        IdOrPrefix::Full(uuid) => return Ok(*uuid),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let jobs = client
        .list_jobs(None)
        .await
        .context("Failed to fetch jobs for ID resolution")?;

    match_prefix(jobs.iter().map(|job| job.id), prefix)
}

/// Picks the single id starting with `prefix`
fn match_prefix(ids: impl IntoIterator<Item = Uuid>, prefix: &str) -> Result<Uuid> {
    if prefix.is_empty() {
        return Err(anyhow!("Job ID cannot be empty"));
    }

    let matches: Vec<Uuid> = ids
        .into_iter()
        .filter(|id| id.to_string().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found with ID starting with '{}'", prefix)),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let ids = [
            id("3fa85f64-5717-4562-b3fc-2c963f66afa6"),
            id("7c9e6679-7425-40de-944b-e07fc1f90ae7"),
        ];
        assert_eq!(match_prefix(ids, "3fa").unwrap(), ids[0]);
    }

    #[test]
    fn test_ambiguous_and_missing_prefixes_fail() {
        let ids = [
            id("3fa85f64-5717-4562-b3fc-2c963f66afa6"),
            id("3fa9aaaa-7425-40de-944b-e07fc1f90ae7"),
        ];

        let err = match_prefix(ids, "3fa").unwrap_err();
        assert!(err.to_string().starts_with("Ambiguous prefix"));

        let err = match_prefix(ids, "ffff").unwrap_err();
        assert!(err.to_string().starts_with("No job found"));

        assert!(match_prefix(ids, "").is_err());
    }
}
