//! User profile domain types

use serde::{Deserialize, Serialize};

/// Owner used for jobs when no profile has been created
pub const DEFAULT_OWNER_ID: &str = "local";

/// Local user profile
///
/// There is at most one profile per store; its id becomes the owner of new jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
