//! Profile DTOs

use serde::{Deserialize, Serialize};

/// Request to create or update the local profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertProfile {
    pub name: Option<String>,
    pub email: Option<String>,
}
