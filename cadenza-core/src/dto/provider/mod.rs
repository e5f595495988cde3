//! Provider DTOs
//!
//! Canonical shapes exchanged with the generation provider. The request body is
//! serialized as-is; responses are normalized into these types by the client
//! before anything else sees them.

use serde::{Deserialize, Serialize};

/// Default model version tag sent with custom and continuation requests
pub const DEFAULT_MODEL_VERSION: &str = "chirp-v3-0";

/// Request body submitted to the provider, one shape per mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GenerationBody {
    Inspiration {
        gpt_description_prompt: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        make_instrumental: bool,
    },
    Custom {
        prompt: String,
        tags: String,
        title: String,
        mv: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        make_instrumental: bool,
    },
    #[serde(rename = "continue")]
    Continue {
        prompt: String,
        tags: String,
        title: String,
        mv: String,
        task_id: String,
        continue_clip_id: String,
        continue_at: f64,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        make_instrumental: bool,
    },
}

impl GenerationBody {
    /// The free-text field of the body (description or prompt)
    pub fn free_text(&self) -> &str {
        match self {
            GenerationBody::Inspiration {
                gpt_description_prompt,
                ..
            } => gpt_description_prompt,
            GenerationBody::Custom { prompt, .. } | GenerationBody::Continue { prompt, .. } => {
                prompt
            }
        }
    }

    pub fn free_text_mut(&mut self) -> &mut String {
        match self {
            GenerationBody::Inspiration {
                gpt_description_prompt,
                ..
            } => gpt_description_prompt,
            GenerationBody::Custom { prompt, .. } | GenerationBody::Continue { prompt, .. } => {
                prompt
            }
        }
    }

    /// Style tags; inspiration requests carry none
    pub fn tags(&self) -> Option<&str> {
        match self {
            GenerationBody::Inspiration { .. } => None,
            GenerationBody::Custom { tags, .. } | GenerationBody::Continue { tags, .. } => {
                Some(tags)
            }
        }
    }

    pub fn tags_mut(&mut self) -> Option<&mut String> {
        match self {
            GenerationBody::Inspiration { .. } => None,
            GenerationBody::Custom { tags, .. } | GenerationBody::Continue { tags, .. } => {
                Some(tags)
            }
        }
    }

    pub fn is_instrumental(&self) -> bool {
        match self {
            GenerationBody::Inspiration {
                make_instrumental, ..
            }
            | GenerationBody::Custom {
                make_instrumental, ..
            }
            | GenerationBody::Continue {
                make_instrumental, ..
            } => *make_instrumental,
        }
    }

    pub fn set_instrumental(&mut self, value: bool) {
        match self {
            GenerationBody::Inspiration {
                make_instrumental, ..
            }
            | GenerationBody::Custom {
                make_instrumental, ..
            }
            | GenerationBody::Continue {
                make_instrumental, ..
            } => *make_instrumental = value,
        }
    }
}

/// Provider status mapped onto a small vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

/// One generated clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipResult {
    pub clip_id: Option<String>,
    pub audio_url: Option<String>,
    pub cover_url: Option<String>,
    pub video_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub title: Option<String>,
}

/// Normalized answer to a status query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub status: ProviderStatus,
    pub progress_percent: u8,
    pub message: Option<String>,
    pub results: Vec<ClipResult>,
}

/// High-quality download link for a finished clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub clip_id: String,
    pub file_url: String,
}
