//! Request body construction
//!
//! Turns a [`SubmitParams`] into the wire body for its mode and runs the
//! instrumental optimizer when requested. Validation happens here, before any
//! network call is made.

use cadenza_core::domain::job::GenerationMode;
use cadenza_core::dto::job::SubmitParams;
use cadenza_core::dto::provider::GenerationBody;
use cadenza_core::optimizer::InstrumentalOptimizer;

use crate::error::{ClientError, Result};

const DEFAULT_TAGS: &str = "pop";
const DEFAULT_TITLE: &str = "Untitled";

/// Builds provider request bodies for a fixed model version
#[derive(Debug, Clone)]
pub struct BodyBuilder {
    model_version: String,
    optimizer: InstrumentalOptimizer,
}

impl BodyBuilder {
    pub fn new(model_version: impl Into<String>) -> Self {
        Self {
            model_version: model_version.into(),
            optimizer: InstrumentalOptimizer::new(),
        }
    }

    /// Replaces the optimizer used for instrumental-only requests
    pub fn with_optimizer(mut self, optimizer: InstrumentalOptimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Validates the parameters and builds the wire body
    ///
    /// # Errors
    /// [`ClientError::Validation`] if the prompt is empty, or if a continuation
    /// request lacks its source task id, source clip id or offset.
    pub fn build(&self, params: &SubmitParams) -> Result<GenerationBody> {
        let prompt = params.prompt_text.trim();
        if prompt.is_empty() {
            return Err(ClientError::Validation(format!(
                "{} mode requires a prompt",
                params.mode
            )));
        }

        let body = match params.mode {
            GenerationMode::Inspiration => GenerationBody::Inspiration {
                gpt_description_prompt: prompt.to_string(),
                make_instrumental: false,
            },
            GenerationMode::Custom => GenerationBody::Custom {
                prompt: prompt.to_string(),
                tags: or_default(params.style_tags.as_deref(), DEFAULT_TAGS),
                title: or_default(params.title.as_deref(), DEFAULT_TITLE),
                mv: self.model_version.clone(),
                make_instrumental: false,
            },
            GenerationMode::Continuation => {
                let task_id = required(params.source_task_id.as_deref(), "source task id")?;
                let clip_id = required(params.source_clip_id.as_deref(), "source clip id")?;
                let continue_at = match params.continue_at {
                    Some(offset) if offset.is_finite() && offset >= 0.0 => offset,
                    Some(offset) => {
                        return Err(ClientError::Validation(format!(
                            "continue_at must be a non-negative number of seconds, got {}",
                            offset
                        )));
                    }
                    None => {
                        return Err(ClientError::Validation(
                            "continuation mode requires continue_at".to_string(),
                        ));
                    }
                };

                GenerationBody::Continue {
                    prompt: prompt.to_string(),
                    tags: or_default(params.style_tags.as_deref(), DEFAULT_TAGS),
                    title: or_default(params.title.as_deref(), DEFAULT_TITLE),
                    mv: self.model_version.clone(),
                    task_id,
                    continue_clip_id: clip_id,
                    continue_at,
                    make_instrumental: false,
                }
            }
        };

        Ok(self.optimizer.optimize(&body, params.instrumental_only))
    }
}

/// Builds a request body with the default optimizer
pub fn build_generation_body(params: &SubmitParams, model_version: &str) -> Result<GenerationBody> {
    BodyBuilder::new(model_version).build(params)
}

fn or_default(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn required(value: Option<&str>, what: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ClientError::Validation(format!(
            "continuation mode requires a {}",
            what
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::dto::provider::DEFAULT_MODEL_VERSION;

    fn continuation() -> SubmitParams {
        SubmitParams {
            source_task_id: Some("task-1".to_string()),
            source_clip_id: Some("clip-1".to_string()),
            continue_at: Some(80.0),
            ..SubmitParams::new(GenerationMode::Continuation, "keep going")
        }
    }

    #[test]
    fn test_inspiration_ignores_tags_and_title() {
        let params = SubmitParams {
            style_tags: Some("rock".to_string()),
            title: Some("Ignored".to_string()),
            ..SubmitParams::new(GenerationMode::Inspiration, "  rainy day lofi  ")
        };

        let body = build_generation_body(&params, DEFAULT_MODEL_VERSION).unwrap();
        assert_eq!(
            body,
            GenerationBody::Inspiration {
                gpt_description_prompt: "rainy day lofi".to_string(),
                make_instrumental: false,
            }
        );
    }

    #[test]
    fn test_custom_defaults() {
        let params = SubmitParams::new(GenerationMode::Custom, "[Verse]\nHello");
        let body = build_generation_body(&params, DEFAULT_MODEL_VERSION).unwrap();

        match body {
            GenerationBody::Custom { tags, title, mv, .. } => {
                assert_eq!(tags, "pop");
                assert_eq!(title, "Untitled");
                assert_eq!(mv, "chirp-v3-0");
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_continuation_carries_source() {
        let body = BodyBuilder::new("chirp-v3-5").build(&continuation()).unwrap();

        match body {
            GenerationBody::Continue {
                task_id,
                continue_clip_id,
                continue_at,
                mv,
                ..
            } => {
                assert_eq!(task_id, "task-1");
                assert_eq!(continue_clip_id, "clip-1");
                assert_eq!(continue_at, 80.0);
                assert_eq!(mv, "chirp-v3-5");
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_continuation_missing_task_id_fails_validation() {
        let params = SubmitParams {
            source_task_id: None,
            ..continuation()
        };
        let err = build_generation_body(&params, DEFAULT_MODEL_VERSION).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_continuation_missing_offset_fails_validation() {
        let params = SubmitParams {
            continue_at: None,
            ..continuation()
        };
        let err = build_generation_body(&params, DEFAULT_MODEL_VERSION).unwrap_err();
        assert!(err.is_validation());

        let params = SubmitParams {
            continue_at: Some(-1.0),
            ..continuation()
        };
        assert!(build_generation_body(&params, DEFAULT_MODEL_VERSION).is_err());
    }

    #[test]
    fn test_empty_prompt_fails_validation() {
        let params = SubmitParams::new(GenerationMode::Custom, "   ");
        let err = build_generation_body(&params, DEFAULT_MODEL_VERSION).unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: custom mode requires a prompt");
    }

    #[test]
    fn test_instrumental_runs_optimizer() {
        let params = SubmitParams {
            style_tags: Some("pop".to_string()),
            instrumental_only: true,
            ..SubmitParams::new(GenerationMode::Custom, "[Verse]\nHello")
        };

        let body = build_generation_body(&params, DEFAULT_MODEL_VERSION).unwrap();
        assert!(body.is_instrumental());
        assert_eq!(
            body.tags(),
            Some("pop, instrumental, no vocals, purely instrumental, music only")
        );
        assert!(body.free_text().starts_with("[instrumental] [instrumental section]"));
    }
}
