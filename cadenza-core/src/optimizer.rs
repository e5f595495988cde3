//! Instrumental request optimizer
//!
//! Rewrites a provider request so that the provider is more likely to return a
//! track without vocals. The transform is pure: no network, no storage.
//!
//! Applied steps, in order:
//! 1. Lyric-structure markers (`[Verse]`, `chorus`, ...) become a generic
//!    `[instrumental section]` marker
//! 2. Vocal vocabulary is removed from the free text
//! 3. The free text is wrapped with instrumental emphasis markers
//! 4. Instrumental tags are appended to the style tags when missing
//!
//! Tag appending is idempotent; wrapping is not, and stacks on every pass.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::dto::provider::GenerationBody;

/// Latin vocal keywords, as regex fragments matched on word boundaries
const VOCAL_KEYWORDS: &[&str] = &[
    "vocals?", "singer", "singing", "song", "lyrics?", "verse", "chorus", "voice", "sung",
    "sang", "chant", "chanting", "rap", "rapping",
];

/// CJK vocal keywords, matched anywhere (no word separators in the script)
const VOCAL_KEYWORDS_CJK: &[&str] = &[
    "女声", "男声", "歌手", "演唱", "唱歌", "人声", "歌唱", "声音", "歌词", "唱",
];

/// Tags appended to the style tags of instrumental requests
pub const INSTRUMENTAL_TAGS: &[&str] = &[
    "instrumental",
    "no vocals",
    "purely instrumental",
    "music only",
];

/// Replacement for lyric-structure markers
pub const INSTRUMENTAL_SECTION: &str = "[instrumental section]";

const LEADING_MARKER: &str = "[instrumental]";
const TRAILING_MARKERS: &str = "[no vocals] [purely instrumental music]";

static STRUCTURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\[\s*(?:lyrics?|verse|chorus|bridge|refrain|hook|歌词)(?:\s*\d+)?\s*\]|\b(?:lyrics?|verse|chorus|bridge|refrain|hook)\b|歌词",
    )
    .expect("structure pattern is valid")
});

static DEFAULT_VOCAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    build_vocal_pattern(&[]).expect("default vocal pattern is valid")
});

static EMPTY_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*\]").expect("bracket pattern is valid"));

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("whitespace pattern is valid"));

static SPACE_BEFORE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ([,.;!?])").expect("punctuation pattern is valid"));

/// Switches for the individual rewrite steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerOptions {
    pub remove_vocal_keywords: bool,
    pub add_instrumental_tags: bool,
    pub convert_lyric_structure: bool,
    pub strengthen_prompt: bool,
    /// Additional vocal words to strip, taken literally
    pub extra_vocal_keywords: Vec<String>,
    /// Additional tags to append after the defaults
    pub extra_instrumental_tags: Vec<String>,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            remove_vocal_keywords: true,
            add_instrumental_tags: true,
            convert_lyric_structure: true,
            strengthen_prompt: true,
            extra_vocal_keywords: Vec::new(),
            extra_instrumental_tags: Vec::new(),
        }
    }
}

/// What an optimization pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub is_optimized: bool,
    pub changes: Vec<String>,
    pub warnings: Vec<String>,
}

/// Pre-submit rewrite for instrumental-only requests
#[derive(Debug, Clone)]
pub struct InstrumentalOptimizer {
    options: OptimizerOptions,
    vocal_pattern: Regex,
}

impl InstrumentalOptimizer {
    /// Optimizer with every step enabled and the built-in keyword lists
    pub fn new() -> Self {
        Self {
            options: OptimizerOptions::default(),
            vocal_pattern: DEFAULT_VOCAL_PATTERN.clone(),
        }
    }

    /// Optimizer with custom options
    ///
    /// # Errors
    /// Fails only if the combined keyword pattern exceeds the regex size limit.
    pub fn with_options(options: OptimizerOptions) -> Result<Self, regex::Error> {
        let vocal_pattern = if options.extra_vocal_keywords.is_empty() {
            DEFAULT_VOCAL_PATTERN.clone()
        } else {
            build_vocal_pattern(&options.extra_vocal_keywords)?
        };

        Ok(Self {
            options,
            vocal_pattern,
        })
    }

    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    /// Returns the optimized body, or an unchanged copy if `instrumental_only` is false
    pub fn optimize(&self, body: &GenerationBody, instrumental_only: bool) -> GenerationBody {
        let mut optimized = body.clone();
        if !instrumental_only {
            return optimized;
        }

        let text = self.rewrite_text(optimized.free_text());
        *optimized.free_text_mut() = text;

        if self.options.add_instrumental_tags {
            if let Some(tags) = optimized.tags_mut() {
                *tags = self.append_tags(tags);
            }
        }

        optimized.set_instrumental(true);
        optimized
    }

    /// Compares a body before and after optimization
    pub fn review(
        &self,
        original: &GenerationBody,
        optimized: &GenerationBody,
    ) -> OptimizationReport {
        let mut report = OptimizationReport::default();

        if !optimized.is_instrumental() {
            report
                .warnings
                .push("instrumental flag is off, request was not optimized".to_string());
            return report;
        }

        if original.free_text() != optimized.free_text() {
            report.changes.push("prompt rewritten".to_string());
        }

        if original.tags() != optimized.tags() {
            report.changes.push("tags extended".to_string());
        }

        report.is_optimized = !report.changes.is_empty();

        let tagged = optimized
            .tags()
            .is_some_and(|tags| tags.to_lowercase().contains("instrumental"));
        let marked = optimized.free_text().contains(LEADING_MARKER);
        if !tagged && !marked {
            report
                .warnings
                .push("no instrumental marker found, optimization may be incomplete".to_string());
        }

        report
    }

    fn rewrite_text(&self, text: &str) -> String {
        let mut text = text.to_string();

        if self.options.convert_lyric_structure {
            text = STRUCTURE_PATTERN
                .replace_all(&text, INSTRUMENTAL_SECTION)
                .into_owned();
        }

        if self.options.remove_vocal_keywords {
            text = self
                .vocal_pattern
                .replace_all(&text, |caps: &Captures| {
                    if caps[0].starts_with('[') {
                        caps[0].to_string()
                    } else {
                        String::new()
                    }
                })
                .into_owned();
            text = EMPTY_BRACKETS.replace_all(&text, "").into_owned();
            text = tidy_whitespace(&text);
        }

        if self.options.strengthen_prompt {
            text = format!("{LEADING_MARKER} {text} {TRAILING_MARKERS}");
        }

        text
    }

    fn append_tags(&self, tags: &str) -> String {
        let mut present: Vec<String> = tags
            .split(',')
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();

        let mut result = tags.trim().to_string();
        let candidates = INSTRUMENTAL_TAGS
            .iter()
            .map(|tag| tag.to_string())
            .chain(self.options.extra_instrumental_tags.iter().cloned());

        for tag in candidates {
            let key = tag.trim().to_lowercase();
            if key.is_empty() || present.contains(&key) {
                continue;
            }
            if result.is_empty() {
                result = tag.trim().to_string();
            } else {
                result = format!("{}, {}", result, tag.trim());
            }
            present.push(key);
        }

        result
    }
}

impl Default for InstrumentalOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Optimizes with the default settings
pub fn optimize_for_instrumental(body: &GenerationBody) -> GenerationBody {
    InstrumentalOptimizer::new().optimize(body, true)
}

fn build_vocal_pattern(extra: &[String]) -> Result<Regex, regex::Error> {
    let mut words: Vec<String> = VOCAL_KEYWORDS.iter().map(|k| k.to_string()).collect();
    let mut anywhere: Vec<String> = VOCAL_KEYWORDS_CJK.iter().map(|k| k.to_string()).collect();

    for keyword in extra.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
        if keyword.is_ascii() {
            words.push(regex::escape(keyword));
        } else {
            anywhere.push(regex::escape(keyword));
        }
    }

    // Markers written by earlier passes match first and are kept as-is
    Regex::new(&format!(
        r"(?i)\[(?:instrumental(?: section)?|no vocals|purely instrumental music)\]|\b(?:{})\b|{}",
        words.join("|"),
        anywhere.join("|")
    ))
}

fn tidy_whitespace(text: &str) -> String {
    let collapsed = HORIZONTAL_SPACE.replace_all(text, " ");
    let collapsed = SPACE_BEFORE_PUNCTUATION.replace_all(&collapsed, "$1");
    collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::provider::DEFAULT_MODEL_VERSION;

    fn custom(prompt: &str, tags: &str) -> GenerationBody {
        GenerationBody::Custom {
            prompt: prompt.to_string(),
            tags: tags.to_string(),
            title: "Untitled".to_string(),
            mv: DEFAULT_MODEL_VERSION.to_string(),
            make_instrumental: false,
        }
    }

    fn inspiration(description: &str) -> GenerationBody {
        GenerationBody::Inspiration {
            gpt_description_prompt: description.to_string(),
            make_instrumental: false,
        }
    }

    #[test]
    fn test_custom_verse_example() {
        let optimized = InstrumentalOptimizer::new().optimize(&custom("[Verse]\nHello", "pop"), true);

        assert_eq!(
            optimized.tags(),
            Some("pop, instrumental, no vocals, purely instrumental, music only")
        );
        assert_eq!(
            optimized.free_text(),
            "[instrumental] [instrumental section]\nHello [no vocals] [purely instrumental music]"
        );
        assert!(optimized.is_instrumental());
    }

    #[test]
    fn test_flag_off_is_identity() {
        let body = custom("[Chorus]\nsing along", "rock");
        let optimized = InstrumentalOptimizer::new().optimize(&body, false);
        assert_eq!(optimized, body);
    }

    #[test]
    fn test_tags_idempotent_but_wrapping_stacks() {
        let optimizer = InstrumentalOptimizer::new();
        let once = optimizer.optimize(&custom("Hello", "pop"), true);
        let twice = optimizer.optimize(&once, true);

        assert_eq!(once.tags(), twice.tags());
        assert_eq!(twice.free_text().matches("[instrumental]").count(), 2);
        assert_eq!(twice.free_text().matches("[no vocals]").count(), 2);
    }

    #[test]
    fn test_existing_tags_not_duplicated_case_insensitive() {
        let optimized =
            InstrumentalOptimizer::new().optimize(&custom("Hello", "jazz, Instrumental"), true);
        assert_eq!(
            optimized.tags(),
            Some("jazz, Instrumental, no vocals, purely instrumental, music only")
        );
    }

    #[test]
    fn test_vocal_keywords_removed_from_description() {
        let optimized = InstrumentalOptimizer::new().optimize(
            &inspiration("Dreamy synth pop with a female Singer and soft vocals"),
            true,
        );

        assert_eq!(
            optimized.free_text(),
            "[instrumental] Dreamy synth pop with a female and soft [no vocals] [purely instrumental music]"
        );
        assert_eq!(optimized.tags(), None);
    }

    #[test]
    fn test_cjk_vocal_keywords_removed() {
        let options = OptimizerOptions {
            strengthen_prompt: false,
            ..Default::default()
        };
        let optimizer = InstrumentalOptimizer::with_options(options).unwrap();
        let optimized = optimizer.optimize(&inspiration("欢快的磁性女声歌曲，中文"), true);

        assert_eq!(optimized.free_text(), "欢快的磁性歌曲，中文");
    }

    #[test]
    fn test_numbered_structure_markers() {
        let options = OptimizerOptions {
            strengthen_prompt: false,
            ..Default::default()
        };
        let optimizer = InstrumentalOptimizer::with_options(options).unwrap();
        let optimized = optimizer.optimize(&custom("[Chorus 2]\nla la\n[Bridge]", "pop"), true);

        assert_eq!(
            optimized.free_text(),
            "[instrumental section]\nla la\n[instrumental section]"
        );
    }

    #[test]
    fn test_extra_keywords_and_tags() {
        let options = OptimizerOptions {
            strengthen_prompt: false,
            extra_vocal_keywords: vec!["whisper".to_string()],
            extra_instrumental_tags: vec!["ambient".to_string()],
            ..Default::default()
        };
        let optimizer = InstrumentalOptimizer::with_options(options).unwrap();
        let optimized = optimizer.optimize(&custom("soft whisper pads", "lofi"), true);

        assert_eq!(optimized.free_text(), "soft pads");
        assert!(optimized.tags().unwrap().ends_with("music only, ambient"));
    }

    #[test]
    fn test_review_reports_changes_and_warnings() {
        let optimizer = InstrumentalOptimizer::new();
        let original = custom("Hello", "pop");
        let optimized = optimizer.optimize(&original, true);

        let report = optimizer.review(&original, &optimized);
        assert!(report.is_optimized);
        assert_eq!(report.changes.len(), 2);
        assert!(report.warnings.is_empty());

        let untouched = optimizer.review(&original, &original);
        assert!(!untouched.is_optimized);
        assert_eq!(untouched.warnings.len(), 1);
    }

    #[test]
    fn test_continue_mode_keeps_source_fields() {
        let body = GenerationBody::Continue {
            prompt: "outro".to_string(),
            tags: String::new(),
            title: "Untitled".to_string(),
            mv: DEFAULT_MODEL_VERSION.to_string(),
            task_id: "task-1".to_string(),
            continue_clip_id: "clip-1".to_string(),
            continue_at: 42.0,
            make_instrumental: false,
        };

        match optimize_for_instrumental(&body) {
            GenerationBody::Continue {
                tags,
                task_id,
                continue_at,
                ..
            } => {
                assert_eq!(tags, "instrumental, no vocals, purely instrumental, music only");
                assert_eq!(task_id, "task-1");
                assert_eq!(continue_at, 42.0);
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }
}
