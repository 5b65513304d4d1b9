use crate::strategy::{CompressionContext, CompressionStrategy, ContentType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use swell_core::{SwellError, SwellResult};
use tracing::{debug, warn};

/// Optimizer configuration: the minimums that are logged (never
/// enforced) when missed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Compression should bring the ratio at or under this value.
    #[serde(default = "default_target_ratio")]
    pub target_ratio: f64,
    /// Estimated information preserved should stay at or above this.
    #[serde(default = "default_min_preservation")]
    pub min_preservation: f64,
}

fn default_target_ratio() -> f64 {
    0.95
}
fn default_min_preservation() -> f64 {
    0.75
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            target_ratio: default_target_ratio(),
            min_preservation: default_min_preservation(),
        }
    }
}

/// Outcome of one compression call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionResult {
    /// The compressed text.
    pub text: String,
    /// Input length in characters.
    pub original_len: usize,
    /// Output length in characters.
    pub compressed_len: usize,
    /// `compressed_len / original_len`, 1.0 for empty input.
    pub ratio: f64,
    /// Strategy that was applied.
    pub strategy: CompressionStrategy,
    /// Estimated fraction of information preserved, in `[0, 1]`.
    pub info_preserved: f64,
    /// Compression latency in milliseconds.
    pub duration_ms: f64,
}

// Phrase -> symbol substitutions, applied outside code content.
const SYMBOL_TABLE: [(&str, &str); 7] = [
    ("greater than or equal to", ">="),
    ("less than or equal to", "<="),
    ("results in", "->"),
    ("leads to", "->"),
    ("approximately", "~"),
    ("for example", "e.g."),
    ("that is", "i.e."),
];

// Multi-occurrence domain terms and their abbreviations.
const ABBREVIATIONS: [(&str, &str); 7] = [
    ("configuration", "config"),
    ("information", "info"),
    ("implementation", "impl"),
    ("documentation", "docs"),
    ("performance", "perf"),
    ("application", "app"),
    ("repository", "repo"),
];

// Removed only at the two most aggressive strategies.
const FILLER_PHRASES: [&str; 6] = [
    "it is important to note that ",
    "it should be noted that ",
    "please note that ",
    "as a matter of fact, ",
    "basically, ",
    "in order to ",
];

/// Applies the selected compression strategy to textual output.
pub struct TokenOptimizer {
    config: OptimizerConfig,
    blank_runs: Regex,
    space_runs: Regex,
    list_markers: Regex,
}

impl TokenOptimizer {
    /// Creates an optimizer with the given minimums.
    pub fn new(config: OptimizerConfig) -> SwellResult<Self> {
        Ok(Self {
            config,
            blank_runs: Regex::new(r"\n{3,}")
                .map_err(|e| SwellError::Compression(format!("blank-run pattern: {e}")))?,
            space_runs: Regex::new(r"([^\s])[ \t]{2,}")
                .map_err(|e| SwellError::Compression(format!("space-run pattern: {e}")))?,
            list_markers: Regex::new(r"(?m)^(\s*)[*+]\s")
                .map_err(|e| SwellError::Compression(format!("list-marker pattern: {e}")))?,
        })
    }

    /// Compresses `content` with the given strategy.
    ///
    /// At [`CompressionStrategy::Minimal`] this is an identity
    /// transform. Missed ratio or preservation minimums are logged,
    /// never turned into errors.
    pub fn apply_compression(
        &self,
        content: &str,
        strategy: CompressionStrategy,
        context: &CompressionContext,
    ) -> CompressionResult {
        let start = Instant::now();
        let original_len = content.len();

        if strategy == CompressionStrategy::Minimal {
            return CompressionResult {
                text: content.to_string(),
                original_len,
                compressed_len: original_len,
                ratio: 1.0,
                strategy,
                info_preserved: 1.0,
                duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            };
        }

        let mut text = content.to_string();

        // Symbol substitution, filtered by persona preference and
        // skipped entirely for code content.
        if strategy >= CompressionStrategy::Compressed && context.content_type != ContentType::Code
        {
            let preferred = context
                .persona
                .as_ref()
                .and_then(|p| p.preferred_symbols.as_ref());
            for (phrase, symbol) in SYMBOL_TABLE {
                let allowed = preferred
                    .map(|set| set.iter().any(|s| s == symbol))
                    .unwrap_or(true);
                if allowed {
                    text = text.replace(phrase, symbol);
                }
            }
        }

        // Abbreviate domain terms that occur more than once, skipping
        // persona-critical terms.
        if strategy >= CompressionStrategy::Compressed {
            let critical: Vec<&str> = context
                .persona
                .as_ref()
                .map(|p| p.critical_terms.iter().map(String::as_str).collect())
                .unwrap_or_default();
            for (term, abbreviation) in ABBREVIATIONS {
                if critical.contains(&term) {
                    continue;
                }
                if text.matches(term).count() >= 2 {
                    text = text.replace(term, abbreviation);
                }
            }
        }

        // Structural tightening applies to every non-minimal strategy.
        text = self.blank_runs.replace_all(&text, "\n\n").into_owned();
        text = self.space_runs.replace_all(&text, "$1 ").into_owned();
        text = self.list_markers.replace_all(&text, "$1- ").into_owned();
        let text = text
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");

        // Filler removal only at the two most aggressive strategies.
        let mut text = text;
        if strategy >= CompressionStrategy::Critical {
            for filler in FILLER_PHRASES {
                text = text.replace(filler, "");
                let capitalized = capitalize(filler);
                text = text.replace(&capitalized, "");
            }
        }

        let compressed_len = text.len();
        let ratio = if original_len == 0 {
            1.0
        } else {
            compressed_len as f64 / original_len as f64
        };
        let info_preserved = self.estimate_preservation(&text, ratio, context);
        let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;

        if ratio > self.config.target_ratio {
            debug!(
                ratio,
                target = self.config.target_ratio,
                "Compression ratio missed its target"
            );
        }
        if info_preserved < self.config.min_preservation {
            warn!(
                info_preserved,
                minimum = self.config.min_preservation,
                "Compression may have lost too much information"
            );
        }

        CompressionResult {
            text,
            original_len,
            compressed_len,
            ratio,
            strategy,
            info_preserved,
            duration_ms,
        }
    }

    /// Weighted blend of the character ratio and the surviving fraction
    /// of persona-critical terms.
    fn estimate_preservation(
        &self,
        text: &str,
        ratio: f64,
        context: &CompressionContext,
    ) -> f64 {
        let critical_terms = context
            .persona
            .as_ref()
            .map(|p| p.critical_terms.as_slice())
            .unwrap_or_default();
        let critical_fraction = if critical_terms.is_empty() {
            1.0
        } else {
            let surviving = critical_terms
                .iter()
                .filter(|term| text.contains(term.as_str()))
                .count();
            surviving as f64 / critical_terms.len() as f64
        };
        (0.6 * ratio.min(1.0) + 0.4 * critical_fraction).clamp(0.0, 1.0)
    }
}

fn capitalize(phrase: &str) -> String {
    let mut chars = phrase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
