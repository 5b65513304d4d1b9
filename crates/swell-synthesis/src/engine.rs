use crate::insights::{extract_key_insights, Insight};
use crate::store::WaveContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use swell_core::{cache::hash_key, QualityTier, TtlCache};
use swell_results::CollectedResult;
use tracing::{debug, info};

/// Synthesis engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Maximum length of a wave summary in characters.
    #[serde(default = "default_max_summary_len")]
    pub max_summary_len: usize,
    /// Insight cap per agent.
    #[serde(default = "default_per_agent_cap")]
    pub per_agent_insight_cap: usize,
    /// Insight cap per wave.
    #[serde(default = "default_total_cap")]
    pub total_insight_cap: usize,
    /// Compound-intelligence cache TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub compound_cache_ttl_secs: u64,
}

fn default_max_summary_len() -> usize {
    2_000
}
fn default_per_agent_cap() -> usize {
    5
}
fn default_total_cap() -> usize {
    20
}
fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_summary_len: default_max_summary_len(),
            per_agent_insight_cap: default_per_agent_cap(),
            total_insight_cap: default_total_cap(),
            compound_cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// One wave's synthesized output. Superseded only by re-synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synthesis {
    /// Wave number.
    pub wave: u32,
    /// Agents that contributed results.
    pub agent_count: usize,
    /// Bounded-length natural-language summary.
    pub summary: String,
    /// Ranked key insights.
    pub key_insights: Vec<Insight>,
    /// Distinct participating agent types, sorted.
    pub agent_types: Vec<String>,
    /// Derived quality tier.
    pub tier: QualityTier,
    /// Confidence in `[0, 1]`, nudged around the tier baseline.
    pub confidence: f64,
    /// When synthesis completed.
    pub completed_at: DateTime<Utc>,
}

const COMPOUND_SEPARATOR: &str = "\n---\n";
const TRUNCATION_MARKER: &str = " [...]";

/// Builds wave syntheses and the cross-wave compound-intelligence string.
pub struct SynthesisEngine {
    config: SynthesisConfig,
    compound_cache: TtlCache<String>,
}

impl SynthesisEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: SynthesisConfig) -> Self {
        let ttl = Duration::from_secs(config.compound_cache_ttl_secs);
        Self {
            config,
            compound_cache: TtlCache::new(ttl),
        }
    }

    /// Extracts ranked insights from a wave's results using the
    /// configured caps.
    pub fn extract_key_insights(&self, results: &[&CollectedResult]) -> Vec<Insight> {
        extract_key_insights(
            results,
            self.config.per_agent_insight_cap,
            self.config.total_insight_cap,
        )
    }

    /// Synthesizes one wave from its validated results.
    ///
    /// The summary never exceeds the configured maximum length, even
    /// for pathologically large inputs.
    pub fn synthesize_wave(&self, wave: u32, results: &[&CollectedResult]) -> Synthesis {
        let insights = self.extract_key_insights(results);
        let mut agent_types: Vec<String> = results
            .iter()
            .map(|r| r.agent_type.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        agent_types.sort();

        // Group insight text by agent type for the summary body.
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for insight in &insights {
            grouped
                .entry(insight.agent_type.as_str())
                .or_default()
                .push(insight.text.as_str());
        }
        let mut summary = format!("Wave {wave} synthesis ({} agents): ", results.len());
        let body: Vec<String> = grouped
            .iter()
            .map(|(agent_type, texts)| format!("[{agent_type}] {}", texts.join("; ")))
            .collect();
        summary.push_str(&body.join(" | "));
        let summary = truncate_summary(&summary, self.config.max_summary_len);

        let average_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
        };
        let tier = QualityTier::from_score(average_score);

        // Confidence: tier baseline nudged up to +/-0.2 by agent count
        // and summary substance.
        let mut nudge: f64 = 0.0;
        if results.len() >= 3 {
            nudge += 0.1;
        } else if results.len() < 2 {
            nudge -= 0.1;
        }
        if summary.len() >= self.config.max_summary_len / 4 {
            nudge += 0.1;
        } else if insights.is_empty() {
            nudge -= 0.1;
        }
        let confidence = (tier_baseline(tier) + nudge.clamp(-0.2, 0.2)).clamp(0.0, 1.0);

        info!(
            wave,
            agents = results.len(),
            insights = insights.len(),
            tier = %tier,
            "Synthesized wave"
        );

        Synthesis {
            wave,
            agent_count: results.len(),
            summary,
            key_insights: insights,
            agent_types,
            tier,
            confidence,
            completed_at: Utc::now(),
        }
    }

    /// Builds the compound-intelligence string from the wave context.
    ///
    /// Summaries are concatenated oldest wave first; the oldest waves
    /// are dropped while the combined length exceeds twice the per-wave
    /// summary cap. Results are cached for the configured TTL keyed by
    /// a hash of the serialized context.
    pub fn build_compound_intelligence(&self, context: &WaveContext) -> String {
        let serialized = serde_json::to_string(context).unwrap_or_default();
        let key = hash_key(&["compound", &serialized]);
        if let Some(cached) = self.compound_cache.get(&key) {
            debug!("Compound intelligence served from cache");
            return cached;
        }

        let budget = self.config.max_summary_len * 2;
        let mut parts: Vec<String> = context
            .iter()
            .filter(|(_, record)| !record.summary.is_empty())
            .map(|(wave, record)| format!("Wave {wave}: {}", record.summary))
            .collect();
        let mut compound = parts.join(COMPOUND_SEPARATOR);
        while compound.len() > budget && parts.len() > 1 {
            parts.remove(0); // oldest wave goes first
            compound = parts.join(COMPOUND_SEPARATOR);
        }
        if compound.len() > budget {
            compound = truncate_summary(&compound, budget);
        }

        self.compound_cache.insert(key, compound.clone());
        compound
    }

    /// Wraps the compound string for injection into a target wave.
    ///
    /// Adds a fixed header, a guidance line keyed by the target wave,
    /// and extra clauses when the compound text mentions failures or
    /// performance concerns.
    pub fn enhance_for_injection(
        &self,
        compound: &str,
        target_wave: u32,
        task_context: &str,
    ) -> String {
        let guidance = match target_wave {
            0 | 1 => "Establish baselines; later waves will build on what you record here.",
            2 | 3 => "Build on the prior waves' findings instead of re-deriving them.",
            _ => "Converge: consolidate prior findings and close remaining gaps.",
        };
        let mut enhanced = format!(
            "## Accumulated wave intelligence\nTask: {task_context}\nGuidance (wave {target_wave}): {guidance}\n\n{compound}"
        );

        let lower = compound.to_lowercase();
        if lower.contains("error") || lower.contains("fail") {
            enhanced.push_str(
                "\n\nNote: earlier waves reported failures; verify their assumptions before reuse.",
            );
        }
        if lower.contains("slow") || lower.contains("latency") || lower.contains("performance") {
            enhanced.push_str(
                "\nNote: performance concerns were raised; prefer the lighter-weight options.",
            );
        }
        enhanced
    }
}

fn tier_baseline(tier: QualityTier) -> f64 {
    match tier {
        QualityTier::Excellent => 0.9,
        QualityTier::Good => 0.8,
        QualityTier::Acceptable => 0.7,
        QualityTier::NeedsImprovement => 0.55,
        QualityTier::Poor => 0.4,
    }
}

/// Truncates on a char boundary and appends the marker, staying within
/// `max_len` overall.
fn truncate_summary(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(TRUNCATION_MARKER.len());
    let mut cut = keep;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &text[..cut], TRUNCATION_MARKER)
}
