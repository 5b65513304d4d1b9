use serde::{Deserialize, Serialize};

/// The five ordered compression strategies, least to most aggressive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionStrategy {
    /// No compression at all; an identity transform.
    Minimal,
    /// Light structural tightening.
    Efficient,
    /// Symbol substitution and abbreviation on top.
    Compressed,
    /// Adds filler-phrase removal.
    Critical,
    /// Everything, applied without restraint.
    Emergency,
}

impl CompressionStrategy {
    const LADDER: [CompressionStrategy; 5] = [
        CompressionStrategy::Minimal,
        CompressionStrategy::Efficient,
        CompressionStrategy::Compressed,
        CompressionStrategy::Critical,
        CompressionStrategy::Emergency,
    ];

    /// Position on the ladder, 0 = minimal.
    pub fn index(self) -> i32 {
        Self::LADDER.iter().position(|s| *s == self).unwrap_or(0) as i32
    }

    /// Ladder entry at the clamped index.
    pub fn from_index(index: i32) -> Self {
        let clamped = index.clamp(0, Self::LADDER.len() as i32 - 1) as usize;
        Self::LADDER[clamped]
    }

    /// Baseline strategy from token-budget utilization percentage.
    pub fn from_usage(usage_pct: f64) -> Self {
        if usage_pct < 60.0 {
            CompressionStrategy::Minimal
        } else if usage_pct < 75.0 {
            CompressionStrategy::Efficient
        } else if usage_pct < 85.0 {
            CompressionStrategy::Compressed
        } else if usage_pct < 95.0 {
            CompressionStrategy::Critical
        } else {
            CompressionStrategy::Emergency
        }
    }
}

/// How much compression a persona is configured to tolerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionTolerance {
    /// Dense output is hard on this persona; stay conservative.
    Low,
    /// No adjustment.
    #[default]
    Medium,
    /// Dense output is fine; go one step further.
    High,
}

/// Broad shape of the content being compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Source code; symbol substitution is skipped to avoid mangling it.
    Code,
    /// Natural-language prose.
    #[default]
    Prose,
    /// Structured data dumps.
    Data,
    /// A mix of the above.
    Mixed,
}

/// Task complexity as judged by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskComplexity {
    /// Routine work.
    Low,
    /// No adjustment.
    #[default]
    Medium,
    /// Dense output risks losing the thread; stay conservative.
    High,
}

/// The user's familiarity with the domain at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Familiarity {
    /// Unfamiliar users need the long form.
    Low,
    /// No adjustment.
    #[default]
    Medium,
    /// Familiar users can take abbreviations.
    High,
}

/// Persona configuration consulted during strategy selection and
/// compression.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// Persona name.
    pub name: String,
    /// Compression tolerance.
    #[serde(default)]
    pub tolerance: CompressionTolerance,
    /// When set, only these substitution symbols are applied.
    pub preferred_symbols: Option<Vec<String>>,
    /// Terms that must survive compression untouched.
    #[serde(default)]
    pub critical_terms: Vec<String>,
}

/// Situational inputs to strategy selection; transient per call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressionContext {
    /// Token-budget utilization percentage, 0..100.
    pub usage_pct: f64,
    /// Task complexity.
    #[serde(default)]
    pub complexity: TaskComplexity,
    /// Active persona, when one is configured.
    pub persona: Option<PersonaProfile>,
    /// Shape of the content.
    #[serde(default)]
    pub content_type: ContentType,
    /// The user's domain familiarity.
    #[serde(default)]
    pub familiarity: Familiarity,
    /// External services active for the surrounding call.
    #[serde(default)]
    pub active_services: Vec<String>,
    /// Wave stage the output belongs to, when known.
    pub wave_stage: Option<u32>,
}

/// Selects the strategy for a context.
///
/// Starts from the usage-percentage baseline and shifts one step per
/// adjustment: persona tolerance (low = conservative, high =
/// aggressive), high task complexity (conservative), low familiarity
/// (conservative). Adjustments compose by ladder index and clamp to the
/// valid range, so the result never leaves the ladder.
pub fn determine_strategy(context: &CompressionContext) -> CompressionStrategy {
    let mut index = CompressionStrategy::from_usage(context.usage_pct).index();
    if let Some(persona) = &context.persona {
        match persona.tolerance {
            CompressionTolerance::Low => index -= 1,
            CompressionTolerance::Medium => {}
            CompressionTolerance::High => index += 1,
        }
    }
    if context.complexity == TaskComplexity::High {
        index -= 1;
    }
    if context.familiarity == Familiarity::Low {
        index -= 1;
    }
    CompressionStrategy::from_index(index)
}
