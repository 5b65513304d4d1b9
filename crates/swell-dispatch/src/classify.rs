use std::collections::HashMap;
use swell_core::{Event, EventContext, EventKind};

// Hints that mark an event as inherently complex.
const COMPLEX_HINTS: [&str; 3] = ["analysis", "security", "performance"];
const ARG_BONUS: f64 = 0.05;
const ARG_BONUS_CAP: f64 = 0.2;
const COMPLEX_HINT_BONUS: f64 = 0.15;

/// Classifies tool-use events into kind, complexity, and domain hints.
pub struct EventClassifier {
    tool_weights: HashMap<&'static str, f64>,
}

impl EventClassifier {
    /// Creates a classifier with the built-in tool weight table.
    pub fn new() -> Self {
        let tool_weights = HashMap::from([
            ("Task", 0.8),
            ("Bash", 0.5),
            ("Edit", 0.4),
            ("Write", 0.4),
            ("WebSearch", 0.4),
            ("Grep", 0.3),
            ("Glob", 0.25),
            ("Read", 0.2),
        ]);
        Self { tool_weights }
    }

    /// Derives the immutable classified context for one event.
    ///
    /// Complexity is the per-tool base weight, an argument-count bonus,
    /// and a bonus per inherently complex hint, clamped to `[0, 1]`.
    pub fn classify(&self, event: &Event) -> EventContext {
        let kind = kind_of(&event.tool_name);
        let mut hints = self.hints_for(event);
        // A hint seen in several places still counts once.
        let mut seen = std::collections::HashSet::new();
        hints.retain(|h| seen.insert(h.clone()));

        let base = self
            .tool_weights
            .get(event.tool_name.as_str())
            .copied()
            .unwrap_or(0.3);
        let arg_bonus = (event.arguments.len() as f64 * ARG_BONUS).min(ARG_BONUS_CAP);
        let hint_bonus = hints
            .iter()
            .filter(|h| COMPLEX_HINTS.contains(&h.as_str()))
            .count() as f64
            * COMPLEX_HINT_BONUS;

        EventContext::new(kind, base + arg_bonus + hint_bonus, hints)
    }

    fn hints_for(&self, event: &Event) -> Vec<String> {
        let mut hints = Vec::new();
        let tool = event.tool_name.to_lowercase();
        add_keyword_hints(&mut hints, &tool);

        // Argument content: stringify values and scan for domain words.
        let args_text = event
            .arguments
            .values()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        add_keyword_hints(&mut hints, &args_text);

        if let Some(query) = &event.query {
            let query = query.to_lowercase();
            add_keyword_hints(&mut hints, &query);
            if query.contains("analyze")
                || query.contains("investigate")
                || query.contains("why")
            {
                hints.push("analysis".to_string());
            }
        }
        hints
    }
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_of(tool_name: &str) -> EventKind {
    let tool = tool_name.to_lowercase();
    if tool.contains("read") || tool.contains("write") || tool.contains("edit") {
        EventKind::FileOperation
    } else if tool.contains("grep") || tool.contains("glob") || tool.contains("search") {
        EventKind::Search
    } else if tool.contains("bash") || tool.contains("exec") || tool.contains("run") {
        EventKind::Execution
    } else if tool.contains("task") || tool.contains("agent") || tool.contains("analyze") {
        EventKind::Analysis
    } else if tool.contains("code") || tool.contains("generate") {
        EventKind::CodeGeneration
    } else {
        EventKind::General
    }
}

fn add_keyword_hints(hints: &mut Vec<String>, text: &str) {
    let table: [(&[&str], &str); 7] = [
        (&["read", "write", "edit", "file", "path"], "files"),
        (&["bash", "exec", "command", "shell"], "execution"),
        (&["grep", "glob", "search", "find"], "search"),
        (&["security", "auth", "password", "vulnerab"], "security"),
        (&["performance", "latency", "slow", "optimize"], "performance"),
        (&["test", "assert", "coverage"], "testing"),
        (&["doc", "readme", "comment"], "documentation"),
    ];
    for (keywords, hint) in table {
        if keywords.iter().any(|k| text.contains(k)) {
            hints.push(hint.to_string());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_event_is_simple() {
        let classifier = EventClassifier::new();
        let event = Event::new("Read").with_arg("file_path", serde_json::json!("/src/lib.rs"));
        let context = classifier.classify(&event);
        assert_eq!(context.kind, EventKind::FileOperation);
        assert!(context.complexity < 0.5, "complexity {}", context.complexity);
        assert!(context.has_hint("files"));
        assert!(!context.has_hint("analysis"));
    }

    #[test]
    fn test_security_argument_raises_complexity() {
        let classifier = EventClassifier::new();
        let plain = classifier.classify(&Event::new("Grep").with_arg("pattern", serde_json::json!("fn main")));
        let risky = classifier.classify(
            &Event::new("Grep").with_arg("pattern", serde_json::json!("password leak")),
        );
        assert!(risky.complexity > plain.complexity);
        assert!(risky.has_hint("security"));
    }

    #[test]
    fn test_query_keywords_add_analysis_hint() {
        let classifier = EventClassifier::new();
        let context = classifier.classify(
            &Event::new("Task").with_query("investigate why the pipeline stalls under load"),
        );
        assert!(context.has_hint("analysis"));
        assert_eq!(context.kind, EventKind::Analysis);
        assert!(context.complexity > 0.7);
    }

    #[test]
    fn test_complexity_clamped() {
        let classifier = EventClassifier::new();
        let mut event = Event::new("Task").with_query("analyze the security performance issue");
        for i in 0..10 {
            event = event.with_arg(format!("arg{i}"), serde_json::json!("value"));
        }
        let context = classifier.classify(&event);
        assert_eq!(context.complexity, 1.0);
    }

    #[test]
    fn test_unknown_tool_gets_default_weight() {
        let classifier = EventClassifier::new();
        let context = classifier.classify(&Event::new("Mystery"));
        assert_eq!(context.kind, EventKind::General);
        assert!((context.complexity - 0.3).abs() < 1e-9);
    }
}
