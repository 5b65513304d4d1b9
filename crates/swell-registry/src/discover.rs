use crate::component::{ComponentKind, ComponentMetadata, ComponentStats};
use regex::Regex;
use std::path::{Path, PathBuf};
use swell_core::{SwellError, SwellResult};
use tracing::{info, warn};

/// Fallback discoverer: lightweight static inspection over a directory
/// of Rust source units.
///
/// The explicit manifest is the primary registration path; the
/// discoverer exists for deployments that drop component units into a
/// directory at runtime. It extracts metadata only — discovered units
/// without a programmatically registered handler are visible in status
/// output but fail execution with the registry's standard not-found
/// envelope.
pub struct ComponentDiscoverer {
    dir: PathBuf,
    entry_point_re: Regex,
    latency_re: Regex,
}

impl ComponentDiscoverer {
    /// Creates a discoverer over the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> SwellResult<Self> {
        let entry_point_re =
            Regex::new(r"(?m)^\s*(?:pub\s+)?(?:async\s+)?fn\s+((?:handle|execute|run)\w*)")
                .map_err(|e| SwellError::Registry(format!("entry-point pattern: {e}")))?;
        let latency_re = Regex::new(r"latency[-_ ]target\s*[:=]\s*(\d+)\s*ms")
            .map_err(|e| SwellError::Registry(format!("latency pattern: {e}")))?;
        Ok(Self {
            dir: dir.into(),
            entry_point_re,
            latency_re,
        })
    }

    /// Scans the directory and extracts metadata from every `.rs` unit.
    ///
    /// `known_names` seeds dependency inference: a unit depends on every
    /// known component whose name appears in its text. Unreadable files
    /// are skipped with a warning, matching the loader tolerance of the
    /// rest of the pipeline.
    pub fn discover(&self, known_names: &[String]) -> SwellResult<Vec<ComponentMetadata>> {
        let mut discovered = Vec::new();
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            SwellError::Registry(format!(
                "cannot scan component directory {}: {e}",
                self.dir.display()
            ))
        })?;

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some("rs") {
                continue;
            }
            match self.inspect(&path, known_names) {
                Ok(Some(metadata)) => {
                    info!(component = %metadata.name, kind = %metadata.kind.to_string(), "Discovered component");
                    discovered.push(metadata);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to inspect unit, skipping");
                }
            }
        }

        discovered.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(discovered)
    }

    fn inspect(&self, path: &Path, known_names: &[String]) -> SwellResult<Option<ComponentMetadata>> {
        let name = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => return Ok(None),
        };
        let content = std::fs::read_to_string(path)?;

        let kind = infer_kind(&name, &content);
        let entry_point = self
            .entry_point_re
            .captures(&content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        let entry_point = match entry_point {
            Some(ep) => ep,
            // A unit with no recognizable entry point is not a component.
            None => return Ok(None),
        };

        let description = leading_doc(&content);
        let latency_target_ms = self
            .latency_re
            .captures(&content)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or_else(|| kind.default_latency_target_ms());

        let dependencies: Vec<String> = known_names
            .iter()
            .filter(|candidate| *candidate != &name && content.contains(candidate.as_str()))
            .cloned()
            .collect();

        Ok(Some(ComponentMetadata {
            name,
            kind,
            entry_point,
            description,
            latency_target_ms,
            dependencies,
            stats: ComponentStats::default(),
        }))
    }
}

/// Infers the component category from name and content keywords.
fn infer_kind(name: &str, content: &str) -> ComponentKind {
    let haystack = format!("{name}\n{content}");
    let lower = haystack.to_lowercase();
    if name.contains("monitor") || name.contains("metric") || lower.contains("health_score") {
        ComponentKind::Monitoring
    } else if name.contains("valid") || name.contains("quality") || name.contains("gate") {
        ComponentKind::Validation
    } else if name.contains("registry")
        || name.contains("pool")
        || name.contains("queue")
        || name.contains("cache")
    {
        ComponentKind::Infrastructure
    } else {
        ComponentKind::Feature
    }
}

/// Extracts a short description from leading `//!` or `///` doc lines.
fn leading_doc(content: &str) -> String {
    let mut lines = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(doc) = trimmed
            .strip_prefix("//!")
            .or_else(|| trimmed.strip_prefix("///"))
        {
            let doc = doc.trim();
            if doc.is_empty() && !lines.is_empty() {
                break; // first blank doc line ends the summary paragraph
            }
            if !doc.is_empty() {
                lines.push(doc);
            }
        } else if !lines.is_empty() || !trimmed.is_empty() {
            break;
        }
    }
    lines.join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_unit(dir: &Path, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_discover_extracts_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_unit(
            dir.path(),
            "wave_monitor.rs",
            "//! Tracks wave health and emits a health_score.\n\npub async fn handle_status() {}\n",
        );
        write_unit(
            dir.path(),
            "result_gate.rs",
            "//! Gates results on quality.\n// latency-target: 150ms\nfn execute_gate() {}\n// uses wave_monitor for timing\n",
        );

        let discoverer = ComponentDiscoverer::new(dir.path()).unwrap();
        let known = vec!["wave_monitor".to_string(), "result_gate".to_string()];
        let found = discoverer.discover(&known).unwrap();
        assert_eq!(found.len(), 2);

        let gate = &found[0];
        assert_eq!(gate.name, "result_gate");
        assert_eq!(gate.kind, ComponentKind::Validation);
        assert_eq!(gate.entry_point, "execute_gate");
        assert_eq!(gate.latency_target_ms, 150);
        assert_eq!(gate.dependencies, vec!["wave_monitor"]);

        let monitor = &found[1];
        assert_eq!(monitor.kind, ComponentKind::Monitoring);
        assert_eq!(monitor.entry_point, "handle_status");
        assert_eq!(monitor.latency_target_ms, 25); // kind default
        assert_eq!(monitor.description, "Tracks wave health and emits a health_score.");
    }

    #[test]
    fn test_units_without_entry_point_are_not_components() {
        let dir = tempfile::tempdir().unwrap();
        write_unit(dir.path(), "helpers.rs", "fn format_output() {}\n");
        write_unit(dir.path(), "notes.txt", "not rust at all");

        let discoverer = ComponentDiscoverer::new(dir.path()).unwrap();
        let found = discoverer.discover(&[]).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_directory_errors() {
        let discoverer = ComponentDiscoverer::new("/definitely/not/here").unwrap();
        assert!(discoverer.discover(&[]).is_err());
    }

    #[test]
    fn test_infer_kind_keywords() {
        assert_eq!(infer_kind("task_pool", ""), ComponentKind::Infrastructure);
        assert_eq!(infer_kind("quality_check", ""), ComponentKind::Validation);
        assert_eq!(infer_kind("doc_lookup", ""), ComponentKind::Feature);
    }

    #[test]
    fn test_leading_doc_stops_at_blank() {
        let content = "//! First line.\n//! Second line.\n//!\n//! Details omitted.\nfn run() {}";
        assert_eq!(leading_doc(content), "First line. Second line.");
    }
}
