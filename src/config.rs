//! Repair configuration
//!
//! The heuristics hardcode nothing that an operator might want to extend:
//! the text-constructor whitelist, the drawable substitution table, the
//! pacing limits and the retry/render policy all live here and can be
//! overridden from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// One unsupported drawable type and the supported primitive it becomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

/// Caps applied by the downgrade rewriter to keep renders short and smooth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingLimits {
    /// Waits shorter than this are considered degenerate
    pub min_wait_secs: f64,
    /// What a degenerate wait is rewritten to
    pub padded_wait_secs: f64,
    /// Ceiling for any explicit run_time parameter
    pub max_run_time_secs: f64,
    /// run_time injected into a play call that has none
    pub default_run_time_secs: f64,
}

impl Default for PacingLimits {
    fn default() -> Self {
        Self {
            min_wait_secs: 1.0,
            padded_wait_secs: 2.0,
            max_run_time_secs: 5.0,
            default_run_time_secs: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Call names that legitimise a line consisting of a string literal
    pub text_constructors: Vec<String>,
    /// Unsupported drawable types rewritten to supported primitives
    pub substitutions: Vec<Substitution>,
    pub pacing: PacingLimits,
    /// Ceiling for the compilation-gated fallback loop
    pub max_repair_attempts: usize,
    /// Render the last candidate even when repair attempts are exhausted.
    /// Partial output beats none; disable to surface the parse failure
    /// instead.
    pub render_imperfect: bool,
    /// Wall-clock ceiling for one renderer invocation
    pub render_timeout_secs: u64,
    /// Outer ceiling for the whole session; must exceed the renderer's so a
    /// renderer timeout is observed and reported rather than killing us
    pub session_timeout_secs: u64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            text_constructors: ["Text(", "Tex(", "MathTex(", "print("]
                .into_iter()
                .map(String::from)
                .collect(),
            substitutions: [
                ("PieChart", "Circle"),
                ("BarChart", "Rectangle"),
                ("LineChart", "Line"),
                ("Histogram", "Rectangle"),
                ("ScatterPlot", "Dot"),
                ("AreaChart", "Polygon"),
                ("BubbleChart", "Circle"),
                ("RadarChart", "Polygon"),
                ("Heatmap", "Rectangle"),
                ("Treemap", "Rectangle"),
            ]
            .into_iter()
            .map(|(from, to)| Substitution {
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect(),
            pacing: PacingLimits::default(),
            max_repair_attempts: 3,
            render_imperfect: true,
            render_timeout_secs: 1200,
            session_timeout_secs: 1800,
        }
    }
}

impl RepairConfig {
    /// Load from a TOML file, or fall back to defaults. A corrupt file is
    /// reported and ignored rather than aborting the session.
    pub fn load(path: Option<&Path>) -> Self {
        let mut cfg = match path {
            Some(p) => match fs::read_to_string(p) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(cfg) => cfg,
                    Err(err) => {
                        warn!(path = %p.display(), %err, "config file invalid, using defaults");
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!(path = %p.display(), %err, "config file unreadable, using defaults");
                    Self::default()
                }
            },
            None => Self::default(),
        };
        cfg.enforce_timeout_ordering();
        cfg
    }

    /// The session ceiling must stay strictly above the renderer's, so the
    /// handler can observe and report a renderer timeout.
    fn enforce_timeout_ordering(&mut self) {
        if self.session_timeout_secs <= self.render_timeout_secs {
            let bumped = self.render_timeout_secs + 600;
            warn!(
                session = self.session_timeout_secs,
                render = self.render_timeout_secs,
                bumped,
                "session timeout must exceed render timeout, bumping"
            );
            self.session_timeout_secs = bumped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_catalogues() {
        let cfg = RepairConfig::default();
        assert!(cfg.text_constructors.iter().any(|c| c == "MathTex("));
        assert!(cfg
            .substitutions
            .iter()
            .any(|s| s.from == "PieChart" && s.to == "Circle"));
        assert_eq!(cfg.max_repair_attempts, 3);
        assert!(cfg.render_imperfect);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = RepairConfig::load(Some(Path::new("/nonexistent/scenemend.toml")));
        assert_eq!(cfg.max_repair_attempts, 3);
    }

    #[test]
    fn test_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "render_imperfect = false\nmax_repair_attempts = 5").unwrap();
        let cfg = RepairConfig::load(Some(file.path()));
        assert!(!cfg.render_imperfect);
        assert_eq!(cfg.max_repair_attempts, 5);
        // untouched fields keep their defaults
        assert_eq!(cfg.pacing.max_run_time_secs, 5.0);
    }

    #[test]
    fn test_timeout_ordering_enforced() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "render_timeout_secs = 2000\nsession_timeout_secs = 100").unwrap();
        let cfg = RepairConfig::load(Some(file.path()));
        assert!(cfg.session_timeout_secs > cfg.render_timeout_secs);
    }

    #[test]
    fn test_corrupt_file_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        let cfg = RepairConfig::load(Some(file.path()));
        assert_eq!(cfg.max_repair_attempts, 3);
    }
}
