//! Progressive code repair for generated animation scripts
//!
//! The pipeline turns a possibly-broken script into one that is guaranteed
//! to parse and maximally likely to run: sanitize → balance delimiters →
//! normalize indentation, then (for downgrade candidates) a bounded
//! compilation-gated loop that escalates to the aggressive cleanup pass.
//! Every stage is a pure `SourceText → SourceText` function; the loop never
//! mutates a candidate in place.

pub mod balance;
pub mod classify;
pub mod cleanup;
pub mod downgrade;
pub mod gate;
pub mod indent;
pub mod sanitize;

use tracing::{debug, info};

use crate::config::RepairConfig;
use gate::ParseCheck;

/// The script as an ordered sequence of lines. Stages replace the whole
/// value rather than editing lines in place, so one pass never observes a
/// later pass's partial work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    lines: Vec<String>,
}

impl SourceText {
    pub fn new(raw: &str) -> Self {
        Self {
            lines: raw.split('\n').map(String::from).collect(),
        }
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Which pass (or pass combination) an attempt applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStrategy {
    BalanceAndIndent,
    IndentOnly,
    AggressiveCleanup,
    AggressiveCleanupAndIndent,
}

/// One turn of the convergence loop.
#[derive(Debug, Clone, Copy)]
pub struct RepairAttempt {
    pub index: usize,
    pub strategy: RepairStrategy,
    /// Gate result for the text this attempt produced
    pub parsed: bool,
}

/// Final state of a repair run.
#[derive(Debug)]
pub struct RepairOutcome {
    pub text: SourceText,
    /// Whether the final text passes the parse gate
    pub parsed: bool,
    pub attempts: Vec<RepairAttempt>,
}

/// Primary repair path: sanitize, then escalate through the structural
/// passes until the gate is satisfied or the bounded-effort states are
/// spent. The result is rendered regardless; the gate only decides how much
/// repair happens first.
pub fn prepare(raw: &str, cfg: &RepairConfig) -> RepairOutcome {
    let mut attempts = Vec::new();
    let text = sanitize::sanitize(&SourceText::new(raw));

    if gate::check(&text.to_text()).is_clean() {
        debug!("input parses after sanitation only");
        return RepairOutcome {
            text,
            parsed: true,
            attempts,
        };
    }

    // First structural pass
    let mut text = indent::normalize(&balance::balance(&text, &cfg.text_constructors));
    let mut parsed = gate::check(&text.to_text()).is_clean();
    attempts.push(RepairAttempt {
        index: 1,
        strategy: RepairStrategy::BalanceAndIndent,
        parsed,
    });

    // StructuralRetry: idempotent if the first pass already converged
    if !parsed {
        text = indent::normalize(&balance::balance(&text, &cfg.text_constructors));
        parsed = gate::check(&text.to_text()).is_clean();
        attempts.push(RepairAttempt {
            index: 2,
            strategy: RepairStrategy::BalanceAndIndent,
            parsed,
        });
    }

    // IndentationRetry: bounded effort, render happens either way
    if !parsed {
        text = indent::normalize(&text);
        parsed = gate::check(&text.to_text()).is_clean();
        attempts.push(RepairAttempt {
            index: 3,
            strategy: RepairStrategy::IndentOnly,
            parsed,
        });
    }

    info!(parsed, attempts = attempts.len(), "structural repair finished");
    RepairOutcome {
        text,
        parsed,
        attempts,
    }
}

/// Bounded convergence loop for a downgrade candidate: re-check the gate, and
/// on failure escalate with the aggressive cleanup (plus re-indentation when
/// the failure looks like an indentation problem). Exhausting the ceiling
/// does not abort; the caller decides what to do with an imperfect result.
pub fn converge(candidate: SourceText, cfg: &RepairConfig) -> RepairOutcome {
    let mut text = candidate;
    let mut attempts = Vec::new();

    for index in 1..=cfg.max_repair_attempts {
        let check = gate::check(&text.to_text());
        if check.is_clean() {
            info!(attempts = attempts.len(), "candidate parses");
            return RepairOutcome {
                text,
                parsed: true,
                attempts,
            };
        }

        let strategy = match check {
            ParseCheck::Broken {
                indentation_shaped: true,
                line,
            } => {
                debug!(line, "indentation-shaped failure, cleanup + re-indent");
                RepairStrategy::AggressiveCleanupAndIndent
            }
            ParseCheck::Broken { line, .. } => {
                debug!(line, "structural failure, cleanup");
                RepairStrategy::AggressiveCleanup
            }
            ParseCheck::Clean => unreachable!("clean handled above"),
        };

        text = cleanup::aggressive_cleanup(&text, &cfg.text_constructors);
        if strategy == RepairStrategy::AggressiveCleanupAndIndent {
            text = indent::normalize(&text);
        }

        let parsed = gate::check(&text.to_text()).is_clean();
        attempts.push(RepairAttempt {
            index,
            strategy,
            parsed,
        });
    }

    let parsed = gate::check(&text.to_text()).is_clean();
    info!(parsed, attempts = attempts.len(), "convergence loop exhausted");
    RepairOutcome {
        text,
        parsed,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_clean_input_untouched() {
        let cfg = RepairConfig::default();
        let code = "from manim import *\n\nclass Demo(Scene):\n    def construct(self):\n        self.wait(1)";
        let out = prepare(code, &cfg);
        assert!(out.parsed);
        assert!(out.attempts.is_empty());
        assert_eq!(out.text.to_text(), code);
    }

    #[test]
    fn test_prepare_repairs_missing_closer() {
        let cfg = RepairConfig::default();
        let out = prepare("x = (1 + 2", &cfg);
        assert!(out.parsed);
        assert_eq!(out.text.to_text(), "x = (1 + 2\n)");
    }

    #[test]
    fn test_prepare_repairs_lost_indentation() {
        let cfg = RepairConfig::default();
        let code = "class Demo(Scene):\ndef construct(self):\nself.play(Create(c))\nself.wait(1)";
        let out = prepare(code, &cfg);
        assert!(out.parsed);
        assert!(out.text.to_text().contains("    def construct(self):"));
    }

    #[test]
    fn test_converge_bounded_by_attempt_ceiling() {
        let cfg = RepairConfig::default();
        // Unfixable by the heuristics: a def header missing its colon
        let out = converge(SourceText::new("def f(\nx ="), &cfg);
        assert!(out.attempts.len() <= cfg.max_repair_attempts);
    }

    #[test]
    fn test_converge_returns_last_candidate_when_exhausted() {
        let cfg = RepairConfig::default();
        let out = converge(SourceText::new("def f(:\n pass"), &cfg);
        // Even an imperfect result carries text for the caller to render
        assert!(!out.text.to_text().is_empty() || !out.parsed);
    }

    #[test]
    fn test_converge_clean_candidate_zero_attempts() {
        let cfg = RepairConfig::default();
        let out = converge(SourceText::new("x = 1"), &cfg);
        assert!(out.parsed);
        assert!(out.attempts.is_empty());
    }

    #[test]
    fn test_converge_fixes_orphaned_debris() {
        let cfg = RepairConfig::default();
        let code = "class Demo(Scene):\ndef construct(self):\nself.wait(1)\n)\n\"stray narration\"";
        let out = converge(SourceText::new(code), &cfg);
        assert!(out.parsed, "cleanup should yield parseable text: {}", out.text.to_text());
        assert!(!out.text.to_text().contains("stray narration"));
    }

    #[test]
    fn test_source_text_round_trip() {
        let raw = "a\n\nb\n";
        assert_eq!(SourceText::new(raw).to_text(), raw);
    }
}
