//! Aggressive cleanup
//!
//! The last-resort pass, used only when the balancer and the indentation
//! normalizer still leave text that does not parse. It is deliberately
//! lossy: relative nesting is discarded and every surviving line is forced
//! to a fixed depth.

use tracing::warn;

use super::balance::is_orphan_string;
use super::SourceText;

fn is_declaration(trimmed: &str) -> bool {
    trimmed.starts_with("class ")
        || trimmed.starts_with("def ")
        || trimmed.starts_with("import ")
        || trimmed.starts_with("from ")
}

/// A line of free-floating prose: no recognized prefix, no assignment, and
/// exactly one quoted literal spanning the whole line.
fn is_orphan_prose(trimmed: &str, line: &str) -> bool {
    !trimmed.is_empty()
        && !trimmed.starts_with('#')
        && !is_declaration(trimmed)
        && !trimmed.starts_with("self.")
        && !line.contains('=')
        && trimmed.matches('"').count() == 2
        && trimmed.starts_with('"')
        && trimmed.ends_with('"')
}

/// Drop everything that looks like debris, then force-indent what is left:
/// declarations to column 0, everything else to depth 8.
pub fn aggressive_cleanup(src: &SourceText, text_constructors: &[String]) -> SourceText {
    let mut out: Vec<String> = Vec::with_capacity(src.lines().len());

    for (i, line) in src.lines().iter().enumerate() {
        let trimmed = line.trim();

        if is_orphan_string(line, text_constructors) {
            warn!(line = i + 1, "cleanup: dropping bare string literal");
            continue;
        }

        if matches!(trimmed, ")" | "]" | "}") {
            warn!(line = i + 1, "cleanup: dropping bare closing delimiter");
            continue;
        }

        if is_orphan_prose(trimmed, line) {
            warn!(line = i + 1, "cleanup: dropping orphaned prose");
            continue;
        }

        if trimmed.is_empty() {
            out.push(line.clone());
        } else if is_declaration(trimmed) {
            out.push(trimmed.to_string());
        } else {
            out.push(format!("        {}", trimmed));
        }
    }

    SourceText::from_lines(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepairConfig;

    fn run(input: &str) -> String {
        let cfg = RepairConfig::default();
        aggressive_cleanup(&SourceText::new(input), &cfg.text_constructors).to_text()
    }

    #[test]
    fn test_bare_closers_always_dropped() {
        // Unlike the balancer, cleanup drops closers unconditionally
        let out = run("self.play(Create(c))\n)\n]\n}");
        assert_eq!(out, "        self.play(Create(c))");
    }

    #[test]
    fn test_prose_dropped() {
        let out = run("\"The circle grows to fill the frame\"\nself.wait(1)");
        assert_eq!(out, "        self.wait(1)");
    }

    #[test]
    fn test_quoted_assignment_kept() {
        let out = run("narration = \"kept because of the assignment\"");
        assert_eq!(out, "        narration = \"kept because of the assignment\"");
    }

    #[test]
    fn test_declarations_forced_to_column_zero() {
        let out = run("    class Demo(Scene):\n      def construct(self):\n            self.wait(1)");
        assert_eq!(
            out,
            "class Demo(Scene):\ndef construct(self):\n        self.wait(1)"
        );
    }

    #[test]
    fn test_imports_at_column_zero() {
        let out = run("   from manim import *\n   import numpy");
        assert_eq!(out, "from manim import *\nimport numpy");
    }

    #[test]
    fn test_comments_kept() {
        let out = run("# setup\nself.wait(1)");
        assert_eq!(out, "        # setup\n        self.wait(1)");
    }
}
