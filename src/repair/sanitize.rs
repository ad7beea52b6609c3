//! Encoding sanitizer for generated scripts
//!
//! Upstream generation occasionally leaks characters that cannot round-trip
//! through the renderer's UTF-8 pipeline (artifacts of lossy decodes in the
//! generation chain). This pass is total: it never fails, and it is a no-op
//! on already-clean text.

use super::SourceText;

/// Characters we let through unchanged: ASCII plus the BMP band the renderer
/// handles reliably. Everything else becomes a placeholder.
fn is_safe(c: char) -> bool {
    c <= '\u{7F}' || ('\u{A0}'..='\u{FFFF}').contains(&c)
}

/// Sanitize a whole text blob. Surrogate code points cannot occur in a Rust
/// `str`, so the operative rule is the band filter; replacement-character
/// residue from earlier lossy decodes is dropped rather than replaced.
pub fn sanitize_text(text: &str) -> String {
    if text.chars().all(is_safe) {
        return text.to_string();
    }
    text.chars()
        .filter(|&c| c != '\u{FFFD}')
        .map(|c| if is_safe(c) { c } else { '?' })
        .collect()
}

/// Per-line application of the same rule.
pub fn sanitize(src: &SourceText) -> SourceText {
    SourceText::from_lines(src.lines().iter().map(|l| sanitize_text(l)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_unchanged() {
        let input = "from manim import *\nclass Demo(Scene):\n    pass";
        assert_eq!(sanitize_text(input), input);
    }

    #[test]
    fn test_accented_and_cjk_kept() {
        let input = "title = Text(\"café こんにちは\")";
        assert_eq!(sanitize_text(input), input);
    }

    #[test]
    fn test_astral_plane_replaced() {
        let input = "label = Text(\"\u{1F600}\")";
        assert_eq!(sanitize_text(input), "label = Text(\"?\")");
    }

    #[test]
    fn test_replacement_char_dropped() {
        let input = "x = 1 \u{FFFD}\u{1F680}";
        assert_eq!(sanitize_text(input), "x = 1 ?");
    }

    #[test]
    fn test_idempotent() {
        let input = "a \u{1F600} b";
        let once = sanitize_text(input);
        assert_eq!(sanitize_text(&once), once);
    }

    #[test]
    fn test_total_on_arbitrary_input() {
        // Never panics, output always within the safe band
        for input in ["", "\0", "\u{10FFFF}", "mixed \u{E000} \u{1D11E} text"] {
            let out = sanitize_text(input);
            assert!(out.chars().all(is_safe));
        }
    }

    #[test]
    fn test_per_line_matches_whole_text() {
        let src = SourceText::new("ok line\nbad \u{1F600}\nlast");
        let out = sanitize(&src);
        assert_eq!(out.to_text(), "ok line\nbad ?\nlast");
    }
}
