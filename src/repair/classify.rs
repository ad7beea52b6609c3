//! Failure classification and the fallback decision policy
//!
//! A failed render leaves us with diagnostic text from the renderer. The
//! policy sorts it into a category and decides whether the script should be
//! mechanically downgraded (voiceover stripped, unsupported API rewritten)
//! or surfaced so the upstream generator can regenerate it. Structural and
//! naming errors are better fixed by re-prompting; feature-unavailability
//! and unclassified errors are better fixed by downgrading.

/// Category derived from the failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    StructuralSyntax,
    Indentation,
    UndefinedName,
    ImportError,
    UnsupportedFeature,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct FailureReport {
    pub message: String,
    pub kind: FailureKind,
}

/// Markers of the optional narration feature in renderer diagnostics.
const FEATURE_KEYWORDS: [&str; 7] = [
    "voiceover",
    "speech",
    "tts",
    "openai",
    "audio",
    "manim_voiceover",
    "set_speech_service",
];

impl FailureReport {
    /// Ordered keyword matching over the lowercased message. Pure: identical
    /// messages always classify identically.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();

        let kind = if FEATURE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            FailureKind::UnsupportedFeature
        } else if lower.contains("indentation") || lower.contains("indent") {
            FailureKind::Indentation
        } else if lower.contains("syntax") {
            FailureKind::StructuralSyntax
        } else if lower.contains("import") || lower.contains("module") {
            FailureKind::ImportError
        } else if lower.contains("name") && lower.contains("not defined") {
            FailureKind::UndefinedName
        } else {
            FailureKind::Unknown
        };

        FailureReport {
            message: message.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackDecision {
    pub downgrade: bool,
    pub reason: &'static str,
}

/// Decide whether to attempt the feature downgrade for this failure.
pub fn decide(report: &FailureReport) -> FallbackDecision {
    match report.kind {
        FailureKind::UnsupportedFeature => FallbackDecision {
            downgrade: true,
            reason: "voiceover service error",
        },
        FailureKind::StructuralSyntax => FallbackDecision {
            downgrade: false,
            reason: "syntax error - regenerate upstream",
        },
        FailureKind::Indentation => FallbackDecision {
            downgrade: false,
            reason: "indentation error - regenerate upstream",
        },
        FailureKind::ImportError => FallbackDecision {
            downgrade: false,
            reason: "import error - regenerate upstream",
        },
        FailureKind::UndefinedName => FallbackDecision {
            downgrade: false,
            reason: "undefined name error - regenerate upstream",
        },
        FailureKind::Unknown => FallbackDecision {
            downgrade: true,
            reason: "unknown error - attempting downgrade",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voiceover_errors_downgrade() {
        for msg in [
            "ModuleNotFoundError: No module named 'manim_voiceover'",
            "OpenAI API key not set for speech service",
            "TTS request failed",
            "could not open audio device",
        ] {
            let report = FailureReport::classify(msg);
            assert_eq!(report.kind, FailureKind::UnsupportedFeature, "{}", msg);
            assert!(decide(&report).downgrade, "{}", msg);
        }
    }

    #[test]
    fn test_feature_keywords_win_over_import_keywords() {
        // "No module named 'manim_voiceover'" mentions both a module and the
        // feature; the feature match is checked first and wins.
        let report = FailureReport::classify("No module named 'manim_voiceover'");
        assert_eq!(report.kind, FailureKind::UnsupportedFeature);
    }

    #[test]
    fn test_syntax_errors_surface() {
        let report = FailureReport::classify("SyntaxError: invalid syntax (scene.py, line 12)");
        assert_eq!(report.kind, FailureKind::StructuralSyntax);
        assert!(!decide(&report).downgrade);
    }

    #[test]
    fn test_indentation_errors_surface() {
        let report = FailureReport::classify("IndentationError: unexpected indent");
        assert_eq!(report.kind, FailureKind::Indentation);
        assert!(!decide(&report).downgrade);
    }

    #[test]
    fn test_import_errors_surface() {
        let report = FailureReport::classify("ImportError: cannot import name 'Axes3D'");
        assert_eq!(report.kind, FailureKind::ImportError);
        assert!(!decide(&report).downgrade);
    }

    #[test]
    fn test_undefined_name_surfaces() {
        let report = FailureReport::classify("NameError: name 'PieChart' is not defined");
        assert_eq!(report.kind, FailureKind::UndefinedName);
        assert!(!decide(&report).downgrade);
    }

    #[test]
    fn test_unknown_errors_downgrade_as_last_resort() {
        let report = FailureReport::classify("segmentation fault in cairo backend");
        assert_eq!(report.kind, FailureKind::Unknown);
        assert!(decide(&report).downgrade);
    }

    #[test]
    fn test_classification_deterministic() {
        let msg = "Some Mixed-Case ERROR about Speech";
        let a = FailureReport::classify(msg);
        let b = FailureReport::classify(msg);
        assert_eq!(a.kind, b.kind);
        assert_eq!(decide(&a), decide(&b));
    }

    #[test]
    fn test_case_insensitive() {
        let a = FailureReport::classify("SYNTAX ERROR");
        assert_eq!(a.kind, FailureKind::StructuralSyntax);
    }
}
