//! Failure taxonomy for a repair-and-render session
//!
//! The variants mirror the propagation policy: `MissingInput` is fatal
//! before any repair; the structural/naming variants are surfaced verbatim
//! for upstream regeneration; `UnsupportedFeature` and `Unknown` drive the
//! downgrade path; the remainder are terminal render-side conditions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No code provided in request body")]
    MissingInput,

    #[error("syntax error: {0}")]
    StructuralSyntax(String),

    #[error("indentation error: {0}")]
    Indentation(String),

    #[error("undefined name: {0}")]
    UndefinedName(String),

    #[error("import error: {0}")]
    Import(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("renderer failed: {stderr}")]
    RenderProcess { stdout: String, stderr: String },

    #[error("renderer timed out after {0}s")]
    RenderTimeout(u64),

    #[error("session exceeded {0}s budget")]
    SessionTimeout(u64),

    #[error("render output not found: {0}")]
    OutputNotFound(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("{0}")]
    Unknown(String),
}

impl RenderError {
    /// Build the surface-for-regeneration variant for a classified failure.
    pub fn from_failure(report: &crate::repair::classify::FailureReport) -> Self {
        use crate::repair::classify::FailureKind;
        let msg = report.message.clone();
        match report.kind {
            FailureKind::StructuralSyntax => RenderError::StructuralSyntax(msg),
            FailureKind::Indentation => RenderError::Indentation(msg),
            FailureKind::UndefinedName => RenderError::UndefinedName(msg),
            FailureKind::ImportError => RenderError::Import(msg),
            FailureKind::UnsupportedFeature => RenderError::UnsupportedFeature(msg),
            FailureKind::Unknown => RenderError::Unknown(msg),
        }
    }
}
