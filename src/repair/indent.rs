//! Indentation normalizer
//!
//! Rebuilds a 4-space-per-level indentation discipline from line content
//! alone; the incoming indentation is untrusted and ignored. The model is a
//! flat module / class / method shape, which is what the generator emits.
//! Deeper nesting is passed through untouched outside method bodies.

use super::SourceText;

/// Where the current line sits in the script's (assumed) shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentContext {
    TopLevel,
    InClass,
    InMethod,
}

fn is_import(trimmed: &str) -> bool {
    trimmed.starts_with("import ") || trimmed.starts_with("from ")
}

/// Re-indent the document. Blank lines pass through; the first non-blank
/// line is always forced to column 0 regardless of its apparent role.
pub fn normalize(src: &SourceText) -> SourceText {
    let mut out: Vec<String> = Vec::with_capacity(src.lines().len());
    let mut context = IndentContext::TopLevel;
    let mut first_non_blank = true;

    for line in src.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            out.push(String::new());
            continue;
        }

        if first_non_blank {
            first_non_blank = false;
            context = if trimmed.starts_with("class ") {
                IndentContext::InClass
            } else {
                IndentContext::TopLevel
            };
            out.push(trimmed.to_string());
            continue;
        }

        if is_import(trimmed) {
            context = IndentContext::TopLevel;
            out.push(trimmed.to_string());
        } else if trimmed.starts_with("class ") {
            context = IndentContext::InClass;
            out.push(trimmed.to_string());
        } else if trimmed.starts_with("def ") {
            if context == IndentContext::InClass || context == IndentContext::InMethod {
                context = IndentContext::InMethod;
                out.push(format!("    {}", trimmed));
            } else {
                // Top-level function: its body keeps whatever nesting it has
                context = IndentContext::TopLevel;
                out.push(trimmed.to_string());
            }
        } else if context == IndentContext::InMethod {
            out.push(format!("        {}", trimmed));
        } else {
            // Unknown context: keep whatever indentation came in
            out.push(line.clone());
        }
    }

    SourceText::from_lines(out)
}
