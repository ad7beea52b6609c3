//! Feature-downgrade rewriter
//!
//! Strips the narrated-voiceover feature from a generated script and
//! rewrites a catalogue of unsupported API patterns to supported
//! equivalents, trading narration fidelity for renderability. The scan is
//! line-oriented with bounded lookahead; the multi-line constructs
//! (service-call argument lists, `with` narration blocks, dangling string
//! literals) are tracked through an explicit scan state rather than a real
//! parse.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::balance::is_orphan_string;
use super::SourceText;
use crate::config::{PacingLimits, RepairConfig, Substitution};

static WAIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"self\.wait\(([0-9.]+)\)").unwrap());
static RUN_TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"run_time=([0-9.]+)").unwrap());
static CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"class\s+(\w+)\s*\(").unwrap());
static SCENE_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"class\s+(\w+)\s*\(\s*(?:Voiceover)?Scene\s*\)").unwrap());

pub struct DowngradeResult {
    pub text: SourceText,
    /// The scene symbol that survives rewriting, when it differs from the
    /// requested one (rare: the rewrite renamed the base class the symbol
    /// was declared against)
    pub effective_scene: Option<String>,
}

/// Multi-line constructs currently being skipped.
#[derive(Debug, Default)]
struct ScanState {
    /// Remaining parenthesis depth of a service call being dropped
    paren_skip: Option<i32>,
    /// Indent of the `with self.voiceover(...)` line whose block is being dropped
    block_indent: Option<usize>,
    /// Inside a dangling multi-line string with no assignment
    in_orphan_string: bool,
}

fn paren_delta(line: &str) -> i32 {
    line.chars().filter(|&c| c == '(').count() as i32
        - line.chars().filter(|&c| c == ')').count() as i32
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// First `class X(Scene)` / `class X(VoiceoverScene)` declaration in the text.
pub fn detect_scene_class(code: &str) -> Option<String> {
    SCENE_CLASS_RE
        .captures(code)
        .map(|caps| caps[1].to_string())
}

/// Strip the voiceover feature and rewrite the unsupported-API catalogue.
pub fn strip_voiceover(
    src: &SourceText,
    requested_scene: &str,
    cfg: &RepairConfig,
) -> DowngradeResult {
    let lines = src.lines();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut st = ScanState::default();

    for (i, raw) in lines.iter().enumerate() {
        let mut line = raw.clone();

        if line.contains("from manim_voiceover") || line.contains("import OpenAIService") {
            warn!(line = i + 1, "removing voiceover import");
            continue;
        }

        if line.contains("VoiceoverScene") {
            line = line.replace("VoiceoverScene", "Scene");
        }

        // Inside a multi-line service call being dropped
        if let Some(depth) = st.paren_skip {
            let depth = depth + paren_delta(&line);
            if depth <= 0 {
                st.paren_skip = None;
            } else {
                st.paren_skip = Some(depth);
            }
            continue;
        }

        if line.contains("OpenAIService(") || line.contains("self.set_speech_service(") {
            warn!(line = i + 1, "dropping speech service call");
            let depth = paren_delta(&line);
            if depth > 0 {
                st.paren_skip = Some(depth);
            }
            continue;
        }

        if line.contains("with self.voiceover(") {
            warn!(line = i + 1, "dropping voiceover block");
            st.block_indent = Some(leading_spaces(&line));
            continue;
        }

        // Inside a voiceover block: skip until dedent or blank. The first
        // dedented line is kept verbatim unless it is blank or a bare closer.
        if let Some(base) = st.block_indent {
            let trimmed = line.trim();
            if trimmed.is_empty() || leading_spaces(&line) <= base {
                st.block_indent = None;
                if !trimmed.is_empty() && trimmed != ")" {
                    out.push(line);
                }
            }
            continue;
        }

        // Dangling multi-line string literal with no assignment
        if st.in_orphan_string {
            let trimmed = line.trim();
            if trimmed.ends_with('"') || trimmed.ends_with('\'') {
                st.in_orphan_string = false;
            }
            continue;
        }

        if is_orphan_string(&line, &cfg.text_constructors) {
            warn!(line = i + 1, "dropping orphaned string literal");
            continue;
        }

        if starts_orphan_string(&line) {
            warn!(line = i + 1, "dropping dangling multi-line string literal");
            st.in_orphan_string = true;
            continue;
        }

        // Narration timing no longer exists once the tracker is gone
        if line.contains("run_time=tracker.duration") {
            line = line.replace("run_time=tracker.duration", "run_time=1");
        }

        line = rewrite_latex(line);
        line = rewrite_text_accents(line);
        line = rewrite_config_style(line);
        line = rewrite_drawables(line, &cfg.substitutions);
        line = rewrite_plot_api(line);
        line = enforce_min_wait(line, &cfg.pacing);
        // After min-wait so the sentinel wait it emits is not padded
        line = rewrite_camera_frame(line);
        line = rewrite_groups(line);

        // Back-to-back uncommitted animations: commit with a wait between
        if line.contains("self.play(") {
            if let Some(next) = lines.get(i + 1) {
                if next.contains("self.play(") && !next.contains("self.wait(") {
                    warn!(line = i + 1, "inserting wait between consecutive play calls");
                    let indent = " ".repeat(leading_spaces(&line));
                    let line = cap_run_time(line, &cfg.pacing);
                    let line = inject_run_time(line, &cfg.pacing);
                    out.push(line);
                    out.push(format!(
                        "{}self.wait({:.1})  # Added for proper pacing",
                        indent, cfg.pacing.padded_wait_secs
                    ));
                    continue;
                }
            }
        }

        line = cap_run_time(line, &cfg.pacing);
        line = inject_run_time(line, &cfg.pacing);

        if line.contains("VGroup(VGroup(") {
            line = line.replace("VGroup(VGroup(", "VGroup(");
        }

        line = rewrite_loop_memory(line);

        for note in advisories(&line, &out) {
            out.push(note);
        }

        out.push(line);
    }

    let text = SourceText::from_lines(out);
    let effective_scene = effective_scene_name(&text, requested_scene);
    DowngradeResult {
        text,
        effective_scene,
    }
}

/// Opening line of a multi-line string that has no structural role.
fn starts_orphan_string(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('"')
        && !(trimmed.len() >= 2 && trimmed.ends_with('"'))
        && !line.contains('=')
        && !line.contains("self.")
        && !line.contains("print(")
}

/// LaTeX robustness: raw-string payloads and spaced double braces.
fn rewrite_latex(mut line: String) -> String {
    if line.contains("MathTex") && line.contains("{{") {
        line = line.replace("{{", "{ {").replace("}}", "} }");
    }
    let needs_raw = line.contains('\\') || line.contains('$');
    if line.contains("MathTex(\"") && needs_raw && !line.contains("r\"") {
        line = line.replace("MathTex(\"", "MathTex(r\"");
    }
    line
}

/// Text payloads carrying accented or symbol characters render more
/// reliably from a raw string.
fn rewrite_text_accents(mut line: String) -> String {
    const MARKERS: [char; 4] = ['©', 'é', 'è', 'à'];
    if line.contains("Text(\"") && !line.contains("r\"") && line.chars().any(|c| MARKERS.contains(&c))
    {
        line = line.replace("Text(\"", "Text(r\"");
    }
    line
}

/// The renderer's config object carries no style attribute; pin the default.
fn rewrite_config_style(mut line: String) -> String {
    if line.contains("config[\"style\"]") {
        line = line.replace("config[\"style\"]", "\"dark\"");
    }
    if line.contains("config.style") {
        line = line.replace("config.style", "\"dark\"");
    }
    line
}

/// Name-for-name substitution of unsupported drawable types. Not a
/// geometry-preserving transform.
fn rewrite_drawables(mut line: String, substitutions: &[Substitution]) -> String {
    for sub in substitutions {
        if line.contains(&sub.from) {
            warn!(from = %sub.from, to = %sub.to, "substituting unsupported drawable type");
            line = line.replace(&sub.from, &sub.to);
        }
    }
    line
}

fn rewrite_plot_api(mut line: String) -> String {
    // get_graph() dropped its color parameter; plot() is the replacement
    if line.contains("ax.get_graph(") && line.contains("color=") {
        line = line.replace("ax.get_graph(", "ax.plot(");
    } else if line.contains("get_graph(") && line.contains("color=") {
        line = line.replace("get_graph(", "plot(");
    }
    if line.contains("plot_line_graph(") && line.contains("add_vertex_dots=True") {
        // vertex dots carry a radius that collides with vertex_dot_style
        line = line.replace("add_vertex_dots=True", "add_vertex_dots=False");
    }
    if line.contains("vertex_dot_style") && line.contains("radius") {
        line = line.replace("vertex_dot_style={\"radius\": ", "vertex_dot_style={");
        line = line.replace("vertex_dot_style={\"radius\":", "vertex_dot_style={");
    }
    line
}

/// The target renderer version has no movable camera frame on plain scenes.
fn rewrite_camera_frame(line: String) -> String {
    if !line.contains("self.camera.frame") {
        return line;
    }
    if line.contains("animate.scale(") {
        "        self.wait(0.5)  # Replaced camera.frame.animate.scale()".to_string()
    } else if line.contains("animate.shift(") {
        "        self.wait(0.5)  # Replaced camera.frame.animate.shift()".to_string()
    } else if line.contains("animate") {
        "        self.wait(0.5)  # Replaced camera.frame animation".to_string()
    } else {
        "        # Removed camera.frame reference".to_string()
    }
}

/// VGroup rejects non-vectorized members; Group accepts the mix.
fn rewrite_groups(mut line: String) -> String {
    let mixes = line.contains("Text(") || line.contains("MathTex(") || line.contains("DecimalNumber(");
    if line.contains("VGroup(") && mixes {
        line = line.replace("VGroup(", "Group(");
    }
    line
}

fn enforce_min_wait(line: String, pacing: &PacingLimits) -> String {
    if let Some(caps) = WAIT_RE.captures(&line) {
        if let Ok(secs) = caps[1].parse::<f64>() {
            if secs < pacing.min_wait_secs {
                warn!(from = secs, to = pacing.padded_wait_secs, "padding degenerate wait");
                return line.replace(&caps[0], &format!("self.wait({:.1})", pacing.padded_wait_secs));
            }
        }
    }
    line
}

fn cap_run_time(line: String, pacing: &PacingLimits) -> String {
    if let Some(caps) = RUN_TIME_RE.captures(&line) {
        if let Ok(secs) = caps[1].parse::<f64>() {
            if secs > pacing.max_run_time_secs {
                warn!(from = secs, to = pacing.max_run_time_secs, "capping run_time");
                return line.replace(
                    &caps[0],
                    &format!("run_time={:.1}", pacing.max_run_time_secs),
                );
            }
        }
    }
    line
}

fn inject_run_time(line: String, pacing: &PacingLimits) -> String {
    if line.contains("self.play(") && !line.contains("run_time") {
        let trimmed_end = line.trim_end();
        if trimmed_end.ends_with(')') {
            let mut with_run_time = trimmed_end[..trimmed_end.len() - 1].to_string();
            with_run_time.push_str(&format!(", run_time={:.1})", pacing.default_run_time_secs));
            return with_run_time;
        }
    }
    line
}

fn rewrite_loop_memory(mut line: String) -> String {
    if line.contains("for i in range(") && line.contains("range(100") {
        line = line.replace("range(100", "range(10");
    }
    if line.contains("Circle(radius=0.1)") && line.contains("for ") {
        line = line.replace("Circle(radius=0.1)", "Circle(radius=0.3)");
    }
    line
}

/// Advisory comments for constructs the rewriter cannot safely fix. Emitted
/// before the subject line; parse-neutral.
fn advisories(line: &str, emitted: &[String]) -> Vec<String> {
    let mut notes = Vec::new();

    // Animating new content over uncleared previous content
    let creates = line.contains("self.play(")
        && (line.contains("Create(") || line.contains("Write(") || line.contains("FadeIn("));
    if creates && emitted.len() > 10 {
        let recent = &emitted[emitted.len().saturating_sub(5)..];
        let cleared = recent
            .iter()
            .any(|l| l.contains("FadeOut(") || l.contains("self.clear()"));
        if !cleared {
            let indent = " ".repeat(leading_spaces(line));
            notes.push(format!(
                "{}# WARNING: Previous content may overlap - consider FadeOut",
                indent
            ));
        }
    }

    // Equations set in plain Text render poorly
    if line.contains("Text(") {
        const MATH_PATTERNS: [&str; 8] =
            ["x^2", "y^2", "^2", "^3", "\\frac", "\\sqrt", "\\pm", "\\times"];
        if MATH_PATTERNS.iter().any(|p| line.contains(p)) {
            notes.push(
                "        # WARNING: Consider using MathTex() instead of Text() for equations"
                    .to_string(),
            );
        }
    }

    if (line.contains("MathTex(\"") || line.contains("Tex(\""))
        && line.contains('\\')
        && !line.contains("r\"")
    {
        notes.push(
            "        # WARNING: Use raw strings r\"...\" for LaTeX to avoid backslash issues"
                .to_string(),
        );
    }

    if line.contains("add_updater(") {
        notes.push("        # NOTE: Object with updater - ensure proper cleanup".to_string());
    }

    notes
}

/// Re-scan the rewritten text for the scene symbol that actually exists.
fn effective_scene_name(text: &SourceText, requested: &str) -> Option<String> {
    for line in text.lines() {
        if line.contains("class ") && line.contains("Scene") {
            if let Some(caps) = CLASS_RE.captures(line) {
                let found = caps[1].to_string();
                if found != requested {
                    warn!(requested, found = %found, "scene symbol changed by rewrite");
                    return Some(found);
                }
                return None;
            }
        }
    }
    None
}
