//! End-to-end repair-and-render session
//!
//! One request in, one structured outcome out: validate, repair, render,
//! and on a feature-shaped failure downgrade and render again. The session
//! is synchronous; every renderer invocation carries the configured
//! wall-clock deadline.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::RepairConfig;
use crate::error::RenderError;
use crate::render::{self, ProcessLogs};
use crate::repair::{self, classify, downgrade, SourceText};
use crate::request::{RenderOutcome, RenderRequest};
use crate::upload;

const PRIMARY_SCRIPT: &str = "scene.py";
const FALLBACK_SCRIPT: &str = "fallback_scene.py";

/// Run one complete session in `workdir`. Never panics and never returns
/// `Err` for render-side problems; everything the caller needs is inside
/// the outcome.
pub fn run(req: &RenderRequest, cfg: &RepairConfig, workdir: &Path) -> RenderOutcome {
    let session_deadline = Instant::now() + Duration::from_secs(cfg.session_timeout_secs);
    let code = match req.code.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(c) => c,
        None => {
            return RenderOutcome::failure(
                RenderError::MissingInput.to_string(),
                String::new(),
                String::new(),
            )
        }
    };

    let repaired = repair::prepare(code, cfg);
    if !repaired.parsed {
        info!("script still imperfect after structural repair, rendering anyway");
    }

    // The declared scene may not match the requested symbol; prefer what the
    // script actually defines.
    let mut scene = req.scene_name.clone();
    let text = repaired.text.to_text();
    if !text.contains(&format!("class {}", scene)) {
        if let Some(found) = downgrade::detect_scene_class(&text) {
            warn!(requested = %scene, found = %found, "scene symbol mismatch, using declared class");
            scene = found;
        }
    }

    log_advisories(&text);

    if let Err(e) = write_script(workdir, PRIMARY_SCRIPT, &text) {
        return RenderOutcome::failure(e.to_string(), String::new(), String::new());
    }

    let timeout = render_budget(cfg.render_timeout_secs, remaining(session_deadline));
    match render::render_scene(workdir, PRIMARY_SCRIPT, &scene, req, timeout) {
        Ok(logs) => finish(workdir, &scene, None, req, logs),
        // A timeout carries no diagnostics but still goes through the decision
        // policy: it classifies as Unknown, and the downgrade's pacing caps
        // exist precisely to shorten scenes that overrun.
        Err(e @ RenderError::RenderTimeout(_)) => after_failed_render(
            req,
            cfg,
            workdir,
            &repaired.text,
            &scene,
            String::new(),
            e.to_string(),
            session_deadline,
        ),
        Err(RenderError::RenderProcess { stdout, stderr }) => after_failed_render(
            req,
            cfg,
            workdir,
            &repaired.text,
            &scene,
            stdout,
            stderr,
            session_deadline,
        ),
        Err(e) => RenderOutcome::failure(e.to_string(), String::new(), String::new()),
    }
}

/// Classify the failure and either surface it or take the downgrade path.
#[allow(clippy::too_many_arguments)]
fn after_failed_render(
    req: &RenderRequest,
    cfg: &RepairConfig,
    workdir: &Path,
    source: &SourceText,
    scene: &str,
    stdout: String,
    stderr: String,
    session_deadline: Instant,
) -> RenderOutcome {
    let report = classify::FailureReport::classify(&stderr);
    let decision = classify::decide(&report);
    info!(kind = ?report.kind, downgrade = decision.downgrade, reason = decision.reason, "primary render failed");

    if !decision.downgrade {
        // Surfaced verbatim so the upstream generator can react
        return RenderOutcome::failure(
            RenderError::from_failure(&report).to_string(),
            stdout,
            stderr,
        );
    }

    run_downgraded(req, cfg, workdir, source, scene, stdout, stderr, session_deadline)
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Deadline for one renderer invocation: its own ceiling, clipped to
/// whatever is left of the session budget.
fn render_budget(render_timeout_secs: u64, session_remaining: Duration) -> Duration {
    Duration::from_secs(render_timeout_secs).min(session_remaining)
}

/// Feature-downgrade path: strip the narration feature, converge the result
/// through the bounded repair loop, and render the fallback script.
#[allow(clippy::too_many_arguments)]
fn run_downgraded(
    req: &RenderRequest,
    cfg: &RepairConfig,
    workdir: &Path,
    source: &SourceText,
    scene: &str,
    primary_stdout: String,
    primary_stderr: String,
    session_deadline: Instant,
) -> RenderOutcome {
    let downgraded = downgrade::strip_voiceover(source, scene, cfg);
    let effective = downgraded
        .effective_scene
        .unwrap_or_else(|| scene.to_string());

    let converged = repair::converge(downgraded.text, cfg);
    if !converged.parsed && !cfg.render_imperfect {
        warn!("downgraded script does not parse and imperfect renders are disabled");
        return RenderOutcome::failure(
            RenderError::StructuralSyntax("downgraded script does not parse".to_string())
                .to_string(),
            primary_stdout,
            primary_stderr,
        );
    }

    if let Err(e) = write_script(workdir, FALLBACK_SCRIPT, &converged.text.to_text()) {
        return RenderOutcome::failure(e.to_string(), primary_stdout, primary_stderr);
    }

    let budget = remaining(session_deadline);
    if budget.is_zero() {
        warn!("session budget spent before the fallback render");
        return RenderOutcome::failure(
            RenderError::SessionTimeout(cfg.session_timeout_secs).to_string(),
            primary_stdout,
            primary_stderr,
        );
    }

    let timeout = render_budget(cfg.render_timeout_secs, budget);
    match render::render_scene(workdir, FALLBACK_SCRIPT, &effective, req, timeout) {
        Ok(logs) => finish(workdir, scene, Some(&effective), req, logs),
        Err(RenderError::RenderProcess { stdout, stderr }) => {
            warn!("fallback render also failed");
            RenderOutcome::failure(
                RenderError::RenderProcess {
                    stdout: stdout.clone(),
                    stderr: stderr.clone(),
                }
                .to_string(),
                stdout,
                stderr,
            )
        }
        Err(e) => RenderOutcome::failure(e.to_string(), primary_stdout, primary_stderr),
    }
}

/// Locate the artifact, upload it when asked, and assemble the outcome.
fn finish(
    workdir: &Path,
    scene: &str,
    fallback_scene: Option<&str>,
    req: &RenderRequest,
    logs: ProcessLogs,
) -> RenderOutcome {
    let artifact = match render::find_output(workdir, scene, fallback_scene) {
        Ok(a) => a,
        Err(e) => return RenderOutcome::failure(e.to_string(), logs.stdout, logs.stderr),
    };

    if let Some(url) = req.upload_url.as_deref() {
        if let Err(e) = upload::upload_artifact(&artifact.path, artifact.kind, url) {
            return RenderOutcome::failure(e.to_string(), logs.stdout, logs.stderr);
        }
    }

    RenderOutcome::success(
        artifact.path.display().to_string(),
        artifact.kind,
        logs.stdout,
        logs.stderr,
    )
}

/// Advisory checks on the script about to render. Never blocks; the hints
/// only show up in the session log.
fn log_advisories(text: &str) {
    let has_axes = text.contains("Axes(");
    if has_axes && !text.contains("get_axis_labels") && !text.contains("add_coordinates") {
        warn!("chart uses Axes without axis labels or coordinates");
    }
    const MATH_PATTERNS: [&str; 6] = ["^2", "^3", "\\frac", "\\sqrt", "\\pm", "\\times"];
    for (i, line) in text.lines().enumerate() {
        if line.contains("Text(") && MATH_PATTERNS.iter().any(|p| line.contains(p)) {
            warn!(line = i + 1, "mathematical notation set in Text(), consider MathTex()");
        }
    }
}

fn write_script(workdir: &Path, name: &str, text: &str) -> Result<(), RenderError> {
    fs::create_dir_all(workdir)
        .and_then(|_| fs::write(workdir.join(name), text))
        .map_err(|e| RenderError::Unknown(format!("write {}: {}", name, e)))
}
