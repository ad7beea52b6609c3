//! External renderer invocation and output discovery
//!
//! The renderer is a black box: a `manim` subprocess that either exits zero
//! or leaves diagnostics on stderr. Output discovery enumerates every
//! historical output-path convention before falling back to a directory
//! scan, because the renderer's media layout has shifted across versions.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::RenderError;
use crate::request::{OutputKind, RenderRequest};
use crate::util::{run_command_with_timeout, truncate};

/// Captured output streams of a renderer run.
#[derive(Debug, Clone, Default)]
pub struct ProcessLogs {
    pub stdout: String,
    pub stderr: String,
}

/// The artifact the renderer produced.
#[derive(Debug, Clone)]
pub struct RenderArtifact {
    pub path: PathBuf,
    pub kind: OutputKind,
}

/// Renderer quality directories that may hold the output video.
const QUALITY_DIRS: [&str; 4] = ["1080p60", "720p30", "2160p60", "1440p60"];

/// Build the renderer command for one script. The argument shape is fixed:
/// quality flag, input file, target symbol, output format, resolution,
/// optional background color.
pub fn build_command(workdir: &Path, script: &str, scene: &str, req: &RenderRequest) -> Command {
    let mut cmd = Command::new("manim");
    cmd.current_dir(workdir)
        .arg("--disable_caching")
        .arg(script)
        .arg(scene)
        .arg(req.resolution().quality_flag())
        .arg("--format=mp4")
        .arg(format!("--resolution={}", req.resolution_arg()));

    if let Some(color) = req.style().background_color() {
        cmd.args(["--background_color", color]);
    }

    cmd
}

/// Invoke the renderer with a hard wall-clock deadline. Returns the logs on
/// success; a non-zero exit or a timeout is an error carrying whatever the
/// process wrote.
pub fn render_scene(
    workdir: &Path,
    script: &str,
    scene: &str,
    req: &RenderRequest,
    timeout: Duration,
) -> Result<ProcessLogs, RenderError> {
    let mut cmd = build_command(workdir, script, scene, req);
    info!(script, scene, resolution = %req.resolution_arg(), "invoking renderer");

    let result = run_command_with_timeout(&mut cmd, timeout)
        .map_err(|e| RenderError::Unknown(e.to_string()))?;

    if result.timed_out {
        warn!(timeout_secs = timeout.as_secs(), "renderer timed out");
        return Err(RenderError::RenderTimeout(timeout.as_secs()));
    }

    if !result.success() {
        warn!(stderr = %truncate(&result.stderr, 400), "renderer exited with failure");
        return Err(RenderError::RenderProcess {
            stdout: result.stdout,
            stderr: result.stderr,
        });
    }

    info!("render completed");
    Ok(ProcessLogs {
        stdout: result.stdout,
        stderr: result.stderr,
    })
}

/// Locate the rendered artifact. Search order: known video paths, known
/// image paths, then a media-tree scan by extension, then symbol-name
/// substring match, then the first file of the expected kind.
pub fn find_output(
    workdir: &Path,
    scene: &str,
    fallback_scene: Option<&str>,
) -> Result<RenderArtifact, RenderError> {
    let mut names: Vec<&str> = vec![scene];
    if let Some(fb) = fallback_scene {
        if fb != scene {
            names.push(fb);
        }
    }

    // Known output-path conventions, newest first
    for name in &names {
        for script_dir in ["scene", "fallback_scene"] {
            for quality in QUALITY_DIRS {
                let candidate = workdir
                    .join("media/videos")
                    .join(script_dir)
                    .join(quality)
                    .join(format!("{}.mp4", name));
                if candidate.exists() {
                    debug!(path = %candidate.display(), "found video at known path");
                    return Ok(RenderArtifact {
                        path: candidate,
                        kind: OutputKind::Video,
                    });
                }
            }
            let candidate = workdir
                .join("media/images")
                .join(script_dir)
                .join(format!("{}_ManimCE_v0.18.1.png", name));
            if candidate.exists() {
                debug!(path = %candidate.display(), "found image at known path");
                return Ok(RenderArtifact {
                    path: candidate,
                    kind: OutputKind::Image,
                });
            }
        }
    }

    let videos = scan_media(workdir, "media/videos", OutputKind::Video.extension());
    let images = scan_media(workdir, "media/images", OutputKind::Image.extension());
    debug!(videos = videos.len(), images = images.len(), "scanned media tree");

    // Partial movie fragments are intermediate state, never the output
    let main_videos: Vec<&PathBuf> = videos
        .iter()
        .filter(|p| !p.to_string_lossy().contains("partial_movie_files"))
        .collect();

    for name in &names {
        if let Some(path) = main_videos
            .iter()
            .find(|p| p.to_string_lossy().contains(*name))
        {
            return Ok(RenderArtifact {
                path: (*path).clone(),
                kind: OutputKind::Video,
            });
        }
    }

    if let Some(path) = main_videos.first() {
        return Ok(RenderArtifact {
            path: (*path).clone(),
            kind: OutputKind::Video,
        });
    }

    for name in &names {
        if let Some(path) = images.iter().find(|p| p.to_string_lossy().contains(*name)) {
            return Ok(RenderArtifact {
                path: path.clone(),
                kind: OutputKind::Image,
            });
        }
    }

    if let Some(path) = images.first() {
        return Ok(RenderArtifact {
            path: path.clone(),
            kind: OutputKind::Image,
        });
    }

    Err(RenderError::OutputNotFound(format!(
        "no mp4 or png under {} for scene '{}'",
        workdir.join("media").display(),
        scene
    )))
}

fn scan_media(workdir: &Path, subdir: &str, extension: &str) -> Vec<PathBuf> {
    let root = workdir.join(subdir);
    if !root.exists() {
        return Vec::new();
    }
    let mut found: Vec<PathBuf> = WalkDir::new(&root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .map(|x| x.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn request(json: &str) -> RenderRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_command_arg_shape() {
        let req = request(r#"{"code": "", "resolution": "1080p", "aspect_ratio": "16:9", "style": "dark"}"#);
        let cmd = build_command(Path::new("."), "scene.py", "Demo", &req);
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec![
                "--disable_caching",
                "scene.py",
                "Demo",
                "-qk",
                "--format=mp4",
                "--resolution=1920x1080",
                "--background_color",
                "BLACK",
            ]
        );
    }

    #[test]
    fn test_auto_style_has_no_background_flag() {
        let req = request(r#"{"code": ""}"#);
        let cmd = build_command(Path::new("."), "scene.py", "Demo", &req);
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert!(!args.contains(&"--background_color".to_string()));
    }

    #[test]
    fn test_find_output_prefers_known_video_path() {
        let dir = tempfile::tempdir().unwrap();
        let video_dir = dir.path().join("media/videos/scene/720p30");
        fs::create_dir_all(&video_dir).unwrap();
        fs::write(video_dir.join("Demo.mp4"), b"x").unwrap();

        let artifact = find_output(dir.path(), "Demo", None).unwrap();
        assert_eq!(artifact.kind, OutputKind::Video);
        assert!(artifact.path.ends_with("media/videos/scene/720p30/Demo.mp4"));
    }

    #[test]
    fn test_find_output_falls_back_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        let odd_dir = dir.path().join("media/videos/scene/480p15");
        fs::create_dir_all(&odd_dir).unwrap();
        fs::write(odd_dir.join("Whatever.mp4"), b"x").unwrap();

        let artifact = find_output(dir.path(), "Demo", None).unwrap();
        assert_eq!(artifact.kind, OutputKind::Video);
    }

    #[test]
    fn test_find_output_ignores_partial_movie_files() {
        let dir = tempfile::tempdir().unwrap();
        let partial = dir.path().join("media/videos/scene/720p30/partial_movie_files/Demo");
        fs::create_dir_all(&partial).unwrap();
        fs::write(partial.join("000.mp4"), b"x").unwrap();
        let images = dir.path().join("media/images/scene");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("Still.png"), b"x").unwrap();

        // Partial fragments are skipped; the still image wins
        let artifact = find_output(dir.path(), "Demo", None).unwrap();
        assert_eq!(artifact.kind, OutputKind::Image);
    }

    #[test]
    fn test_find_output_uses_fallback_scene_name() {
        let dir = tempfile::tempdir().unwrap();
        let video_dir = dir.path().join("media/videos/fallback_scene/720p30");
        fs::create_dir_all(&video_dir).unwrap();
        fs::write(video_dir.join("Renamed.mp4"), b"x").unwrap();

        let artifact = find_output(dir.path(), "Demo", Some("Renamed")).unwrap();
        assert!(artifact.path.ends_with("Renamed.mp4"));
    }

    #[test]
    fn test_find_output_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_output(dir.path(), "Demo", None).unwrap_err();
        assert!(matches!(err, RenderError::OutputNotFound(_)));
    }
}
