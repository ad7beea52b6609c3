//! Render request and outcome types
//!
//! The structured boundary of the pipeline: what the caller asks for, how
//! the enumerated knobs map onto renderer directives, and what comes back.

use serde::{Deserialize, Serialize};

/// Output resolution. Unrecognized values fall back to 720p.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    P480,
    P720,
    P1080,
}

impl Resolution {
    pub fn parse(s: &str) -> Self {
        match s {
            "480p" => Resolution::P480,
            "1080p" => Resolution::P1080,
            _ => Resolution::P720,
        }
    }

    /// The renderer's quality directive for this resolution.
    pub fn quality_flag(&self) -> &'static str {
        match self {
            Resolution::P480 => "-ql",
            Resolution::P720 => "-qh",
            Resolution::P1080 => "-qk",
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Resolution::P480 => 480,
            Resolution::P720 => 720,
            Resolution::P1080 => 1080,
        }
    }
}

/// Frame aspect. Unrecognized values fall back to 16:9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Wide16x9,
    Tall9x16,
    Square,
}

impl AspectRatio {
    pub fn parse(s: &str) -> Self {
        match s {
            "9:16" => AspectRatio::Tall9x16,
            "1:1" => AspectRatio::Square,
            _ => AspectRatio::Wide16x9,
        }
    }

    /// (width, height) for the given output height.
    pub fn dimensions(&self, height: u32) -> (u32, u32) {
        let width = match self {
            AspectRatio::Wide16x9 => height * 16 / 9,
            AspectRatio::Tall9x16 => height * 9 / 16,
            AspectRatio::Square => height,
        };
        (width, height)
    }
}

/// Visual style; maps to a background-color directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Auto,
    Dark,
    Cinematic,
    Clean,
}

impl Style {
    pub fn parse(s: &str) -> Self {
        match s {
            "dark" => Style::Dark,
            "cinematic" => Style::Cinematic,
            "clean" => Style::Clean,
            _ => Style::Auto,
        }
    }

    pub fn background_color(&self) -> Option<&'static str> {
        match self {
            Style::Dark | Style::Cinematic => Some("BLACK"),
            Style::Clean => Some("WHITE"),
            Style::Auto => None,
        }
    }
}

fn default_scene_name() -> String {
    "GeneratedScene".to_string()
}

fn default_resolution() -> String {
    "720p".to_string()
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

fn default_duration() -> u32 {
    8
}

fn default_style() -> String {
    "auto".to_string()
}

/// One repair-and-render request. `code` is the only required field.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_scene_name")]
    pub scene_name: String,
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default = "default_resolution")]
    pub resolution: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    /// Advisory only; the script itself controls the real duration
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_style")]
    pub style: String,
}

impl RenderRequest {
    pub fn resolution(&self) -> Resolution {
        Resolution::parse(&self.resolution)
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        AspectRatio::parse(&self.aspect_ratio)
    }

    pub fn style(&self) -> Style {
        Style::parse(&self.style)
    }

    /// Pixel dimensions derived from resolution × aspect ratio.
    pub fn dimensions(&self) -> (u32, u32) {
        self.aspect_ratio().dimensions(self.resolution().height())
    }

    /// The `WxH` string handed to the renderer.
    pub fn resolution_arg(&self) -> String {
        let (w, h) = self.dimensions();
        format!("{}x{}", w, h)
    }
}

/// Kind of artifact the renderer produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Video,
    Image,
}

impl OutputKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputKind::Video => "video/mp4",
            OutputKind::Image => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::Video => "mp4",
            OutputKind::Image => "png",
        }
    }
}

/// Structured result handed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<OutputKind>,
    pub logs: String,
    pub stderr: String,
}

impl RenderOutcome {
    pub fn success(path: String, kind: OutputKind, logs: String, stderr: String) -> Self {
        Self {
            success: true,
            error: None,
            output_path: Some(path),
            output_type: Some(kind),
            logs,
            stderr,
        }
    }

    pub fn failure(error: String, logs: String, stderr: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            output_path: None,
            output_type: None,
            logs,
            stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> RenderRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults() {
        let req = request(r#"{"code": "x = 1"}"#);
        assert_eq!(req.scene_name, "GeneratedScene");
        assert_eq!(req.resolution(), Resolution::P720);
        assert_eq!(req.aspect_ratio(), AspectRatio::Wide16x9);
        assert_eq!(req.style(), Style::Auto);
        assert_eq!(req.duration, 8);
    }

    #[test]
    fn test_missing_code_is_representable() {
        let req = request(r#"{"scene_name": "Demo"}"#);
        assert!(req.code.is_none());
    }

    #[test]
    fn test_portrait_720p_dimensions() {
        // Scenario D: 720p at 9:16 → 405x720
        let req = request(r#"{"code": "", "resolution": "720p", "aspect_ratio": "9:16"}"#);
        assert_eq!(req.dimensions(), (405, 720));
        assert_eq!(req.resolution_arg(), "405x720");
    }

    #[test]
    fn test_wide_1080p_dimensions() {
        let req = request(r#"{"code": "", "resolution": "1080p", "aspect_ratio": "16:9"}"#);
        assert_eq!(req.dimensions(), (1920, 1080));
        assert_eq!(req.resolution().quality_flag(), "-qk");
    }

    #[test]
    fn test_square_dimensions() {
        let req = request(r#"{"code": "", "resolution": "480p", "aspect_ratio": "1:1"}"#);
        assert_eq!(req.dimensions(), (480, 480));
        assert_eq!(req.resolution().quality_flag(), "-ql");
    }

    #[test]
    fn test_unknown_knobs_fall_back() {
        let req = request(r#"{"code": "", "resolution": "4320p", "aspect_ratio": "2:1", "style": "vaporwave"}"#);
        assert_eq!(req.resolution(), Resolution::P720);
        assert_eq!(req.aspect_ratio(), AspectRatio::Wide16x9);
        assert_eq!(req.style(), Style::Auto);
    }

    #[test]
    fn test_style_background_mapping() {
        assert_eq!(Style::Dark.background_color(), Some("BLACK"));
        assert_eq!(Style::Cinematic.background_color(), Some("BLACK"));
        assert_eq!(Style::Clean.background_color(), Some("WHITE"));
        assert_eq!(Style::Auto.background_color(), None);
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let out = RenderOutcome::failure("boom".into(), String::new(), String::new());
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("output_path").is_none());
    }
}
