//! Artifact upload
//!
//! A single synchronous PUT of the rendered file to a caller-supplied
//! presigned URL. Upload failure never invalidates the render: the caller
//! gets the local path either way.

use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::RenderError;
use crate::request::OutputKind;

/// PUT the artifact to `url` with its content type and length. Returns the
/// HTTP status on success.
pub fn upload_artifact(path: &Path, kind: OutputKind, url: &str) -> Result<u16, RenderError> {
    let bytes = fs::read(path)
        .map_err(|e| RenderError::Upload(format!("read {}: {}", path.display(), e)))?;
    let len = bytes.len();

    info!(path = %path.display(), bytes = len, "uploading artifact");
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| RenderError::Upload(e.to_string()))?;

    let response = client
        .put(url)
        .header(reqwest::header::CONTENT_TYPE, kind.content_type())
        .header(reqwest::header::CONTENT_LENGTH, len)
        .body(bytes)
        .send()
        .map_err(|e| RenderError::Upload(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "upload rejected");
        return Err(RenderError::Upload(format!(
            "upload returned status {}",
            status.as_u16()
        )));
    }

    info!(status = status.as_u16(), "upload complete");
    Ok(status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_upload_error() {
        let err = upload_artifact(
            Path::new("/nonexistent/out.mp4"),
            OutputKind::Video,
            "http://127.0.0.1:1/put",
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Upload(_)));
    }
}
