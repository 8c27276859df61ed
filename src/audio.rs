use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::info;

use crate::video::ensure_input_exists;

/// Audio operations backed by ffmpeg subprocesses.
#[derive(Debug, Clone, Default)]
pub struct AudioExtractor;

impl AudioExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the audio track of a video into a standalone file. The
    /// output format follows the output extension (typically MP3).
    pub async fn extract_audio(&self, video: &Path, output: &Path) -> Result<()> {
        ensure_input_exists(video)?;

        info!("🎵 Extracting audio from {}", video.display());

        let status = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(video)
            .args(["-q:a", "0", "-map", "a", "-y"])
            .arg(output)
            .status()
            .await
            .context("failed to run ffmpeg")?;

        if !status.success() {
            return Err(anyhow!("audio extraction failed for {}", video.display()));
        }

        info!("✅ Audio extracted: {}", output.display());
        Ok(())
    }

    /// Amplify audio volume by a linear factor (1.5 = 150%).
    pub async fn amplify(&self, input: &Path, output: &Path, factor: f64) -> Result<()> {
        ensure_input_exists(input)?;

        info!("🔊 Amplifying {} by {:.2}x", input.display(), factor);

        let filter = format!("volume={factor}");
        let status = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args(["-filter:a", &filter, "-y"])
            .arg(output)
            .status()
            .await
            .context("failed to run ffmpeg")?;

        if !status.success() {
            return Err(anyhow!("audio amplification failed for {}", input.display()));
        }

        info!("✅ Amplified audio written: {}", output.display());
        Ok(())
    }
}
