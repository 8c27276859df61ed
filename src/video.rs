use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Container-level metadata read with ffprobe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub format: String,
    pub file_size: u64,
}

/// Video operations backed by ffmpeg/ffprobe subprocesses.
#[derive(Debug, Clone, Default)]
pub struct VideoProcessor;

impl VideoProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Extract a segment of the video without re-encoding.
    ///
    /// `start` and `duration` take the formats ffmpeg accepts
    /// (`HH:MM:SS` or plain seconds).
    pub async fn extract_clip(
        &self,
        input: &Path,
        start: &str,
        duration: &str,
        output: &Path,
    ) -> Result<()> {
        ensure_input_exists(input)?;

        info!("✂️ Extracting clip from {}", input.display());

        let status = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args(["-ss", start, "-t", duration, "-c", "copy", "-y"])
            .arg(output)
            .status()
            .await
            .context("failed to run ffmpeg")?;

        if !status.success() {
            return Err(anyhow!("clip extraction failed for {}", input.display()));
        }

        info!("✅ Clip extracted: {}", output.display());
        Ok(())
    }

    /// Shift the pitch of a video's audio track and adjust its volume,
    /// copying the video stream untouched.
    pub async fn enhance_audio(
        &self,
        input: &Path,
        output: &Path,
        pitch_semitones: f64,
        db_gain: f64,
    ) -> Result<()> {
        ensure_input_exists(input)?;

        info!(
            "🔧 Enhancing audio in {} (pitch {:+.1} semitones, gain {:+.1} dB)",
            input.display(),
            pitch_semitones,
            db_gain
        );

        // asetrate shifts the pitch, atempo compensates the speed change
        let rate_factor = 2f64.powf(pitch_semitones / 12.0);
        let filter = format!(
            "asetrate=44100*{rate_factor},atempo=1/{rate_factor},volume={db_gain}dB"
        );

        let status = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args(["-vcodec", "copy", "-af", &filter, "-y"])
            .arg(output)
            .status()
            .await
            .context("failed to run ffmpeg")?;

        if !status.success() {
            return Err(anyhow!("audio enhancement failed for {}", input.display()));
        }

        info!("✅ Audio enhanced: {}", output.display());
        Ok(())
    }

    /// Compress and convert to WebM (VP9 video, Opus audio) for web
    /// playback. The fixed settings trade quality for a roughly 10x
    /// smaller file.
    pub async fn convert_to_webm(&self, input: &Path, output: &Path) -> Result<()> {
        ensure_input_exists(input)?;

        info!("🎬 Converting {} to WebM", input.display());

        let status = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args([
                "-c:v", "libvpx-vp9",
                "-b:v", "600K",
                "-crf", "60",
                "-cpu-used", "8",
                "-vf", "scale=1280:720",
                "-c:a", "libopus",
                "-b:a", "128k",
                "-y",
            ])
            .arg(output)
            .status()
            .await
            .context("failed to run ffmpeg")?;

        if !status.success() {
            return Err(anyhow!("WebM conversion failed for {}", input.display()));
        }

        info!("✅ WebM written: {}", output.display());
        Ok(())
    }

    /// Mux a subtitle file into a WebM video as a default-on WebVTT track.
    /// The subtitle file is treated as opaque; ffmpeg handles conversion.
    pub async fn embed_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> Result<()> {
        ensure_input_exists(video)?;
        if !subtitles.exists() {
            return Err(anyhow!("subtitle file not found: {}", subtitles.display()));
        }

        info!(
            "💬 Embedding subtitles {} into {}",
            subtitles.display(),
            video.display()
        );

        let status = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(subtitles)
            .args([
                "-c:v", "copy",
                "-c:a", "copy",
                "-c:s", "webvtt",
                "-disposition:s:0", "default",
                "-metadata:s:s:0", "language=eng",
                "-y",
            ])
            .arg(output)
            .status()
            .await
            .context("failed to run ffmpeg")?;

        if !status.success() {
            return Err(anyhow!(
                "subtitle embedding failed for {}",
                video.display()
            ));
        }

        info!("✅ Subtitled video written: {}", output.display());
        Ok(())
    }

    /// Read container metadata with ffprobe.
    pub async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let output = tokio::process::Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .await
            .context("failed to run ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", path.display()));
        }

        let data: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        let format = &data["format"];

        let duration_seconds: f64 = format["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let file_size = tokio::fs::metadata(path).await?.len();

        Ok(MediaInfo {
            path: path.to_path_buf(),
            duration: Duration::from_secs_f64(duration_seconds),
            format: format["format_name"].as_str().unwrap_or("unknown").to_string(),
            file_size,
        })
    }
}

pub(crate) fn ensure_input_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("input file not found: {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_is_rejected() {
        let err = ensure_input_exists(Path::new("/nonexistent/video.mp4")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
