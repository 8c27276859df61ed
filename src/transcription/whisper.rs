use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::video::ensure_input_exists;

/// Output formats requested from the transcriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    Txt,
    Srt,
    Tsv,
}

impl TranscriptFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TranscriptFormat::Txt => "txt",
            TranscriptFormat::Srt => "srt",
            TranscriptFormat::Tsv => "tsv",
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Whisper model name (e.g. `large-v2`).
    pub model: String,
    /// Language hint passed to the model.
    pub language: String,
    /// Formats copied into the raw transcript tree.
    pub formats: Vec<TranscriptFormat>,
    /// Upper bound on a single transcription run, in seconds.
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "large-v2".to_string(),
            language: "en".to_string(),
            formats: vec![
                TranscriptFormat::Txt,
                TranscriptFormat::Srt,
                TranscriptFormat::Tsv,
            ],
            timeout_secs: 3600,
        }
    }
}

/// Runs the Whisper CLI as a black-box transcriber.
///
/// The model writes its own output files; their contents are opaque to the
/// rest of the pipeline.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    config: TranscriptionConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self { config }
    }

    /// Check that the `whisper` command is on PATH.
    pub async fn is_available() -> bool {
        Command::new("whisper")
            .arg("--help")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Transcribe an audio file, placing each requested format under
    /// `<transcripts_dir>/raw/<format>/<stem>.<format>`.
    ///
    /// Returns the paths written, in the order of the configured formats.
    pub async fn transcribe(
        &self,
        audio: &Path,
        transcripts_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        ensure_input_exists(audio)?;

        let stem = audio
            .file_stem()
            .ok_or_else(|| anyhow!("invalid audio filename: {}", audio.display()))?
            .to_string_lossy()
            .to_string();

        info!(
            "🎤 Transcribing {} (model {}, language {})",
            audio.display(),
            self.config.model,
            self.config.language
        );

        // Whisper writes every format in one pass; the requested ones are
        // moved into the raw/<format>/ tree afterwards.
        let work_dir = transcripts_dir.join(format!("work_{stem}"));
        tokio::fs::create_dir_all(&work_dir).await?;

        let run = self.run_whisper(audio, &work_dir).await;
        if let Err(err) = run {
            let _ = tokio::fs::remove_dir_all(&work_dir).await;
            return Err(err);
        }

        let mut written = Vec::with_capacity(self.config.formats.len());
        for format in &self.config.formats {
            let ext = format.extension();
            let produced = work_dir.join(format!("{stem}.{ext}"));
            if !produced.exists() {
                warn!("Whisper produced no .{ext} output for {stem}");
                continue;
            }

            let format_dir = transcripts_dir.join("raw").join(ext);
            tokio::fs::create_dir_all(&format_dir).await?;
            let target = format_dir.join(format!("{stem}.{ext}"));
            tokio::fs::rename(&produced, &target)
                .await
                .with_context(|| format!("failed to move {} into place", produced.display()))?;

            info!("💾 Saved {} transcript: {}", ext, target.display());
            written.push(target);
        }

        let _ = tokio::fs::remove_dir_all(&work_dir).await;

        if written.is_empty() {
            return Err(anyhow!("no transcription output for {}", audio.display()));
        }

        Ok(written)
    }

    async fn run_whisper(&self, audio: &Path, output_dir: &Path) -> Result<()> {
        let mut cmd = Command::new("whisper");
        cmd.arg(audio)
            .args(["--model", &self.config.model])
            .args(["--language", &self.config.language])
            .args(["--output_format", "all"])
            .arg("--output_dir")
            .arg(output_dir);

        let mut child = cmd.spawn().context("failed to start whisper")?;

        let limit = Duration::from_secs(self.config.timeout_secs);
        let status = match timeout(limit, child.wait()).await {
            Ok(status) => status.context("whisper execution failed")?,
            Err(_) => {
                error!(
                    "⏰ Whisper timed out after {}s for {}",
                    self.config.timeout_secs,
                    audio.display()
                );
                let _ = child.kill().await;
                return Err(anyhow!(
                    "whisper timed out after {} seconds",
                    self.config.timeout_secs
                ));
            }
        };

        if !status.success() {
            return Err(anyhow!(
                "whisper failed with exit code {:?} for {}",
                status.code(),
                audio.display()
            ));
        }

        Ok(())
    }
}
