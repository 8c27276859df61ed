use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::correction::CorrectionConfig;
use crate::llm::LlmConfig;
use crate::transcription::TranscriptionConfig;

const CONFIG_FILE: &str = "clipscribe.toml";

/// Top-level configuration for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Which pipeline stages run.
    pub stages: StageConfig,

    /// ffmpeg processing settings.
    pub media: MediaConfig,

    /// Speech-to-text settings.
    pub transcription: TranscriptionConfig,

    /// Correction service client settings.
    pub llm: LlmConfig,

    /// Chunking, retry, and pacing settings for transcript correction.
    pub correction: CorrectionConfig,

    /// Output locations.
    pub output: OutputConfig,
}

/// Per-stage enable flags, in pipeline order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Extract a short test clip before anything else.
    pub extract_clip: bool,
    /// Pitch/volume enhancement of the video's audio track.
    pub enhance_audio: bool,
    /// Compress and convert to WebM.
    pub convert_webm: bool,
    /// Extract the audio track to MP3.
    pub extract_audio: bool,
    /// Amplify the extracted audio.
    pub amplify_audio: bool,
    /// Transcribe the audio with Whisper.
    pub transcribe: bool,
    /// Correct the raw transcript with the language model.
    pub correct: bool,
    /// Embed subtitles into the WebM.
    pub embed_subtitles: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            extract_clip: false,
            enhance_audio: true,
            convert_webm: true,
            extract_audio: true,
            amplify_audio: false,
            transcribe: true,
            correct: true,
            embed_subtitles: true,
        }
    }
}

/// ffmpeg parameters for the media stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Test-clip start, `HH:MM:SS` or seconds.
    pub clip_start: String,
    /// Test-clip duration, `HH:MM:SS` or seconds.
    pub clip_duration: String,
    /// Pitch shift applied by the enhancement stage, in semitones.
    pub pitch_semitones: f64,
    /// Volume change applied by the enhancement stage, in dB.
    pub db_gain: f64,
    /// Linear gain applied by the amplification stage.
    pub amplify_factor: f64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            clip_start: "00:00:00".to_string(),
            clip_duration: "00:01:00".to_string(),
            pitch_semitones: -1.2,
            db_gain: 0.0,
            amplify_factor: 1.5,
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the generated output tree.
    pub base_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("output_files"),
        }
    }
}

impl Config {
    /// Load configuration from `clipscribe.toml` in the working directory,
    /// falling back to defaults when the file is absent.
    pub fn load() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.correction.token_limit, 16000);
        assert_eq!(config.correction.token_buffer, 200);
        assert_eq!(config.correction.max_retries, 3);
        assert_eq!(config.correction.initial_wait_secs, 5);
        assert_eq!(config.correction.backoff_factor, 2);
        assert_eq!(config.correction.inter_chunk_delay_secs, 10);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert!(config.stages.transcribe);
        assert!(!config.stages.extract_clip);
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let config: Config = toml::from_str(
            r#"
            [correction]
            inter_chunk_delay_secs = 3

            [llm]
            model = "gpt-4o-mini"

            [stages]
            enhance_audio = false
            "#,
        )
        .unwrap();

        assert_eq!(config.correction.inter_chunk_delay_secs, 3);
        assert_eq!(config.correction.token_limit, 16000);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(!config.stages.enhance_audio);
        assert!(config.stages.convert_webm);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let reparsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.correction.token_limit, config.correction.token_limit);
        assert_eq!(reparsed.llm.endpoint, config.llm.endpoint);
    }
}
