use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::audio::AudioExtractor;
use crate::config::Config;
use crate::llm::{ChatCompletionsClient, TranscriptCorrector};
use crate::transcription::WhisperTranscriber;
use crate::video::{ensure_input_exists, VideoProcessor};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v"];

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    ExtractClip,
    EnhanceAudio,
    ConvertWebm,
    ExtractAudio,
    AmplifyAudio,
    Transcribe,
    Correct,
    EmbedSubtitles,
}

/// Output tree for one input video, mirroring the layout the stages
/// expect from each other.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    pub video_dir: PathBuf,
    pub webm_dir: PathBuf,
    pub subtitled_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub transcripts_dir: PathBuf,

    pub clip_file: PathBuf,
    pub enhanced_video_file: PathBuf,
    pub webm_file: PathBuf,
    pub subtitled_file: PathBuf,
    pub audio_file: PathBuf,
    pub amplified_audio_file: PathBuf,
    pub raw_txt_file: PathBuf,
    pub raw_srt_file: PathBuf,
    pub corrected_txt_file: PathBuf,
    pub corrected_srt_file: PathBuf,
}

impl PipelinePaths {
    pub fn new(output_root: &Path, input: &Path) -> Result<Self> {
        let stem = input
            .file_stem()
            .ok_or_else(|| anyhow!("invalid input filename: {}", input.display()))?
            .to_string_lossy()
            .to_string();
        let extension = input
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp4");

        let video_dir = output_root.join("video");
        let webm_dir = video_dir.join("webm");
        let subtitled_dir = webm_dir.join("subtitled");
        let audio_dir = output_root.join("audio");
        let transcripts_dir = audio_dir.join("transcripts");
        let corrected_dir = transcripts_dir.join("corrected");

        Ok(Self {
            clip_file: video_dir.join(format!("{stem}-clipped.{extension}")),
            enhanced_video_file: video_dir.join(format!("{stem}-enhanced.{extension}")),
            webm_file: webm_dir.join(format!("{stem}.webm")),
            subtitled_file: subtitled_dir.join(format!("{stem}.webm")),
            audio_file: audio_dir.join(format!("{stem}.mp3")),
            amplified_audio_file: audio_dir.join(format!("{stem}-amplified.mp3")),
            raw_txt_file: transcripts_dir.join("raw").join("txt").join(format!("{stem}.txt")),
            raw_srt_file: transcripts_dir.join("raw").join("srt").join(format!("{stem}.srt")),
            corrected_txt_file: corrected_dir.join("txt").join(format!("{stem}.txt")),
            corrected_srt_file: corrected_dir.join("srt").join(format!("{stem}.srt")),
            video_dir,
            webm_dir,
            subtitled_dir,
            audio_dir,
            transcripts_dir,
        })
    }

    pub async fn create_dirs(&self) -> Result<()> {
        for dir in [
            &self.video_dir,
            &self.subtitled_dir,
            &self.audio_dir,
            &self.transcripts_dir,
        ] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

/// Result of running the pipeline on one input file.
///
/// Never an error: failures are captured in `error` so a batch caller can
/// keep going.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub stages_completed: Vec<Stage>,
    /// Correction chunks degraded to placeholders, if any.
    pub chunks_failed: usize,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Batch results over a directory of videos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub outcomes: Vec<FileOutcome>,
}

/// Runs the enabled stages over input videos, one file at a time.
pub struct Pipeline {
    config: Config,
    video: VideoProcessor,
    audio: AudioExtractor,
    transcriber: WhisperTranscriber,
    corrector: Option<TranscriptCorrector>,
}

impl Pipeline {
    /// Build the pipeline. When the correction stage is enabled this
    /// resolves credentials immediately, so a missing API key fails here
    /// rather than mid-run.
    pub fn new(config: Config) -> Result<Self> {
        let corrector = if config.stages.correct {
            let client = ChatCompletionsClient::new(config.llm.clone())
                .context("correction stage requires valid credentials")?;
            Some(TranscriptCorrector::new(
                config.correction.clone(),
                Box::new(client),
            )?)
        } else {
            None
        };

        Ok(Self {
            video: VideoProcessor::new(),
            audio: AudioExtractor::new(),
            transcriber: WhisperTranscriber::new(config.transcription.clone()),
            corrector,
            config,
        })
    }

    /// Run all enabled stages on one video. Failures are contained in the
    /// returned outcome.
    pub async fn run_file(&self, input: &Path) -> FileOutcome {
        let started = Instant::now();
        let mut completed = Vec::new();
        let mut chunks_failed = 0usize;

        let result = self
            .process(input, &mut completed, &mut chunks_failed)
            .await;

        FileOutcome {
            input: input.to_path_buf(),
            stages_completed: completed,
            chunks_failed,
            elapsed: started.elapsed(),
            error: result.err().map(|err| format!("{err:#}")),
        }
    }

    async fn process(
        &self,
        input: &Path,
        completed: &mut Vec<Stage>,
        chunks_failed: &mut usize,
    ) -> Result<()> {
        ensure_input_exists(input)?;

        let paths = PipelinePaths::new(&self.config.output.base_dir, input)?;
        paths.create_dirs().await?;

        let media_info = self.video.probe(input).await?;
        info!(
            "🎞️ {} ({:.1}s, {:.1} MB)",
            input.display(),
            media_info.duration.as_secs_f64(),
            media_info.file_size as f64 / 1_000_000.0
        );

        let stages = &self.config.stages;
        let media = &self.config.media;

        if stages.extract_clip {
            self.video
                .extract_clip(input, &media.clip_start, &media.clip_duration, &paths.clip_file)
                .await?;
            completed.push(Stage::ExtractClip);
        }

        if stages.enhance_audio {
            self.video
                .enhance_audio(
                    input,
                    &paths.enhanced_video_file,
                    media.pitch_semitones,
                    media.db_gain,
                )
                .await?;
            completed.push(Stage::EnhanceAudio);
        }

        if stages.convert_webm {
            self.video.convert_to_webm(input, &paths.webm_file).await?;
            completed.push(Stage::ConvertWebm);
        }

        if stages.extract_audio {
            self.audio.extract_audio(input, &paths.audio_file).await?;
            completed.push(Stage::ExtractAudio);
        }

        if stages.amplify_audio {
            self.audio
                .amplify(
                    &paths.audio_file,
                    &paths.amplified_audio_file,
                    media.amplify_factor,
                )
                .await?;
            completed.push(Stage::AmplifyAudio);
        }

        if stages.transcribe {
            self.transcriber
                .transcribe(&paths.audio_file, &paths.transcripts_dir)
                .await?;
            completed.push(Stage::Transcribe);
        }

        if stages.correct {
            let corrector = self
                .corrector
                .as_ref()
                .ok_or_else(|| anyhow!("correction stage enabled without a corrector"))?;

            let outcome = corrector
                .correct_transcript_file(&paths.raw_txt_file, &paths.corrected_txt_file)
                .await?;
            *chunks_failed += outcome.chunks_failed;

            // The subtitle file gets the same treatment when present; the
            // prompt instructs the model to leave timestamps untouched.
            if paths.raw_srt_file.exists() {
                let outcome = corrector
                    .correct_transcript_file(&paths.raw_srt_file, &paths.corrected_srt_file)
                    .await?;
                *chunks_failed += outcome.chunks_failed;
            }
            completed.push(Stage::Correct);
        }

        if stages.embed_subtitles {
            let subtitles = if paths.corrected_srt_file.exists() {
                &paths.corrected_srt_file
            } else {
                &paths.raw_srt_file
            };
            self.video
                .embed_subtitles(&paths.webm_file, subtitles, &paths.subtitled_file)
                .await?;
            completed.push(Stage::EmbedSubtitles);
        }

        Ok(())
    }

    /// Run the pipeline over every video in a directory.
    ///
    /// Each file's outcome is independent: a failing file is reported in
    /// the summary and the batch moves on.
    pub async fn run_batch(&self, input_dir: &Path) -> Result<BatchSummary> {
        let started = Instant::now();
        let videos = discover_videos(input_dir)?;

        if videos.is_empty() {
            warn!("No videos found in {}", input_dir.display());
            return Ok(BatchSummary {
                total: 0,
                successful: 0,
                failed: 0,
                total_time: started.elapsed(),
                outcomes: Vec::new(),
            });
        }

        info!("📹 Found {} video(s) to process", videos.len());

        let mut outcomes = Vec::with_capacity(videos.len());
        for video in &videos {
            info!("🚀 Processing {}", video.display());
            let outcome = self.run_file(video).await;
            match &outcome.error {
                Some(err) => error!("❌ {} failed: {}", video.display(), err),
                None => info!(
                    "✅ {} done in {:.1}s",
                    video.display(),
                    outcome.elapsed.as_secs_f64()
                ),
            }
            outcomes.push(outcome);
        }

        let successful = outcomes.iter().filter(|o| o.succeeded()).count();
        let summary = BatchSummary {
            total: outcomes.len(),
            successful,
            failed: outcomes.len() - successful,
            total_time: started.elapsed(),
            outcomes,
        };

        let summary_path = self.config.output.base_dir.join("processing_summary.json");
        if let Err(err) = tokio::fs::write(&summary_path, serde_json::to_vec_pretty(&summary)?).await
        {
            warn!("Failed to write {}: {}", summary_path.display(), err);
        }

        Ok(summary)
    }
}

/// Find all video files under a directory, in stable order.
pub fn discover_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut videos: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    videos.sort();
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_output_layout() {
        let paths =
            PipelinePaths::new(Path::new("out"), Path::new("input/workshop.mp4")).unwrap();

        assert_eq!(paths.webm_file, Path::new("out/video/webm/workshop.webm"));
        assert_eq!(
            paths.subtitled_file,
            Path::new("out/video/webm/subtitled/workshop.webm")
        );
        assert_eq!(paths.audio_file, Path::new("out/audio/workshop.mp3"));
        assert_eq!(
            paths.raw_txt_file,
            Path::new("out/audio/transcripts/raw/txt/workshop.txt")
        );
        assert_eq!(
            paths.corrected_srt_file,
            Path::new("out/audio/transcripts/corrected/srt/workshop.srt")
        );
    }

    #[test]
    fn test_paths_keep_input_extension_for_video_outputs() {
        let paths = PipelinePaths::new(Path::new("out"), Path::new("talk.mkv")).unwrap();
        assert_eq!(paths.clip_file, Path::new("out/video/talk-clipped.mkv"));
        assert_eq!(
            paths.enhanced_video_file,
            Path::new("out/video/talk-enhanced.mkv")
        );
    }
}
