//! clipscribe - subtitled web-clip pipeline
//!
//! Converts a recorded video into a subtitled, web-optimized clip: ffmpeg
//! handles the media processing, Whisper transcribes the audio, and a
//! language model corrects the raw transcript chunk by chunk before the
//! subtitles are embedded.

pub mod audio;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod transcription;
pub mod video;

// Re-export main types for easy access
pub use crate::audio::AudioExtractor;
pub use crate::config::{Config, MediaConfig, OutputConfig, StageConfig};
pub use crate::llm::{
    ChatCompletionsClient, ChatMessage, Chunker, CorrectedTranscript, CorrectionConfig,
    LanguageModel, LlmConfig, LlmError, LlmResponse, TranscriptCorrector,
};
pub use crate::pipeline::{BatchSummary, FileOutcome, Pipeline, PipelinePaths, Stage};
pub use crate::transcription::{TranscriptFormat, TranscriptionConfig, WhisperTranscriber};
pub use crate::video::{MediaInfo, VideoProcessor};
