pub mod whisper;

pub use whisper::{TranscriptionConfig, TranscriptFormat, WhisperTranscriber};
