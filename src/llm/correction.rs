use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::chunker::Chunker;
use super::{ChatMessage, LanguageModel, LlmError};

const SYSTEM_PROMPT: &str = "You are an assistant that corrects raw audio transcripts.";

const USER_PREAMBLE: &str = "Below is part of a raw, uncorrected audio transcript. \
It may be plain text or an SRT subtitle file. If it is an SRT file, keep the \
formatting, structure, and every timestamp exactly as they are. Correct only \
surface errors in the transcript text: do not translate, do not paraphrase, do \
not interpret the content, and do not add headings or commentary. Return the \
corrected text and nothing else.";

/// Settings for the chunked correction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Maximum tokens per request.
    pub token_limit: usize,
    /// Reserved headroom for the request framing; the effective per-chunk
    /// budget is `token_limit - token_buffer`.
    pub token_buffer: usize,
    /// Attempts per chunk before giving up on it.
    pub max_retries: u32,
    /// Wait before the first retry, in seconds.
    pub initial_wait_secs: u64,
    /// Multiplier applied to the wait on each further retry.
    pub backoff_factor: u32,
    /// Pause between chunks to pace requests, in seconds.
    pub inter_chunk_delay_secs: u64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            token_limit: 16000,
            token_buffer: 200,
            max_retries: 3,
            initial_wait_secs: 5,
            backoff_factor: 2,
            inter_chunk_delay_secs: 10,
        }
    }
}

/// Outcome for one chunk: its corrected text, or exhausted retries under
/// rate limiting.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    Corrected(String),
    Failed,
}

/// Result of a completed correction run.
///
/// A run can complete with some chunks degraded to placeholders; a run that
/// aborts entirely returns an error instead and produces no transcript.
#[derive(Debug, Clone)]
pub struct CorrectedTranscript {
    /// Per-chunk results joined in order by a line separator.
    pub text: String,
    pub chunks_total: usize,
    pub chunks_failed: usize,
}

impl CorrectedTranscript {
    pub fn is_complete(&self) -> bool {
        self.chunks_failed == 0
    }
}

/// Pushes a long transcript through the correction service chunk by chunk.
///
/// Strictly sequential: one request in flight, a fixed pacing delay between
/// chunks, exponential backoff within a chunk's retries.
pub struct TranscriptCorrector {
    model: Box<dyn LanguageModel>,
    chunker: Chunker,
    config: CorrectionConfig,
}

impl TranscriptCorrector {
    pub fn new(config: CorrectionConfig, model: Box<dyn LanguageModel>) -> Result<Self> {
        if config.token_limit <= config.token_buffer {
            bail!(
                "token limit {} must exceed the token buffer {}",
                config.token_limit,
                config.token_buffer
            );
        }
        Ok(Self {
            model,
            chunker: Chunker::new()?,
            config,
        })
    }

    /// Correct a full transcript.
    ///
    /// Chunks that exhaust their retries under rate limiting are replaced
    /// by a visible placeholder and the run continues; any other failure
    /// that exhausts its retries aborts the run.
    pub async fn correct(&self, transcript: &str) -> Result<CorrectedTranscript> {
        let max_tokens = self.config.token_limit - self.config.token_buffer;
        let chunks = self.chunker.chunk(transcript, max_tokens)?;
        let total = chunks.len();

        let mut corrected: Vec<String> = Vec::with_capacity(total);
        let mut failed = 0usize;

        for (index, chunk) in chunks.iter().enumerate() {
            info!("📝 Correcting chunk {}/{}", index + 1, total);

            match self.correct_chunk(index, total, chunk).await? {
                ChunkOutcome::Corrected(text) => corrected.push(text),
                ChunkOutcome::Failed => {
                    corrected.push(sentinel(index));
                    failed += 1;
                }
            }

            if index + 1 < total {
                debug!(
                    "Waiting {}s before processing the next chunk",
                    self.config.inter_chunk_delay_secs
                );
                sleep(Duration::from_secs(self.config.inter_chunk_delay_secs)).await;
            }
        }

        if failed > 0 {
            warn!(
                "⚠️ Corrected transcript is degraded: {}/{} chunk(s) replaced by placeholders",
                failed, total
            );
        } else {
            info!("✅ Full corrected transcript completed successfully");
        }

        Ok(CorrectedTranscript {
            text: corrected.join("\n"),
            chunks_total: total,
            chunks_failed: failed,
        })
    }

    /// Correct one chunk with bounded retry.
    ///
    /// `Ok(ChunkOutcome)` covers both success and the rate-limit degraded
    /// case; `Err` means the run must abort.
    async fn correct_chunk(&self, index: usize, total: usize, chunk: &str) -> Result<ChunkOutcome> {
        let mut attempts = 0u32;

        loop {
            match self.model.chat(self.build_messages(chunk)).await {
                Ok(response) => {
                    debug!(
                        "Chunk {}/{} corrected (tokens used: {:?})",
                        index + 1,
                        total,
                        response.tokens_used
                    );
                    return Ok(ChunkOutcome::Corrected(response.content));
                }
                Err(LlmError::RateLimited(message)) => {
                    attempts += 1;
                    if attempts >= self.config.max_retries {
                        error!(
                            "Failed to correct chunk {}/{} after {} attempts due to rate limiting",
                            index + 1,
                            total,
                            attempts
                        );
                        return Ok(ChunkOutcome::Failed);
                    }
                    let wait = self.backoff_wait(attempts);
                    warn!(
                        "Rate limit hit for chunk {}/{} (attempt {}), waiting {}s before retrying: {}",
                        index + 1,
                        total,
                        attempts,
                        wait.as_secs(),
                        message
                    );
                    sleep(wait).await;
                }
                Err(err) => {
                    attempts += 1;
                    if attempts >= self.config.max_retries {
                        error!(
                            "Failed to correct chunk {}/{} after {} attempts: {}",
                            index + 1,
                            total,
                            attempts,
                            err
                        );
                        return Err(anyhow!(
                            "correction aborted at chunk {}/{} after {} attempts: {}",
                            index + 1,
                            total,
                            attempts,
                            err
                        ));
                    }
                    let wait = self.backoff_wait(attempts);
                    warn!(
                        "Error correcting chunk {}/{} (attempt {}), waiting {}s before retrying: {}",
                        index + 1,
                        total,
                        attempts,
                        wait.as_secs(),
                        err
                    );
                    sleep(wait).await;
                }
            }
        }
    }

    /// Wait before retry number `attempt` (1-based):
    /// `initial_wait * backoff_factor^(attempt - 1)`.
    fn backoff_wait(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.config.backoff_factor).pow(attempt - 1);
        Duration::from_secs(self.config.initial_wait_secs * factor)
    }

    fn build_messages(&self, chunk: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("{}\n\n{}", USER_PREAMBLE, chunk)),
        ]
    }

    /// Read a raw transcript, correct it, and write the result.
    ///
    /// Failures here are terminal for this file only; callers processing a
    /// batch report them and continue with the next file. An input that
    /// cannot be read produces no output at all.
    pub async fn correct_transcript_file(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<CorrectedTranscript> {
        let raw = tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("failed to read transcript {}", input.display()))?;

        let result = self
            .correct(&raw)
            .await
            .with_context(|| format!("failed to correct transcript {}", input.display()))?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &result.text)
            .await
            .with_context(|| format!("failed to save corrected transcript {}", output.display()))?;

        info!("💾 Corrected transcript saved: {}", output.display());
        Ok(result)
    }
}

/// Placeholder stored for a chunk whose retries were exhausted. Kept
/// visible in the output so a degraded transcript is recognizable.
fn sentinel(index: usize) -> String {
    format!("Error: Chunk {} could not be processed.", index + 1)
}
