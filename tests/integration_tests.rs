use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use clipscribe::{
    ChatMessage, Chunker, Config, CorrectionConfig, LanguageModel, LlmError, LlmResponse,
    Pipeline, TranscriptCorrector,
};

/// Stub correction service that answers each call with the next reply in
/// its script.
struct ScriptedModel {
    replies: std::sync::Mutex<std::collections::VecDeque<String>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: std::sync::Mutex::new(
                replies.iter().map(|r| r.to_string()).collect(),
            ),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn chat(&self, _messages: Vec<ChatMessage>) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("stub script exhausted");
        Ok(LlmResponse {
            content,
            tokens_used: Some(42),
        })
    }
}

/// A word that cl100k_base encodes as a single token, with and without a
/// leading space. Repeating it gives texts with known token counts.
fn words(n: usize) -> String {
    let mut text = String::with_capacity(n * 4);
    for i in 0..n {
        if i > 0 {
            text.push(' ');
        }
        text.push_str("the");
    }
    text
}

fn fast_correction_config() -> CorrectionConfig {
    CorrectionConfig {
        token_limit: 12,
        token_buffer: 2,
        initial_wait_secs: 0,
        inter_chunk_delay_secs: 0,
        ..CorrectionConfig::default()
    }
}

#[test]
fn test_chunker_round_trip_preserves_text() {
    let chunker = Chunker::new().unwrap();
    let text = "1\n00:00:01,000 --> 00:00:03,500\nHello and welcome back.\n\n2\n00:00:03,500 --> 00:00:07,000\nToday we look at linked open data.\n";

    for max_tokens in [2, 5, 64] {
        let chunks = chunker.chunk(text, max_tokens).unwrap();
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunker.count_tokens(chunk) <= max_tokens);
        }
    }
}

#[test]
fn test_large_transcript_splits_at_effective_budget() {
    // Mirrors a ~25k-token transcript against the default 16000-token
    // limit with its 200-token safety buffer.
    let chunker = Chunker::new().unwrap();
    let text = words(25_000);
    let total = chunker.count_tokens(&text);
    assert!(total > 15_800, "test text too small: {total} tokens");

    let chunks = chunker.chunk(&text, 15_800).unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunker.count_tokens(&chunks[0]), 15_800);
    assert_eq!(chunker.count_tokens(&chunks[1]), total - 15_800);
}

#[tokio::test]
async fn test_corrected_chunks_are_joined_in_order() {
    let model = ScriptedModel::new(&["first part corrected", "second part corrected"]);
    let calls = model.counter();
    let corrector =
        TranscriptCorrector::new(fast_correction_config(), Box::new(model)).unwrap();

    // 15 single-token words against a 10-token effective budget: two
    // chunks, processed strictly in order.
    let result = corrector.correct(&words(15)).await.unwrap();

    assert_eq!(result.chunks_total, 2);
    assert_eq!(result.chunks_failed, 0);
    assert_eq!(result.text, "first part corrected\nsecond part corrected");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_correct_transcript_file_round_trip() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("raw.txt");
    let output = temp.path().join("corrected").join("raw.txt");
    tokio::fs::write(&input, "helo wrold this needs fixing")
        .await
        .unwrap();

    let model = ScriptedModel::new(&["hello world this needs fixing"]);
    let corrector = TranscriptCorrector::new(
        CorrectionConfig {
            initial_wait_secs: 0,
            inter_chunk_delay_secs: 0,
            ..CorrectionConfig::default()
        },
        Box::new(model),
    )
    .unwrap();

    let result = corrector
        .correct_transcript_file(&input, &output)
        .await
        .unwrap();

    assert!(result.is_complete());
    let written = tokio::fs::read_to_string(&output).await.unwrap();
    assert_eq!(written, "hello world this needs fixing");
}

#[tokio::test]
async fn test_missing_input_produces_no_output() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("does-not-exist.txt");
    let output = temp.path().join("corrected.txt");

    let model = ScriptedModel::new(&[]);
    let corrector = TranscriptCorrector::new(
        CorrectionConfig::default(),
        Box::new(model),
    )
    .unwrap();

    let err = corrector
        .correct_transcript_file(&input, &output)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("failed to read transcript"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_batch_continues_past_failing_files() {
    let temp = TempDir::new().unwrap();
    let input_dir = temp.path().join("input");
    tokio::fs::create_dir_all(&input_dir).await.unwrap();
    // Two invalid videos: every stage fails, but the batch still visits
    // both and reports per-file outcomes.
    tokio::fs::write(input_dir.join("a.mp4"), b"not a video")
        .await
        .unwrap();
    tokio::fs::write(input_dir.join("b.mp4"), b"also not a video")
        .await
        .unwrap();

    let mut config = Config::default();
    config.output.base_dir = temp.path().join("out");
    config.stages.correct = false;
    tokio::fs::create_dir_all(&config.output.base_dir)
        .await
        .unwrap();

    let pipeline = Pipeline::new(config).unwrap();
    let summary = pipeline.run_batch(&input_dir).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.successful, 0);
    for outcome in &summary.outcomes {
        assert!(outcome.error.is_some());
    }
}

#[test]
fn test_pipeline_requires_credentials_for_correction() {
    let mut config = Config::default();
    config.llm.api_key_env = "CLIPSCRIBE_KEY_THAT_IS_DEFINITELY_NOT_SET".to_string();
    assert!(config.stages.correct);

    match Pipeline::new(config) {
        Ok(_) => panic!("pipeline built without credentials"),
        Err(err) => assert!(err.to_string().contains("credentials")),
    }
}

#[test]
fn test_config_file_loading() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clipscribe.toml");
    std::fs::write(
        &path,
        r#"
        [correction]
        max_retries = 5

        [transcription]
        model = "medium"
        "#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.correction.max_retries, 5);
    assert_eq!(config.transcription.model, "medium");
    assert_eq!(config.correction.token_limit, 16000);

    assert!(Config::from_file(Path::new("/nonexistent/clipscribe.toml")).is_err());
}
