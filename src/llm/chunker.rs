use anyhow::{bail, Result};
use tracing::{debug, info};

use super::tokenizer::Tokenizer;

/// Splits a transcript into chunks that fit a per-request token budget.
///
/// Chunk boundaries are purely token-based: a boundary can fall anywhere in
/// the text, including inside a subtitle timestamp. The correction prompt
/// instructs the model to preserve whatever structure each chunk carries.
pub struct Chunker {
    tokenizer: Tokenizer,
}

impl Chunker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tokenizer: Tokenizer::new()?,
        })
    }

    /// Number of tokens the full text measures.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    /// Split `text` into chunks of at most `max_tokens` tokens each.
    ///
    /// Greedy accumulation: when the buffer holds `max_tokens` tokens, the
    /// next token flushes it and becomes the first token of the following
    /// chunk. The final partial buffer is flushed as the last chunk.
    /// Concatenating the chunks reproduces the original token stream.
    pub fn chunk(&self, text: &str, max_tokens: usize) -> Result<Vec<String>> {
        if max_tokens == 0 {
            bail!("max_tokens must be at least 1");
        }

        let tokens = self.tokenizer.encode(text);
        info!("📏 Transcript measures {} tokens", tokens.len());

        let mut chunks = Vec::new();
        let mut current: Vec<usize> = Vec::new();

        for token in tokens {
            if current.len() < max_tokens {
                current.push(token);
            } else {
                chunks.push(self.tokenizer.decode(current)?);
                current = vec![token];
            }
        }

        if !current.is_empty() {
            chunks.push(self.tokenizer.decode(current)?);
        }

        debug!(
            "Split transcript into {} chunk(s) of at most {} tokens",
            chunks.len(),
            max_tokens
        );

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> Chunker {
        Chunker::new().unwrap()
    }

    #[test]
    fn test_short_text_yields_single_chunk() {
        let chunker = chunker();
        let text = "Welcome everyone to this workshop.";
        let chunks = chunker.chunk(text, 1000).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_chunks_respect_token_bound() {
        let chunker = chunker();
        let text = "the quick brown fox jumps over the lazy dog ".repeat(50);
        for chunk in chunker.chunk(&text, 7).unwrap() {
            assert!(chunker.count_tokens(&chunk) <= 7);
        }
    }

    #[test]
    fn test_round_trip_reproduces_token_stream() {
        let chunker = chunker();
        let text = "1\n00:00:01,000 --> 00:00:04,500\nSo today we will look at structured data.\n\n2\n00:00:04,500 --> 00:00:09,000\nLet's start with a short demonstration.\n";
        let original = chunker.tokenizer.encode(text);

        for max_tokens in [1, 3, 10, 1000] {
            let chunks = chunker.chunk(text, max_tokens).unwrap();
            let rejoined = chunks.concat();
            assert_eq!(chunker.tokenizer.encode(&rejoined), original);
            assert_eq!(rejoined, text);
        }
    }

    #[test]
    fn test_flush_carries_triggering_token() {
        let chunker = chunker();
        let text = "one two three four five six";
        let total = chunker.count_tokens(text);

        let chunks = chunker.chunk(text, 2).unwrap();
        // Every chunk except possibly the last is exactly full, and no
        // token is lost at the flush boundaries.
        let counts: Vec<usize> = chunks.iter().map(|c| chunker.count_tokens(c)).collect();
        for count in &counts[..counts.len() - 1] {
            assert_eq!(*count, 2);
        }
        assert_eq!(counts.iter().sum::<usize>(), total);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = chunker();
        assert!(chunker.chunk("", 10).unwrap().is_empty());
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        let chunker = chunker();
        assert!(chunker.chunk("some text", 0).is_err());
    }
}
