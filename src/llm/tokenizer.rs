use anyhow::{Context, Result};
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Token measurement and exact encode/decode over the cl100k_base BPE.
///
/// The chunk budget is denominated in these tokens, and chunk boundaries
/// are cut on them, so the same encoding must be used for both counting
/// and reconstruction.
pub struct Tokenizer {
    bpe: CoreBPE,
}

impl Tokenizer {
    pub fn new() -> Result<Self> {
        let bpe = cl100k_base().context("failed to load cl100k_base encoding")?;
        Ok(Self { bpe })
    }

    /// Number of tokens in the text.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Encode text into its token stream.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        self.bpe.encode_ordinary(text)
    }

    /// Decode a token sequence back into text.
    ///
    /// Fails if the sequence ends mid-character; token sequences produced
    /// by `encode` always decode, but arbitrary sub-slices may not.
    pub fn decode(&self, tokens: Vec<usize>) -> Result<String> {
        self.bpe
            .decode(tokens)
            .context("failed to decode token sequence")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_matches_encode_len() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "The quick brown fox jumps over the lazy dog.";
        assert_eq!(tokenizer.count(text), tokenizer.encode(text).len());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "1\n00:00:01,000 --> 00:00:04,000\nWelcome to the workshop.\n";
        let tokens = tokenizer.encode(text);
        assert_eq!(tokenizer.decode(tokens).unwrap(), text);
    }

    #[test]
    fn test_empty_text_has_no_tokens() {
        let tokenizer = Tokenizer::new().unwrap();
        assert_eq!(tokenizer.count(""), 0);
    }
}
