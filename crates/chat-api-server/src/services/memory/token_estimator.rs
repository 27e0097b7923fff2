use tiktoken_rs::CoreBPE;
use tracing::warn;

use crate::models::chat::ChatMessage;

/// Structural overhead charged per message on top of its role and
/// content tokens, mirroring the OpenAI chat-format accounting.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Token counter for conversation budgeting.
///
/// Uses the `cl100k_base` BPE when it loads; otherwise falls back to a
/// chars/4 approximation. The strategy is picked once at construction
/// and never switches per call.
pub struct TokenEstimator {
    bpe: Option<CoreBPE>,
}

impl TokenEstimator {
    pub fn new() -> Self {
        match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Self { bpe: Some(bpe) },
            Err(e) => {
                warn!(
                    "Failed to load cl100k_base encoder, using approximate token counting: {}",
                    e
                );
                Self { bpe: None }
            }
        }
    }

    /// Estimator that always uses the chars/4 approximation. Cheap and
    /// deterministic without an encoder; counts are approximate.
    pub fn approximate() -> Self {
        Self { bpe: None }
    }

    pub fn estimate(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => text.len() / 4,
        }
    }

    /// Tokens a single message contributes to a prompt: role + content
    /// plus the fixed structural overhead.
    pub fn message_tokens(&self, message: &ChatMessage) -> usize {
        self.estimate(message.role.as_str())
            + self.estimate(&message.content)
            + MESSAGE_OVERHEAD_TOKENS
    }

    pub fn messages_tokens(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(|m| self.message_tokens(m)).sum()
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert_eq!(TokenEstimator::new().estimate(""), 0);
        assert_eq!(TokenEstimator::approximate().estimate(""), 0);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let estimator = TokenEstimator::new();
        let text = "The quick brown fox jumps over the lazy dog";
        assert_eq!(estimator.estimate(text), estimator.estimate(text));
        assert!(estimator.estimate(text) > 0);
    }

    #[test]
    fn test_approximate_arithmetic() {
        let estimator = TokenEstimator::approximate();
        // Integer division: 10 chars -> 2 tokens, 3 chars -> 0.
        assert_eq!(estimator.estimate("aaaaaaaaaa"), 2);
        assert_eq!(estimator.estimate("abc"), 0);
    }

    #[test]
    fn test_message_tokens_include_overhead() {
        let estimator = TokenEstimator::approximate();
        // role "user" -> 1, content (8 chars) -> 2, overhead -> 4
        let msg = ChatMessage::user("12345678");
        assert_eq!(estimator.message_tokens(&msg), 7);
    }
}
