/*
 * This module provides utilities for token counting.
 * It defines an abstraction `TokenCounterOperations` for counting tokens in a
 * string, a provider abstraction `TokenCounterProviderOperations` that
 * acquires a counter for a named model, and concrete implementations:
 * `CoreTikTokenCounter` backed by the `tiktoken-rs` library and
 * `SimpleWhitespaceTokenCounter` for a basic word count.
 *
 * A counter is an expensive shared resource (the BPE table is large), so it
 * is acquired at most once per cost pass and shared read-only across all
 * concurrent leaf tasks. Acquisition failure is surfaced to the caller
 * instead of silently degrading: partial results under an inconsistent cost
 * model are worse than none.
 */
use std::sync::Arc;
use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base};

pub const DEFAULT_TOKEN_MODEL: &str = "cl100k_base";

#[derive(Debug)]
pub enum TokenizerError {
    UnknownModel(String),
    InitializationFailed { model: String, reason: String },
}

impl std::fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenizerError::UnknownModel(model) => {
                write!(f, "Unknown token model: {model}")
            }
            TokenizerError::InitializationFailed { model, reason } => {
                write!(f, "Failed to initialize token model {model}: {reason}")
            }
        }
    }
}

impl std::error::Error for TokenizerError {}

pub type Result<T> = std::result::Result<T, TokenizerError>;

/*
 * Defines the contract for a service that can count tokens in a given text
 * string. Implementations of this trait provide specific tokenization
 * strategies.
 */
pub trait TokenCounterOperations: Send + Sync {
    /*
     * Counts the number of tokens in the provided text.
     * The definition of a "token" depends on the underlying implementation.
     */
    fn count_tokens(&self, text: &str) -> usize;
}

/*
 * Acquires a token counter for a model identifier. Called once per cost
 * pass; the returned counter is shared across that pass's worker tasks.
 */
pub trait TokenCounterProviderOperations: Send + Sync {
    fn acquire(&self, model_identifier: &str) -> Result<Arc<dyn TokenCounterOperations>>;
}

/*
 * A concrete implementation of `TokenCounterOperations` that wraps a prebuilt
 * `tiktoken-rs` BPE. Construction happens in the provider so the expensive
 * table build runs once per pass, not once per file.
 */
pub struct CoreTikTokenCounter {
    bpe: CoreBPE,
}

impl TokenCounterOperations for CoreTikTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/*
 * A concrete implementation of `TokenCounterOperations` that estimates tokens
 * by counting words separated by whitespace. This is a very basic estimation,
 * useful when no BPE model applies and as a deterministic stand-in for tests.
 */
pub struct SimpleWhitespaceTokenCounter;

impl SimpleWhitespaceTokenCounter {
    pub fn new() -> Self {
        SimpleWhitespaceTokenCounter
    }
}

impl Default for SimpleWhitespaceTokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounterOperations for SimpleWhitespaceTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/*
 * The core provider. Recognized model identifiers: `cl100k_base` and
 * `o200k_base` (tiktoken BPE tables), plus `whitespace` for the word-count
 * estimator.
 */
pub struct CoreTokenCounterProvider {}

impl CoreTokenCounterProvider {
    pub fn new() -> Self {
        CoreTokenCounterProvider {}
    }
}

impl Default for CoreTokenCounterProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounterProviderOperations for CoreTokenCounterProvider {
    fn acquire(&self, model_identifier: &str) -> Result<Arc<dyn TokenCounterOperations>> {
        log::debug!("TokenCounterProvider: acquiring counter for model '{model_identifier}'");
        let bpe_result = match model_identifier {
            "cl100k_base" => cl100k_base(),
            "o200k_base" => o200k_base(),
            "whitespace" => return Ok(Arc::new(SimpleWhitespaceTokenCounter::new())),
            other => return Err(TokenizerError::UnknownModel(other.to_string())),
        };

        match bpe_result {
            Ok(bpe) => Ok(Arc::new(CoreTikTokenCounter { bpe })),
            Err(e) => Err(TokenizerError::InitializationFailed {
                model: model_identifier.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_whitespace_counter_empty_string() {
        let counter = SimpleWhitespaceTokenCounter::new();
        assert_eq!(counter.count_tokens(""), 0);
    }

    #[test]
    fn test_simple_whitespace_counter_multiple_words() {
        let counter = SimpleWhitespaceTokenCounter::new();
        assert_eq!(counter.count_tokens("hello world example"), 3);
        assert_eq!(counter.count_tokens("  hello   world  "), 2);
        assert_eq!(counter.count_tokens("hello\tworld\r\nexample"), 3);
    }

    #[test]
    fn test_provider_rejects_unknown_model() {
        let provider = CoreTokenCounterProvider::new();
        let result = provider.acquire("no_such_model");
        assert!(matches!(result, Err(TokenizerError::UnknownModel(_))));
    }

    #[test]
    fn test_provider_whitespace_model() {
        let provider = CoreTokenCounterProvider::new();
        let counter = provider.acquire("whitespace").unwrap();
        assert_eq!(counter.count_tokens("one two three"), 3);
    }

    #[test]
    fn test_provider_cl100k_counter_counts_simple_text() {
        let provider = CoreTokenCounterProvider::new();
        let counter = provider.acquire("cl100k_base").unwrap();
        // "hello world" is 2 tokens with cl100k_base.
        assert_eq!(counter.count_tokens("hello world"), 2);
        assert_eq!(counter.count_tokens(""), 0);
    }

    #[test]
    fn test_provider_counters_are_shareable_across_threads() {
        let provider = CoreTokenCounterProvider::new();
        let counter = provider.acquire("whitespace").unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let shared = counter.clone();
            handles.push(std::thread::spawn(move || {
                shared.count_tokens("a b c d")
            }));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 4);
        }
    }
}
