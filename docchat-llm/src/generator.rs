//! The answer-generation seam of the pipeline.

use crate::error::Result;
use async_trait::async_trait;

/// Trait for backends that turn an assembled prompt into an answer.
///
/// Implementations must tolerate an empty or very short context block in the
/// prompt: retrieval degrades to ungrounded generation when the index is
/// empty, and the generator still has to answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate text for `prompt`, producing at most `max_tokens` tokens.
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String>;

    /// Get the name/identifier of this generator
    fn generator_name(&self) -> &str;
}
