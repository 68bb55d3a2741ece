//! Adapter interfaces for external systems.
//!
//! The generation orchestrator talks to a text-generation service through
//! [`GenerationApi`]; [`AnthropicAdapter`] is the production implementation.

pub mod anthropic;

use anyhow::Result;
use async_trait::async_trait;

pub use anthropic::AnthropicAdapter;

/// Built-in system instruction for drafting posts
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You write short professional social posts about financial technology news.
Each post is based only on the source it is given. Lead with the concrete
development, add one sentence of informed perspective, and keep it under
200 words. Plain prose, no bullet lists, at most one emoji and three hashtags.
Do not invent facts, quotes or numbers that are not in the source.
Return only the post text.";

/// One call to a generation service: a system instruction plus 1..N sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub sources: Vec<String>,
    /// Separator the service must place between drafts when N > 1
    pub delimiter: String,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, sources: Vec<String>, delimiter: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            sources,
            delimiter: delimiter.into(),
        }
    }

    /// Check if this request carries more than one source
    pub fn is_batch(&self) -> bool {
        self.sources.len() > 1
    }

    /// The user turn sent alongside the system instruction
    pub fn user_message(&self) -> String {
        match self.sources.as_slice() {
            [single] => format!("Write one post based on this source:\n\n{}", single),
            many => {
                let mut message = format!(
                    "Write one post for each of the {} sources below, in the same order. \
                     Put a line containing only {} between consecutive posts. \
                     Do not number the posts or add any other text.",
                    many.len(),
                    self.delimiter
                );
                for (idx, source) in many.iter().enumerate() {
                    message.push_str(&format!("\n\n--- Source {} ---\n{}", idx + 1, source));
                }
                message
            }
        }
    }
}

/// Output from a generation call
#[derive(Debug, Clone)]
pub struct AdapterOutput {
    /// The text returned by the service
    pub content: String,

    /// Tokens used (if available)
    pub tokens_used: Option<u64>,
}

impl AdapterOutput {
    /// Create a new adapter output with just content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens_used: None,
        }
    }
}

/// A text-generation service.
///
/// `Err` means the call failed; a successful call whose text has the wrong
/// shape is still `Ok` and is judged by the caller.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Run one generation request
    async fn generate(&self, request: &GenerationRequest) -> Result<AdapterOutput>;
}
