//! Completion provider implementations

pub mod anthropic;
pub mod fallback;
pub mod openai;

pub use anthropic::AnthropicCompletionProvider;
pub use fallback::FallbackCompletionProvider;
pub use openai::OpenAiCompletionProvider;
