pub mod client;
pub mod completion;
pub mod types;

pub use client::classify_failure;
pub use completion::OpenAiCompletionClient;
