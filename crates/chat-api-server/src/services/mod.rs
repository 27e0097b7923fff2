pub mod gemini;
pub mod memory;
pub mod orchestrator;

pub use gemini::GeminiClient;
pub use memory::ConversationMemory;
pub use orchestrator::{ChatOrchestrator, LlmProvider, StreamEvent};
