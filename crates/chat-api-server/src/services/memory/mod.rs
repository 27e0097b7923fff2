//! Conversation memory: durable per-session history with token- and
//! turn-bounded read views.

pub mod manager;
pub mod pruner;
pub mod store;
pub mod token_estimator;

pub use manager::ConversationMemory;
pub use store::{HistoryStore, MemoryError, RedisHistoryStore};
pub use token_estimator::TokenEstimator;
