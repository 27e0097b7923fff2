use crate::models::chat::{ChatMessage, Role};

use super::token_estimator::TokenEstimator;

/// Trim a stored history down to a bounded view for the model.
///
/// Pure function: the stored sequence is never mutated, only the
/// returned view shrinks. System messages are always retained and moved
/// to the front of the output regardless of where they were interleaved;
/// conversation messages are dropped oldest-first, whole messages only.
///
/// A turn is one user message plus one assistant message, so `max_turns`
/// bounds the conversation portion to its last `max_turns * 2` entries
/// before any token trimming happens. `None` means unlimited for either
/// budget; `Some(0)` is taken literally and empties the conversation
/// portion, leaving only the system prefix.
pub fn prune_messages(
    messages: Vec<ChatMessage>,
    estimator: &TokenEstimator,
    max_tokens: Option<usize>,
    max_turns: Option<usize>,
) -> Vec<ChatMessage> {
    if messages.is_empty() {
        return messages;
    }

    let (mut system, mut conversation): (Vec<ChatMessage>, Vec<ChatMessage>) =
        messages.into_iter().partition(|m| m.role == Role::System);

    if let Some(turns) = max_turns {
        let cap = turns * 2;
        if conversation.len() > cap {
            conversation.drain(..conversation.len() - cap);
        }
    }

    if let Some(limit) = max_tokens {
        let mut total =
            estimator.messages_tokens(&system) + estimator.messages_tokens(&conversation);

        while total > limit && !conversation.is_empty() {
            let removed = conversation.remove(0);
            total -= estimator.message_tokens(&removed);
        }
    }

    system.append(&mut conversation);
    system
}
