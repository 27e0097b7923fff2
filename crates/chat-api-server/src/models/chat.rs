use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// ===== MESSAGE MODELS =====

/// Who produced a message. Stored verbatim in the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One conversation entry, immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(custom(function = validate_session_id))]
    pub session_id: String,

    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

/// The one rule for session ids, shared by the request body and the
/// path parameter: 1-100 characters, alphanumeric plus `-` and `_`.
/// The charset is ASCII-only, so byte and character lengths agree.
pub fn validate_session_id(value: &str) -> Result<(), ValidationError> {
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::new("session_id").with_message(
            "session_id must contain only alphanumeric characters, hyphens, and underscores"
                .into(),
        ));
    }

    if value.is_empty() || value.len() > 100 {
        return Err(
            ValidationError::new("session_id")
                .with_message("session_id must be between 1 and 100 characters".into()),
        );
    }

    Ok(())
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub endpoints: ServiceEndpoints,
}

#[derive(Debug, Serialize)]
pub struct ServiceEndpoints {
    pub health: String,
    pub chat: String,
}
