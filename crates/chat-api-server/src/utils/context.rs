use uuid::Uuid;

/// Request-scoped context, created once per incoming request and passed
/// explicitly down the call chain so log lines from concurrent streams
/// stay attributable.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
