use std::pin::Pin;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GeminiConfig;
use crate::models::chat::ChatMessage;

use super::orchestrator::LlmProvider;

const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChoiceChunk>,
}

#[derive(Debug, Deserialize)]
struct ChoiceChunk {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Gemini client over the OpenAI-compatible chat completions endpoint.
/// Stateless across calls; each request carries the full message list.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|_| Client::new());

        info!("Initialized Gemini client with model: {}", config.model);
        Self { client, config }
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
        debug!("Starting chat stream with {} messages", messages.len());

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", GEMINI_OPENAI_BASE))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to call Gemini API: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error: {} - {}", status, body));
        }

        let stream = response.bytes_stream();

        // Parse the upstream SSE framing ("data: {json}\n\n") into plain
        // text deltas, one yield per network chunk. The terminator can
        // arrive in the same chunk as the last content delta, so the
        // accumulated delta is flushed first and the stream ends on the
        // following poll.
        let parsed_stream =
            futures::stream::unfold((stream, false), |(mut stream, done)| async move {
                use futures::StreamExt;

                if done {
                    return None;
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        let text = String::from_utf8_lossy(&bytes);
                        let (delta, done) = parse_sse_chunk(&text);

                        if done && delta.is_empty() {
                            None
                        } else {
                            Some((Ok(delta), (stream, done)))
                        }
                    }
                    Some(Err(e)) => Some((Err(anyhow!("Stream error: {}", e)), (stream, true))),
                    None => None,
                }
            });

        Ok(Box::pin(parsed_stream))
    }
}

/// Collect the content deltas from one network chunk of the upstream SSE
/// body. Returns the concatenated delta text and whether `data: [DONE]`
/// was seen; content preceding the terminator in the same chunk is kept.
fn parse_sse_chunk(text: &str) -> (String, bool) {
    let mut delta = String::new();

    for line in text.lines() {
        if let Some(json_str) = line.strip_prefix("data: ") {
            if json_str == "[DONE]" {
                return (delta, true);
            }

            if let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(json_str) {
                if let Some(content) = chunk.choices.first().and_then(|c| c.delta.content.as_ref())
                {
                    delta.push_str(content);
                }
            }
        }
    }

    (delta, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk_concatenates_deltas() {
        let chunk = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n";
        assert_eq!(parse_sse_chunk(chunk), ("Hello".to_string(), false));
    }

    #[test]
    fn test_final_delta_coalesced_with_terminator_is_kept() {
        let chunk =
            "data: {\"choices\":[{\"delta\":{\"content\":\"world\"}}]}\n\ndata: [DONE]\n\n";
        assert_eq!(parse_sse_chunk(chunk), ("world".to_string(), true));
    }

    #[test]
    fn test_terminator_alone() {
        assert_eq!(parse_sse_chunk("data: [DONE]\n\n"), (String::new(), true));
    }

    #[test]
    fn test_non_data_and_malformed_lines_are_skipped() {
        let chunk = ": keep-alive\n\ndata: not json\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n";
        assert_eq!(parse_sse_chunk(chunk), ("ok".to_string(), false));
    }
}
