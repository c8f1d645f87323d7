use crate::error::{Result, RetrievalError};
use crate::prompt::GroundingPrompt;
use async_trait::async_trait;
use futures_util::StreamExt;
use manualrag_vector_store::DEFAULT_BASE_URL;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest_eventsource::{Error as StreamError, Event, EventSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4.1-nano";

const STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Produces an answer for a grounding prompt, token by token.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &GroundingPrompt,
        on_token: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<()>;
}

/// Streaming client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiChatGenerator {
    pub fn new(credential: &str, base_url: &str, model: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", credential.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| RetrievalError::Generation("invalid credential".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(STREAM_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| RetrievalError::Generation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    /// `MANUALRAG_CHAT_MODEL` and `MANUALRAG_CHAT_BASE_URL` override the defaults.
    pub fn from_env(credential: &str) -> Result<Self> {
        let model = env_or("MANUALRAG_CHAT_MODEL", DEFAULT_CHAT_MODEL);
        let base_url = env_or("MANUALRAG_CHAT_BASE_URL", DEFAULT_BASE_URL);
        Self::new(credential, &base_url, model)
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[async_trait]
impl Generator for OpenAiChatGenerator {
    async fn generate(
        &self,
        prompt: &GroundingPrompt,
        on_token: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<()> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            stream: true,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.question,
                },
            ],
        };

        let request = self.client.post(&self.endpoint).json(&body);
        let mut events = EventSource::new(request)
            .map_err(|e| RetrievalError::Generation(format!("request failed: {e}")))?;

        while let Some(event) = events.next().await {
            let message = match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => message,
                Err(StreamError::StreamEnded) => break,
                Err(StreamError::InvalidStatusCode(status, resp)) => {
                    events.close();
                    let text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    return Err(RetrievalError::Generation(format!(
                        "chat completion failed ({status}): {text}"
                    )));
                }
                Err(err) => {
                    events.close();
                    return Err(RetrievalError::Generation(format!(
                        "stream interrupted: {err}"
                    )));
                }
            };

            match decode_message(&message.data) {
                Ok(StreamEvent::Token(token)) => on_token(&token),
                Ok(StreamEvent::Skip) => {}
                Ok(StreamEvent::Done) => break,
                Err(err) => {
                    events.close();
                    return Err(err);
                }
            }
        }

        // Without this the event source reconnects once the server closes the stream
        events.close();
        Ok(())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum StreamEvent {
    Token(String),
    Skip,
    Done,
}

/// Map the `data` of one stream message to the token it carries.
fn decode_message(data: &str) -> Result<StreamEvent> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(StreamEvent::Done);
    }
    let chunk: ChatChunk = serde_json::from_str(data)
        .map_err(|e| RetrievalError::Generation(format!("malformed stream chunk: {e}")))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map_or(StreamEvent::Skip, StreamEvent::Token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(s: &str) -> StreamEvent {
        StreamEvent::Token(s.to_string())
    }

    #[test]
    fn content_delta_becomes_token() {
        let events: Vec<StreamEvent> = [
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":"Hold"}}]}"#,
            r#"{"choices":[{"delta":{"content":" reset"}}]}"#,
            " [DONE] ",
        ]
        .iter()
        .map(|data| decode_message(data).unwrap())
        .collect();
        assert_eq!(
            events,
            vec![StreamEvent::Skip, token("Hold"), token(" reset"), StreamEvent::Done]
        );
    }

    #[test]
    fn only_first_choice_is_streamed() {
        let event = decode_message(
            r#"{"choices":[{"delta":{"content":"Ol\u00e1"}},{"delta":{"content":"other"}}]}"#,
        )
        .unwrap();
        assert_eq!(event, token("Ol\u{e1}"));
    }

    #[test]
    fn empty_deltas_are_skipped() {
        assert_eq!(
            decode_message(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap(),
            StreamEvent::Skip
        );
        assert_eq!(decode_message(r#"{"choices":[]}"#).unwrap(), StreamEvent::Skip);
    }

    #[test]
    fn malformed_chunk_is_an_error() {
        assert!(matches!(
            decode_message("{not json}"),
            Err(RetrievalError::Generation(_))
        ));
    }
}
