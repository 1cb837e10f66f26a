//! Ollama native streaming normalizer.
//!
//! Wire shape: newline-delimited JSON over `/api/chat` (no SSE framing).
//! Each line is a complete JSON object. Text arrives as `message.content`
//! deltas; tool calls arrive fully-formed in `message.tool_calls` with
//! arguments as a JSON object rather than an accumulating string, so no
//! fragment assembly applies. Ollama assigns no call ids, so we
//! synthesize them. The terminal object carries `done: true`.

use async_trait::async_trait;
use futures::StreamExt;
use loomweave_core::error::ProviderError;
use loomweave_core::message::{Message, Role};
use loomweave_core::provider::{
    ModelEvent, Provider, ToolCallRequest, ToolDefinition, TurnRequest,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama local model streaming provider.
pub struct OllamaProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider against the default local Ollama endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a provider against a custom Ollama endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_default();

        Self {
            name: "ollama".into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn to_api_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };

                let tool_calls = if msg.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        msg.tool_calls
                            .iter()
                            .map(|tc| OllamaToolCall {
                                function: OllamaFunctionCall {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                };

                OllamaMessage {
                    role: role.into(),
                    content: msg.content.clone(),
                    tool_calls,
                }
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one NDJSON line into canonical events.
///
/// Returns `None` for blank or unparseable lines; the flag is the line's
/// `done` marker. Tool calls get synthesized sequential ids, since
/// Ollama assigns none.
fn line_events(line: &str, call_counter: &mut u32) -> Option<(Vec<ModelEvent>, bool)> {
    if line.is_empty() {
        return None;
    }

    let chunk: OllamaChunk = match serde_json::from_str(line) {
        Ok(c) => c,
        Err(e) => {
            trace!(error = %e, line = %line, "Ignoring unparseable Ollama line");
            return None;
        }
    };

    let mut events = Vec::new();
    if let Some(message) = chunk.message {
        if !message.content.is_empty() {
            events.push(ModelEvent::Text {
                delta: message.content,
            });
        }

        // Tool calls arrive complete, never fragmented.
        for tc in message.tool_calls.unwrap_or_default() {
            let id = format!("ollama_call_{call_counter}");
            let index = *call_counter;
            *call_counter += 1;

            events.push(ModelEvent::ToolCallStart {
                index,
                id: id.clone(),
                name: tc.function.name.clone(),
            });
            events.push(ModelEvent::ToolCallComplete {
                call: ToolCallRequest {
                    id,
                    name: tc.function.name,
                    arguments: tc.function.arguments,
                },
            });
        }
    }

    Some((events, chunk.done))
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_turn(
        &self,
        request: TurnRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ModelEvent, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/api/chat", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": true,
            "options": {
                "temperature": request.temperature,
            },
        });

        if let Some(max_tokens) = request.max_tokens {
            body["options"]["num_predict"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(provider = "ollama", model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(crate::request_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut call_counter: u32 = 0;

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    let Some((events, done)) = line_events(&line, &mut call_counter) else {
                        continue;
                    };
                    for event in events {
                        if tx.send(Ok(event)).await.is_err() {
                            return;
                        }
                    }
                    if done {
                        return;
                    }
                }
            }

            // Transport closed without `done` — a final line without a
            // trailing newline is still flushed, never silently dropped.
            if let Some((events, _)) = line_events(buffer.trim(), &mut call_counter) {
                for event in events {
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

// --- Ollama API types ---

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    message: Option<OllamaChunkMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChunkMessage {
    #[serde(default)]
    content: String,
    tool_calls: Option<Vec<OllamaToolCall>>,
}
