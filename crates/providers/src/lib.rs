//! Streaming wire-protocol normalizers for loomweave.
//!
//! Each supported model endpoint has its own streaming wire format:
//! OpenAI-compatible endpoints send `data:`-framed SSE with indexed tool
//! call deltas, Anthropic sends typed SSE events with content blocks, and
//! Ollama's native chat API sends newline-delimited JSON. Each format is
//! translated by one implementation of `loomweave_core::Provider` into
//! the canonical `ModelEvent` stream; the agent loop never branches on
//! which provider is in use.

pub mod anthropic;
pub mod assembler;
pub mod ollama;
pub mod openai;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use assembler::ToolCallAssembler;
pub use ollama::OllamaProvider;
pub use openai::OpenAiCompatProvider;
pub use router::provider_for;

/// Map a request-phase `reqwest` failure onto the provider error taxonomy.
///
/// Deadline expiry is reported distinctly from transport faults so
/// callers can tell a slow endpoint from an unreachable one.
pub(crate) fn request_error(e: reqwest::Error) -> loomweave_core::error::ProviderError {
    if e.is_timeout() {
        loomweave_core::error::ProviderError::Timeout(e.to_string())
    } else {
        loomweave_core::error::ProviderError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomweave_core::error::ProviderError;

    #[tokio::test]
    async fn expired_deadline_maps_to_timeout() {
        // A listener that accepts the connection but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming() {
                match stream {
                    Ok(s) => held.push(s),
                    Err(_) => break,
                }
            }
        });

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(100))
            .build()
            .unwrap();
        let err = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap_err();

        assert!(matches!(request_error(err), ProviderError::Timeout(_)));
    }
}
