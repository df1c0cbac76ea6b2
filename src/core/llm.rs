use crate::config::InferenceConfig;
use crate::core::chat::{Message, Role};
use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Message in the chat-completion wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role, message.content.clone())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct ChatCompletionClient {
    client: Client,
    api_key: String,
    endpoint: String,
    max_tokens: u32,
}

impl ChatCompletionClient {
    pub fn new(api_key: String, config: &InferenceConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            max_tokens: config.max_tokens,
        }
    }

    /// Stream token deltas into `tx` until the server sends `[DONE]`
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f64,
        tx: mpsc::Sender<String>,
    ) -> Result<()> {
        let request = ChatRequest {
            model,
            messages,
            max_tokens: self.max_tokens,
            temperature,
            stream: true,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Streaming request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("API error {}: {}", status, error_text);
        }

        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::default();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.context("Failed to read response stream")?;
            lines.extend(&bytes);

            while let Some(line) = lines.next_line() {
                match parse_sse_line(line.trim_end()) {
                    SseLine::Done => return Ok(()),
                    SseLine::Delta(content) => tx.send(content).await?,
                    SseLine::Skip => {}
                }
            }
        }

        if let SseLine::Delta(content) = parse_sse_line(lines.remainder().trim_end()) {
            tx.send(content).await?;
        }
        Ok(())
    }
}

/// Raw response bytes, split into lines only once a line is complete.
///
/// Chunk boundaries can fall inside a multi-byte character, so decoding
/// waits for the `\n` that ends the line.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<String> {
        let newline = self.pending.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=newline).collect();
        Some(decode_line(&line))
    }

    fn remainder(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(line) => line.to_string(),
        Err(e) => {
            tracing::debug!("[ChatCompletionClient] Stream line is not valid UTF-8: {}", e);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|content| !content.is_empty())
            .map(SseLine::Delta)
            .unwrap_or(SseLine::Skip),
        Err(e) => {
            tracing::debug!("[ChatCompletionClient] Ignoring undecodable stream line: {}", e);
            SseLine::Skip
        }
    }
}
