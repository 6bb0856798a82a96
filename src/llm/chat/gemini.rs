use async_trait::async_trait;
use futures::StreamExt;
use log::{ info, warn };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use tokio::sync::mpsc;
use url::Url;

use super::{ create_streaming_response, ChatClient, TextStream };
use crate::llm::{ GenerationConfig, HistoryEntry, HistoryRole, LlmConfig, LlmError };

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: HistoryRole,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

impl GeminiStreamRequest {
    fn new(history: &[HistoryEntry], message: &str, generation: &GenerationConfig) -> Self {
        let mut contents: Vec<GeminiContent> = history
            .iter()
            .map(|entry| GeminiContent {
                role: entry.role,
                parts: entry.parts
                    .iter()
                    .map(|text| GeminiPart { text: text.clone() })
                    .collect(),
            })
            .collect();
        contents.push(GeminiContent {
            role: HistoryRole::User,
            parts: vec![GeminiPart { text: message.to_string() }],
        });

        Self {
            contents,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: generation.max_output_tokens,
                temperature: generation.temperature,
            },
        }
    }
}

#[derive(Deserialize)]
struct GoogleChunk {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    #[serde(default)]
    error: Option<GoogleError>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    #[serde(default)]
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GoogleError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

/// Extracts the text carried by one SSE line. Lines that are not `data:`
/// records, or records without text, yield `None`.
fn parse_gemini_line(line: &str) -> Result<Option<String>, LlmError> {
    let line = line.trim();
    let data = match line.strip_prefix("data:") {
        Some(data) => data.trim(),
        None => {
            return Ok(None);
        }
    };
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let chunk: GoogleChunk = serde_json::from_str(data)?;
    if let Some(err) = chunk.error {
        return Err(LlmError::Status { status: err.code, message: err.message });
    }

    let text: String = chunk.candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Splits a byte stream into lines regardless of where chunk boundaries fall.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim_end().to_string());
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        Some(rest)
    }
}

/// Sends the text of `line` downstream. Returns `false` once the stream
/// should stop, either on a parse error or because the receiver is gone.
async fn forward_line(tx: &mpsc::Sender<Result<String, LlmError>>, line: &str) -> bool {
    match parse_gemini_line(line) {
        Ok(Some(text)) => tx.send(Ok(text)).await.is_ok(),
        Ok(None) => true,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}

pub struct GeminiChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    endpoint: Url,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, LlmError> {
        let chat_model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut endpoint = Url::parse(
            &format!("{}/models/{}:streamGenerateContent", base_url.trim_end_matches('/'), chat_model)
        )?;
        endpoint.query_pairs_mut().append_pair("alt", "sse");

        if api_key.is_empty() {
            warn!("GEMINI_API_KEY is not set; every chat request will be rejected upstream.");
        }

        Ok(Self {
            http: HttpClient::new(),
            api_key,
            model: chat_model,
            endpoint,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().unwrap_or_default();
        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn stream_chat(
        &self,
        history: &[HistoryEntry],
        message: &str,
        generation: &GenerationConfig
    ) -> Result<TextStream, LlmError> {
        info!(
            "GeminiChatClient::stream_chat() → model={} url={} history_len={}",
            self.model,
            self.endpoint,
            history.len()
        );

        let payload = GeminiStreamRequest::new(history, message, generation);
        let resp = self.http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        let mut bytes = resp.bytes_stream();
        Ok(
            create_streaming_response(move |tx| async move {
                let mut lines = LineBuffer::default();
                while let Some(chunk) = bytes.next().await {
                    match chunk {
                        Ok(buf) => {
                            for line in lines.push(&buf) {
                                if !forward_line(&tx, &line).await {
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(LlmError::Http(e))).await;
                            return;
                        }
                    }
                }
                if let Some(line) = lines.finish() {
                    forward_line(&tx, &line).await;
                }
            })
        )
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_line_yields_candidate_text() {
        let line =
            r#"data: {"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}],"role":"model"}}]}"#;
        assert_eq!(parse_gemini_line(line).unwrap(), Some("Hello".to_string()));
    }

    #[test]
    fn non_data_and_empty_lines_are_skipped() {
        assert_eq!(parse_gemini_line("").unwrap(), None);
        assert_eq!(parse_gemini_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_gemini_line(r#"data: {"candidates":[]}"#).unwrap(), None);
        assert_eq!(
            parse_gemini_line(r#"data: {"candidates":[{"finishReason":"STOP"}]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn error_record_becomes_status_error() {
        let line = r#"data: {"error":{"code":429,"message":"Resource has been exhausted"}}"#;
        let err = parse_gemini_line(line).unwrap_err();
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn garbage_data_is_a_decode_error() {
        let err = parse_gemini_line("data: {oops").unwrap_err();
        assert!(matches!(err, LlmError::Decode(_)));
    }

    #[test]
    fn line_buffer_joins_lines_split_across_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"data: {\"a\"").is_empty());
        assert_eq!(buffer.push(b":1}\r\n\r\ndata: x"), vec!["data: {\"a\":1}".to_string(), String::new()]);
        assert_eq!(buffer.finish(), Some("data: x".to_string()));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn request_appends_message_after_history() {
        let history = vec![HistoryEntry::user("You are X"), HistoryEntry::model("I am X")];
        let request = GeminiStreamRequest::new(&history, "question?", &GenerationConfig::default());

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "You are X" }] },
                    { "role": "model", "parts": [{ "text": "I am X" }] },
                    { "role": "user", "parts": [{ "text": "question?" }] }
                ],
                "generationConfig": { "maxOutputTokens": 1000, "temperature": 0.7f32 }
            })
        );
    }

    #[test]
    fn endpoint_keeps_key_out_of_the_url() {
        let client = GeminiChatClient::new(
            "secret-key".to_string(),
            Some("gemini-pro".to_string()),
            Some("http://localhost:9999/v1beta/".to_string())
        ).unwrap();

        assert_eq!(
            client.endpoint().as_str(),
            "http://localhost:9999/v1beta/models/gemini-pro:streamGenerateContent?alt=sse"
        );
        assert!(!client.endpoint().as_str().contains("secret-key"));
        assert_eq!(client.get_model(), "gemini-pro");
    }

    #[test]
    fn defaults_fill_blank_config() {
        let client = GeminiChatClient::from_config(&LlmConfig::default()).unwrap();
        assert_eq!(client.get_model(), DEFAULT_MODEL);
        assert!(client.endpoint().as_str().starts_with(DEFAULT_BASE_URL));
    }
}
