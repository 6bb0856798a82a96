use async_trait::async_trait;
use futures::{ Stream, StreamExt };
use reqwest::{ Client as HttpClient, header::CONTENT_TYPE };
use std::pin::Pin;
use thiserror::Error;
use url::Url;
use log::debug;

use crate::models::chat::{ ChatMessage, ChatRequest };

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ClientError>> + Send>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected response format")]
    UnexpectedContentType(Option<String>),
    #[error("The reply stream was interrupted: {0}")]
    Stream(String),
    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Status line, content type and still-unread body of a chat reply.
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_plain_text(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("text/plain"))
            .unwrap_or(false)
    }

    /// Reads the whole body; used for error replies, which are small JSON.
    pub async fn collect_body(self) -> Result<Vec<u8>, ClientError> {
        let mut body = self.body;
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, messages: Vec<ChatMessage>) -> Result<TransportResponse, ClientError>;
}

pub struct HttpTransport {
    http: HttpClient,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let endpoint = Url::parse(server_url)?.join("/api/chat")?;
        Ok(Self { http: HttpClient::new(), endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, messages: Vec<ChatMessage>) -> Result<TransportResponse, ClientError> {
        debug!("POST {} with {} messages", self.endpoint, messages.len());
        let resp = self.http
            .post(self.endpoint.clone())
            .json(&ChatRequest { messages })
            .send().await?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(|e| ClientError::Stream(e.to_string())));

        Ok(TransportResponse {
            status,
            content_type,
            body: Box::pin(body),
        })
    }
}
