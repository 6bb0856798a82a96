pub mod gemini;

use async_trait::async_trait;
use futures::{ Future, Stream };
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ GenerationConfig, HistoryEntry, LlmConfig, LlmError };
use self::gemini::GeminiChatClient;

/// Lazy, finite sequence of reply fragments. Not restartable.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Starts a chat seeded with `history` and sends `message` as the next
    /// user turn. Errors the provider reports before the first fragment are
    /// returned here; later ones arrive through the stream.
    async fn stream_chat(
        &self,
        history: &[HistoryEntry],
        message: &str,
        generation: &GenerationConfig
    ) -> Result<TextStream, LlmError>;

    fn get_model(&self) -> String;
}

pub fn create_streaming_response<F, Fut>(response_fn: F) -> TextStream
where
    F: FnOnce(mpsc::Sender<Result<String, LlmError>>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        response_fn(tx).await;
    });

    Box::pin(ReceiverStream::new(rx))
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = Arc::new(GeminiChatClient::from_config(config)?);
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn streaming_response_yields_in_send_order_then_ends() {
        let mut stream = create_streaming_response(|tx| async move {
            for part in ["a", "b", "c"] {
                let _ = tx.send(Ok(part.to_string())).await;
            }
        });

        let mut seen = Vec::new();
        while let Some(item) = stream.next().await {
            seen.push(item.unwrap());
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
    }
}
