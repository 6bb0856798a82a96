use axum::{
    body::{ Body, Bytes },
    http::header,
    response::{ IntoResponse, Response },
};
use futures::StreamExt;
use log::{ debug, error };
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{ timeout_at, Instant };
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::llm::chat::TextStream;
use crate::llm::LlmError;

pub const PLAIN_TEXT_UTF8: &str = "text/plain; charset=utf-8";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream stream failed: {0}")]
    Upstream(#[from] LlmError),
    #[error("stream exceeded the request deadline")]
    DeadlineExceeded,
}

/// Forwards each fragment of `stream` as soon as it arrives, through an
/// unbounded channel. The output ends with an error item if the upstream
/// fails or `deadline` passes; fragments already sent stay sent.
pub fn relay(stream: TextStream, deadline: Instant) -> UnboundedReceiverStream<Result<Bytes, RelayError>> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut stream = stream;
        let mut forwarded = 0usize;
        loop {
            match timeout_at(deadline, stream.next()).await {
                Ok(Some(Ok(fragment))) => {
                    forwarded += 1;
                    if tx.send(Ok(Bytes::from(fragment))).is_err() {
                        debug!("Client went away after {} fragments", forwarded);
                        return;
                    }
                }
                Ok(Some(Err(e))) => {
                    error!("Upstream stream failed after {} fragments: {}", forwarded, e);
                    let _ = tx.send(Err(RelayError::Upstream(e)));
                    return;
                }
                Ok(None) => {
                    debug!("Stream complete: {} fragments", forwarded);
                    return;
                }
                Err(_) => {
                    error!("Stream cut at the request deadline after {} fragments", forwarded);
                    let _ = tx.send(Err(RelayError::DeadlineExceeded));
                    return;
                }
            }
        }
    });

    UnboundedReceiverStream::new(rx)
}

pub fn stream_response(stream: TextStream, deadline: Instant) -> Response {
    let body = Body::from_stream(relay(stream, deadline));
    ([(header::CONTENT_TYPE, PLAIN_TEXT_UTF8)], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fragments(parts: Vec<Result<&'static str, LlmError>>) -> TextStream {
        Box::pin(futures::stream::iter(parts.into_iter().map(|p| p.map(str::to_string))))
    }

    #[tokio::test]
    async fn fragments_are_forwarded_in_order() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let out: Vec<_> = relay(fragments(vec![Ok("Hel"), Ok("lo"), Ok(" world")]), deadline)
            .collect().await;

        let text: Vec<Bytes> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(text, vec![Bytes::from("Hel"), Bytes::from("lo"), Bytes::from(" world")]);
    }

    #[tokio::test]
    async fn upstream_error_ends_stream_after_partial_output() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let out: Vec<_> = relay(
            fragments(vec![Ok("partial"), Err(LlmError::Provider("boom".to_string())), Ok("never")]),
            deadline
        ).collect().await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), &Bytes::from("partial"));
        assert!(matches!(out[1], Err(RelayError::Upstream(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_upstream_is_cut_at_deadline() {
        let stalled: TextStream = Box::pin(
            futures::stream::iter(vec![Ok("first".to_string())]).chain(futures::stream::pending())
        );
        let deadline = Instant::now() + Duration::from_secs(30);
        let out: Vec<_> = relay(stalled, deadline).collect().await;

        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], Err(RelayError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn response_is_plain_text() {
        let resp = stream_response(fragments(vec![Ok("x")]), Instant::now() + Duration::from_secs(1));
        assert_eq!(resp.headers()[header::CONTENT_TYPE], PLAIN_TEXT_UTF8);
    }
}
