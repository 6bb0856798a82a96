use futures::future::BoxFuture;
use futures::{ Stream, StreamExt };
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{ interval_at, Instant, Interval, MissedTickBehavior };

use crate::models::chat::ChatMessage;
use super::decoder::Utf8ChunkDecoder;
use super::transport::{ ByteStream, ChatTransport, ClientError, TransportResponse };
use super::{ ChatState, TranscriptController };

/// Receives the full state after every change.
pub trait Render {
    fn render(&mut self, state: &ChatState);
}

/// A response as seen once its status is known. Error bodies are read
/// inside the pending future, so the select loop never waits on them.
enum Arrival {
    Rejected {
        status: u16,
        body: Result<Vec<u8>, ClientError>,
    },
    Accepted(TransportResponse),
}

async fn receive(transport: Arc<dyn ChatTransport>, payload: Vec<ChatMessage>) -> Result<Arrival, ClientError> {
    let resp = transport.send(payload).await?;
    if resp.is_success() {
        return Ok(Arrival::Accepted(resp));
    }
    let status = resp.status;
    Ok(Arrival::Rejected { status, body: resp.collect_body().await })
}

enum Pending {
    Idle,
    Waiting(BoxFuture<'static, Result<Arrival, ClientError>>),
    Streaming {
        id: String,
        body: ByteStream,
        decoder: Utf8ChunkDecoder,
    },
}

enum Event {
    Response(Result<Arrival, ClientError>),
    Chunk(Option<Result<Vec<u8>, ClientError>>),
}

impl Pending {
    async fn next_event(&mut self) -> Event {
        match self {
            Pending::Idle => std::future::pending().await,
            Pending::Waiting(request) => Event::Response(request.await),
            Pending::Streaming { body, .. } => Event::Chunk(body.next().await),
        }
    }
}

enum Step {
    Line(Option<String>),
    Event(Event),
    Tick,
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Drives a `TranscriptController` from input lines and network events on a
/// single task. At most one request is outstanding; lines that arrive while
/// one is, or while the countdown runs, are dropped by the controller.
pub struct Session<R: Render> {
    controller: TranscriptController,
    transport: Arc<dyn ChatTransport>,
    renderer: R,
    pending: Pending,
    countdown: Option<Interval>,
}

impl<R: Render> Session<R> {
    pub fn new(controller: TranscriptController, transport: Arc<dyn ChatTransport>, renderer: R) -> Self {
        Self {
            controller,
            transport,
            renderer,
            pending: Pending::Idle,
            countdown: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        self.controller.state()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Runs until `input` ends and no request is outstanding.
    pub async fn run<I>(&mut self, mut input: I)
        where I: Stream<Item = String> + Unpin
    {
        self.renderer.render(self.controller.state());
        let mut input_open = true;

        loop {
            if !input_open && matches!(self.pending, Pending::Idle) {
                break;
            }

            let step = tokio::select! {
                biased;
                line = input.next(), if input_open => Step::Line(line),
                event = self.pending.next_event() => Step::Event(event),
                _ = next_tick(&mut self.countdown) => Step::Tick,
            };

            match step {
                Step::Line(Some(line)) => self.handle_line(&line),
                Step::Line(None) => {
                    input_open = false;
                }
                Step::Event(event) => self.handle_event(event),
                Step::Tick => {
                    if self.controller.tick() {
                        self.render();
                    }
                }
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        self.controller.set_input(line);
        match self.controller.submit(line) {
            Some(payload) => {
                let transport = Arc::clone(&self.transport);
                self.pending = Pending::Waiting(Box::pin(receive(transport, payload)));
            }
            None => debug!("Input ignored: blank, loading or rate limited"),
        }
        self.render();
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Response(Ok(Arrival::Rejected { status, body })) => {
                match body {
                    Ok(body) => self.controller.apply_error_response(status, &body),
                    Err(e) => self.controller.fail(&e),
                }
                self.pending = Pending::Idle;
            }
            Event::Response(Ok(Arrival::Accepted(resp))) => {
                if resp.is_plain_text() {
                    let id = self.controller.begin_reply();
                    self.pending = Pending::Streaming {
                        id,
                        body: resp.body,
                        decoder: Utf8ChunkDecoder::new(),
                    };
                } else {
                    self.controller.fail(&ClientError::UnexpectedContentType(resp.content_type));
                    self.pending = Pending::Idle;
                }
            }
            Event::Response(Err(e)) => {
                self.controller.fail(&e);
                self.pending = Pending::Idle;
            }
            Event::Chunk(chunk) => {
                let Pending::Streaming { id, decoder, .. } = &mut self.pending else {
                    return;
                };
                match chunk {
                    Some(Ok(bytes)) => {
                        let text = decoder.push(&bytes);
                        if text.is_empty() {
                            return;
                        }
                        self.controller.append_fragment(id, &text);
                    }
                    Some(Err(e)) => {
                        let rest = decoder.finish();
                        self.controller.append_fragment(id, &rest);
                        self.controller.fail(&e);
                        self.pending = Pending::Idle;
                    }
                    None => {
                        let rest = decoder.finish();
                        self.controller.append_fragment(id, &rest);
                        self.controller.finish_reply();
                        self.pending = Pending::Idle;
                    }
                }
            }
        }
        self.render();
    }

    fn render(&mut self) {
        self.sync_countdown();
        self.renderer.render(self.controller.state());
    }

    fn sync_countdown(&mut self) {
        match (self.controller.countdown_active(), self.countdown.is_some()) {
            (true, false) => {
                let period = Duration::from_secs(1);
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.countdown = Some(interval);
            }
            (false, true) => {
                self.countdown = None;
            }
            _ => {}
        }
    }
}
