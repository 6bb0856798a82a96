use std::error::Error;
use std::io::{ self, Write };
use std::sync::Arc;
use log::{ info, warn };
use tokio::io::{ stdin, AsyncBufReadExt, BufReader };
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

use crate::bot::Persona;
use crate::cli::ChatArgs;
use crate::models::chat::Role;
use super::session::{ Render, Session };
use super::transport::HttpTransport;
use super::{ ChatState, TranscriptController };

/// Prints the transcript to a terminal as it changes. Only the part of the
/// newest message not yet shown is written, so a streamed reply appears as
/// it arrives and the terminal's own scrolling keeps it in view.
pub struct TerminalRenderer<W: Write> {
    out: W,
    bot_name: String,
    shown_messages: usize,
    shown_len: usize,
    shown_error: Option<String>,
    shown_countdown: Option<u64>,
    was_loading: bool,
    started: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, bot_name: &str) -> Self {
        Self {
            out,
            bot_name: bot_name.to_string(),
            shown_messages: 0,
            shown_len: 0,
            shown_error: None,
            shown_countdown: None,
            was_loading: false,
            started: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_messages(&mut self, state: &ChatState) -> io::Result<()> {
        let messages = state.transcript.messages();

        if self.shown_messages > 0 {
            if let Some(current) = messages.get(self.shown_messages - 1) {
                if let Some(delta) = current.content.get(self.shown_len..) {
                    if !delta.is_empty() && current.role == Role::Assistant {
                        write!(self.out, "{}", delta)?;
                    }
                }
                self.shown_len = current.content.len();
            }
        }

        for message in messages.iter().skip(self.shown_messages) {
            // User lines are already on screen as typed.
            if message.role == Role::Assistant {
                write!(self.out, "\n{}> {}", self.bot_name, message.content)?;
            }
            self.shown_messages += 1;
            self.shown_len = message.content.len();
        }
        Ok(())
    }

    fn write_state(&mut self, state: &ChatState) -> io::Result<()> {
        self.write_messages(state)?;
        self.write_status(state)?;
        self.out.flush()
    }

    fn write_status(&mut self, state: &ChatState) -> io::Result<()> {
        if state.error != self.shown_error {
            if let Some(error) = &state.error {
                write!(self.out, "\n[error] {}", error)?;
            }
            self.shown_error = state.error.clone();
        }

        let countdown = state.rate_limit.map(|r| r.remaining_seconds);
        let mut prompt = !self.started;
        if countdown != self.shown_countdown {
            match countdown {
                Some(secs) => write!(self.out, "\n[rate limited] you can send again in {}s", secs)?,
                None => {
                    write!(self.out, "\n[ready]")?;
                    prompt = true;
                }
            }
            self.shown_countdown = countdown;
        }
        if self.was_loading && !state.loading && countdown.is_none() {
            prompt = true;
        }

        if prompt {
            write!(self.out, "\n\n> ")?;
        }
        self.started = true;
        self.was_loading = state.loading;
        Ok(())
    }
}

impl<W: Write> Render for TerminalRenderer<W> {
    fn render(&mut self, state: &ChatState) {
        if let Err(e) = self.write_state(state) {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

pub async fn run_terminal(persona: Persona, args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let transport = Arc::new(HttpTransport::new(&args.server_url)?);
    info!("Chatting with {} via {}", persona.name, transport.endpoint());

    let controller = TranscriptController::new(&persona.greeting);
    let renderer = TerminalRenderer::new(io::stdout(), &persona.name);
    let mut session = Session::new(controller, transport, renderer);

    // Enter submits the line.
    let input = LinesStream::new(BufReader::new(stdin()).lines()).filter_map(|line| line.ok());
    session.run(Box::pin(input)).await;

    println!();
    Ok(())
}
