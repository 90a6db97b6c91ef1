//! The two conversations the client holds with the backend.
//!
//! [`PromptRelay`] sends a user prompt, receives query parameters, runs them
//! against the local store and ships the rows back. [`ChatRelay`] is the plain
//! message relay over the same socket.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dispatch;
use crate::error::Result;
use crate::protocol::{
    decode_chat, decode_query, encode, ChatMessage, ChatMessageData, DataMessage, PromptRequest,
    INVALID_MESSAGE_FORMAT,
};
use crate::provider::ContentProvider;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sent { service: String, rows: usize },
    NoData { service: String },
}

pub struct PromptRelay<'t, T, P> {
    transport: &'t T,
    provider: Arc<P>,
    clock: fn() -> DateTime<Utc>,
}

impl<'t, T, P> PromptRelay<'t, T, P>
where
    T: Transport,
    P: ContentProvider + Send + Sync + 'static,
{
    pub fn new(transport: &'t T, provider: Arc<P>) -> Self {
        Self { transport, provider, clock: Utc::now }
    }
    pub fn with_clock(transport: &'t T, provider: Arc<P>, clock: fn() -> DateTime<Utc>) -> Self {
        Self { transport, provider, clock }
    }

    /// One full round: prompt out, parameters in, rows out.
    pub async fn process_prompt(&self, prompt: &str) -> Result<Outcome> {
        info!(prompt, "sending prompt");
        let reply = self
            .transport
            .send_and_await_one_response(encode(&PromptRequest::new(prompt))?)
            .await?;
        let envelope = decode_query(&reply)?;
        debug!(service = %envelope.service, parameters = ?envelope.parameters, "received parameters");

        let service = envelope.service;
        let provider = Arc::clone(&self.provider);
        let parameters = envelope.parameters;
        let user_prompt = prompt.to_string();
        let now = (self.clock)();
        let for_query = service.clone();
        // store reads are synchronous
        let rows = tokio::task::spawn_blocking(move || {
            dispatch::execute(provider.as_ref(), &for_query, &parameters, &user_prompt, now)
        })
        .await??;

        if rows.is_empty() {
            info!(%service, prompt, "no data extracted");
            return Ok(Outcome::NoData { service });
        }
        let count = rows.len();
        let message = encode(&DataMessage::new(service.clone(), rows))?;
        self.transport.send_fire_and_forget(message).await?;
        info!(%service, rows = count, "sent data");
        Ok(Outcome::Sent { service, rows: count })
    }
}

pub struct ChatRelay<'t, T> {
    transport: &'t T,
    history: Vec<ChatMessage>,
}

impl<'t, T: Transport> ChatRelay<'t, T> {
    pub fn new(transport: &'t T) -> Self {
        Self { transport, history: Vec::new() }
    }

    pub async fn send(&mut self, text: &str) -> Result<()> {
        let message = ChatMessage::new(text, true);
        let frame = ChatMessageData {
            message: message.text.clone(),
            is_sent_by_user: true,
            timestamp: message.timestamp,
        };
        self.transport.send_fire_and_forget(encode(&frame)?).await?;
        self.history.push(message);
        Ok(())
    }

    /// Records an inbound frame; frames that don't decode become an error entry.
    pub fn receive(&mut self, frame: &str) -> &ChatMessage {
        let message = match decode_chat(frame) {
            Ok(data) => ChatMessage { is_sent_by_user: false, ..ChatMessage::from(data) },
            Err(e) => {
                warn!(error = %e, "invalid chat frame");
                ChatMessage::new(INVALID_MESSAGE_FORMAT, false)
            }
        };
        self.history.push(message);
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}
