//! One WebSocket connection to the backend, behind a narrow interface.
//!
//! The connection opens in the background; callers wait on a readiness gate
//! before talking. Requests that expect an answer occupy a single correlation
//! slot: the next text frame from the server completes it. Frames that arrive
//! while no request is waiting go to the [`Connection::incoming`] channel, or
//! are dropped if nobody has taken that channel yet.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{PimError, Result};

/// What the relay needs from a transport.
pub trait Transport: Send + Sync {
    fn send_and_await_one_response(&self, text: String) -> impl Future<Output = Result<String>> + Send;
    fn send_fire_and_forget(&self, text: String) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Connecting,
    Open,
    Failed(String),
    Closed,
}

type Slot = Arc<Mutex<Option<oneshot::Sender<String>>>>;

pub struct Connection {
    url: String,
    outbound: mpsc::UnboundedSender<Message>,
    ready: watch::Receiver<Readiness>,
    pending: Slot,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    listening: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Connection {
    /// Starts connecting and returns at once. Must be called inside a tokio runtime.
    pub fn connect(url: impl Into<String>) -> Self {
        let url = url.into();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready) = watch::channel(Readiness::Connecting);
        let pending: Slot = Arc::new(Mutex::new(None));
        let listening = Arc::new(AtomicBool::new(false));
        let incoming = Inbox { tx: incoming_tx, listening: Arc::clone(&listening) };
        let task = tokio::spawn(run(url.clone(), outbound_rx, incoming, ready_tx, Arc::clone(&pending)));
        Self { url, outbound, ready, pending, incoming: Mutex::new(Some(incoming_rx)), listening, task }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn readiness(&self) -> Readiness {
        self.ready.borrow().clone()
    }

    /// Resolves once the socket is open; fails if it could not be opened.
    pub async fn await_ready(&self) -> Result<()> {
        let mut ready = self.ready.clone();
        let state = ready
            .wait_for(|state| *state != Readiness::Connecting)
            .await
            .map_err(|_| PimError::Transport("connection task ended".into()))?
            .clone();
        match state {
            Readiness::Open => Ok(()),
            Readiness::Failed(reason) => Err(PimError::Transport(reason)),
            Readiness::Closed | Readiness::Connecting => Err(PimError::Transport("connection closed".into())),
        }
    }

    /// Sends `text` and waits for the next frame the server sends back.
    pub async fn send_and_await_one_response(&self, text: String) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        {
            let mut slot = self.lock_slot()?;
            if slot.as_ref().is_some_and(|waiting| !waiting.is_closed()) {
                return Err(PimError::Transport("request already in flight".into()));
            }
            *slot = Some(tx);
        }
        if let Err(e) = self.send_fire_and_forget(text).await {
            self.lock_slot()?.take();
            return Err(e);
        }
        rx.await
            .map_err(|_| PimError::Transport("connection closed before a response arrived".into()))
    }

    pub async fn send_fire_and_forget(&self, text: String) -> Result<()> {
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| PimError::Transport("connection is not running".into()))
    }

    /// Uncorrelated frames from the server. Handed out once; frames that
    /// arrive before it is taken are discarded.
    pub fn incoming(&self) -> Option<mpsc::UnboundedReceiver<String>> {
        let rx = self.incoming.lock().ok().and_then(|mut rx| rx.take())?;
        self.listening.store(true, Ordering::SeqCst);
        Some(rx)
    }

    /// Closes with a normal close frame and lets the connection task finish.
    pub async fn disconnect(self) {
        let frame = CloseFrame { code: CloseCode::Normal, reason: "".into() };
        if self.outbound.send(Message::Close(Some(frame))).is_err() {
            self.task.abort();
            return;
        }
        if let Err(e) = self.task.await {
            debug!(error = %e, "connection task did not finish cleanly");
        }
    }

    fn lock_slot(&self) -> Result<std::sync::MutexGuard<'_, Option<oneshot::Sender<String>>>> {
        self.pending
            .lock()
            .map_err(|e| PimError::Transport(format!("correlation slot poisoned: {e}")))
    }
}

impl Transport for Connection {
    fn send_and_await_one_response(&self, text: String) -> impl Future<Output = Result<String>> + Send {
        Connection::send_and_await_one_response(self, text)
    }
    fn send_fire_and_forget(&self, text: String) -> impl Future<Output = Result<()>> + Send {
        Connection::send_fire_and_forget(self, text)
    }
}

async fn run(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    incoming: Inbox,
    ready: watch::Sender<Readiness>,
    pending: Slot,
) {
    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            warn!(%url, error = %e, "connection failed");
            let _ = ready.send(Readiness::Failed(e.to_string()));
            return;
        }
    };
    info!(%url, "connected to server");
    let _ = ready.send(Readiness::Open);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { break };
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!(error = %e, "send failed");
                    break;
                }
                if closing {
                    debug!("close frame sent");
                    break;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        debug!(%text, "received");
                        deliver(text, &pending, &incoming);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "closing");
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "connection error");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Dropping a waiting request's sender fails it.
    if let Ok(mut slot) = pending.lock() {
        slot.take();
    }
    let _ = ready.send(Readiness::Closed);
    info!(%url, "disconnected");
}

/// Sending half of the incoming channel, live only once a receiver was handed out.
struct Inbox {
    tx: mpsc::UnboundedSender<String>,
    listening: Arc<AtomicBool>,
}

fn deliver(text: String, pending: &Slot, incoming: &Inbox) {
    let waiting = pending.lock().ok().and_then(|mut slot| slot.take());
    let text = match waiting {
        Some(tx) => match tx.send(text) {
            Ok(()) => return,
            Err(text) => text,
        },
        None => text,
    };
    if !incoming.listening.load(Ordering::SeqCst) || incoming.tx.send(text).is_err() {
        debug!("no listener for uncorrelated frame, dropped");
    }
}
