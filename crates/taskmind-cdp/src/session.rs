//! CDP session: request multiplexing, event fan-out and reconnection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use taskmind_config::SessionConfig;

use crate::backoff::ReconnectPolicy;
use crate::error::CdpError;
use crate::events::{ALL_EVENTS, EventStream, Subscribers};
use crate::invoker::Invoker;
use crate::protocol::{CdpMessage, CdpRequest, Event};
use crate::transport::{Transport, WsSink, WsSource};

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    /// Socket dropped; reconnect attempts in progress.
    Reconnecting,
    /// Reconnect budget spent. Terminal.
    Dead,
    /// Closed by the owner. Terminal.
    Closed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Dead | SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connected => write!(f, "connected"),
            SessionState::Reconnecting => write!(f, "reconnecting"),
            SessionState::Dead => write!(f, "dead"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Request waiting for its response.
struct PendingRequest {
    method: String,
    tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// Removes a request from the pending map when its caller goes away,
/// whether it finished, timed out or was dropped mid-flight.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashMap<u64, PendingRequest>>,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

struct Shared {
    config: SessionConfig,
    transport: Transport,
    policy: ReconnectPolicy,
    writer: tokio::sync::Mutex<Option<WsSink>>,
    pending: Mutex<HashMap<u64, PendingRequest>>,
    next_id: AtomicU64,
    state: Mutex<SessionState>,
    subscribers: Arc<Subscribers>,
}

impl Shared {
    fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Move to `next` unless the session already reached a terminal state.
    fn transition(&self, next: SessionState) -> bool {
        let mut state = self.state.lock();
        if state.is_terminal() {
            return false;
        }
        debug!(from = %*state, to = %next, "Session state change");
        *state = next;
        true
    }

    fn terminal_error(&self) -> Option<CdpError> {
        match self.state() {
            SessionState::Dead => Some(CdpError::SessionDead {
                attempts: self.policy.max_attempts,
            }),
            SessionState::Closed => Some(CdpError::SessionClosed),
            _ => None,
        }
    }

    /// Fail every in-flight request.
    fn fail_pending(&self, make_error: impl Fn(&str) -> CdpError) {
        let drained: Vec<PendingRequest> = self.pending.lock().drain().map(|(_, p)| p).collect();
        if !drained.is_empty() {
            debug!("Failing {} in-flight request(s)", drained.len());
        }
        for request in drained {
            let _ = request.tx.send(Err(make_error(&request.method)));
        }
    }

    fn dispatch(&self, text: &str) {
        trace!("CDP recv: {}", text);
        let message: CdpMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to parse CDP message: {}", e);
                return;
            }
        };

        if let Some(id) = message.id {
            let pending = self.pending.lock().remove(&id);
            match pending {
                Some(request) => {
                    let result = match message.error {
                        Some(error) => Err(CdpError::Protocol {
                            code: error.code,
                            message: error.message,
                        }),
                        None => Ok(message.result.unwrap_or(Value::Null)),
                    };
                    let _ = request.tx.send(result);
                }
                None => debug!("Response for unknown or expired request {}", id),
            }
        } else if let Some(method) = message.method {
            self.subscribers.publish(&Event {
                method,
                params: message.params.unwrap_or(Value::Null),
                session_id: message.session_id,
            });
        }
    }
}

/// A live connection to one browser target.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Session {
    shared: Arc<Shared>,
    supervisor: JoinHandle<()>,
}

impl Session {
    /// Resolve the target, open the WebSocket and start the reader task.
    pub async fn connect(config: SessionConfig) -> Result<Self, CdpError> {
        config.validate()?;

        let transport = Transport::resolve(&config).await?;
        let stream = transport.open().await?;
        let (sink, source) = stream.split();

        info!(ws_url = %transport.ws_url(), proxied = config.proxy.is_some(), "CDP session connected");

        let shared = Arc::new(Shared {
            policy: ReconnectPolicy::from_config(&config),
            config,
            transport,
            writer: tokio::sync::Mutex::new(Some(sink)),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            state: Mutex::new(SessionState::Connected),
            subscribers: Arc::new(Subscribers::default()),
        });

        let supervisor = tokio::spawn(supervise(shared.clone(), source));

        Ok(Self { shared, supervisor })
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// WebSocket URL of the attached target.
    pub fn target_url(&self) -> &str {
        self.shared.transport.ws_url()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Requests currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Subscribe to events named `event`, or to every event with `"*"`.
    pub fn subscribe(&self, event: &str) -> EventStream {
        self.shared.subscribers.subscribe(event)
    }

    /// Subscribe to every event.
    pub fn subscribe_all(&self) -> EventStream {
        self.subscribe(ALL_EVENTS)
    }

    /// Close the connection. In-flight calls fail and event streams end.
    pub async fn close(&self) {
        if !self.shared.transition(SessionState::Closed) {
            return;
        }
        self.supervisor.abort();

        if let Some(mut sink) = self.shared.writer.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        self.shared.fail_pending(|_| CdpError::SessionClosed);
        self.shared.subscribers.close_all();
        info!("CDP session closed");
    }

    async fn send_request(&self, method: &str, params: Value, timeout: Option<Duration>) -> Result<Value, CdpError> {
        if let Some(e) = self.shared.terminal_error() {
            return Err(e);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest::new(id, method, params);
        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(
            id,
            PendingRequest {
                method: method.to_string(),
                tx,
            },
        );
        let _guard = PendingGuard {
            pending: &self.shared.pending,
            id,
        };

        let sent = {
            let mut writer = self.shared.writer.lock().await;
            match writer.as_mut() {
                Some(sink) => sink.send(Message::Text(json.into())).await.map_err(CdpError::from),
                None => Err(CdpError::ConnectionLost(method.to_string())),
            }
        };
        if let Err(e) = sent {
            if let Some(terminal) = self.shared.terminal_error() {
                return Err(terminal);
            }
            return Err(match e {
                CdpError::WebSocket(_) => CdpError::ConnectionLost(method.to_string()),
                other => other,
            });
        }

        let deadline = timeout.unwrap_or_else(|| self.shared.config.call_timeout());
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::ConnectionLost(method.to_string())),
            Err(_) => {
                debug!(method, ?deadline, "CDP call timed out");
                Err(CdpError::Timeout {
                    method: method.to_string(),
                    after: deadline,
                })
            }
        }
    }
}

#[async_trait]
impl Invoker for Session {
    async fn call(&self, method: &str, params: Value, timeout: Option<Duration>) -> Result<Value, CdpError> {
        self.send_request(method, params, timeout).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.shared.transport.ws_url())
            .field("state", &self.shared.state())
            .finish()
    }
}

/// Reader loop plus reconnect supervision. Runs until the session is closed
/// or dies.
async fn supervise(shared: Arc<Shared>, mut source: WsSource) {
    loop {
        read_frames(&shared, &mut source).await;

        if !shared.transition(SessionState::Reconnecting) {
            return;
        }
        warn!(ws_url = %shared.transport.ws_url(), "CDP connection lost, reconnecting");
        shared.writer.lock().await.take();
        shared.fail_pending(|method| CdpError::ConnectionLost(method.to_string()));

        match reconnect(&shared).await {
            Some(next) => {
                source = next;
                if !shared.transition(SessionState::Connected) {
                    return;
                }
                info!(ws_url = %shared.transport.ws_url(), "CDP session reconnected");
            }
            None => {
                if shared.transition(SessionState::Dead) {
                    error!(
                        attempts = shared.policy.max_attempts,
                        "CDP session dead, reconnect attempts exhausted"
                    );
                    let attempts = shared.policy.max_attempts;
                    shared.fail_pending(|_| CdpError::SessionDead { attempts });
                    shared.subscribers.close_all();
                }
                return;
            }
        }
    }
}

async fn read_frames(shared: &Shared, source: &mut WsSource) {
    while let Some(msg) = source.next().await {
        match msg {
            Ok(Message::Text(text)) => shared.dispatch(&text),
            Ok(Message::Close(_)) => {
                debug!("WebSocket closed by peer");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error: {}", e);
                return;
            }
        }
    }
}

async fn reconnect(shared: &Shared) -> Option<WsSource> {
    let mut backoff = shared.policy.backoff();
    while let Some(delay) = backoff.next_delay() {
        tokio::time::sleep(delay).await;
        if shared.state().is_terminal() {
            return None;
        }
        match shared.transport.open().await {
            Ok(stream) => {
                let (sink, source) = stream.split();
                *shared.writer.lock().await = Some(sink);
                return Some(source);
            }
            Err(e) => warn!(
                attempt = backoff.attempts(),
                max = shared.policy.max_attempts,
                "Reconnect failed: {}",
                e
            ),
        }
    }
    None
}
