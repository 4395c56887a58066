use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chat_types::{AgentId, ConnectionId, ConnectionStatus, Message};
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use transcript::{Transcript, TranscriptEvent};

use crate::config::SessionConfig;
use crate::connector::Connector;
use crate::endpoint::agent_endpoint;
use crate::error::SessionError;
use crate::frames::InboundEvent;
use crate::worker::{run_worker, WorkerContext};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// What `send` did with the submitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing changed.
    Ignored,
    /// Connected: handed to the live connection for immediate transmission.
    Dispatched,
    /// Not connected: queued until the connection comes up.
    Queued,
}

/// Change notification for view layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    StatusChanged {
        status: ConnectionStatus,
        reason: Option<String>,
    },
    RetryScheduled {
        attempt: u32,
        delay: Duration,
    },
    TranscriptChanged,
}

/// Event emitted by a connection worker. Applied only while its connection id is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WorkerEvent {
    Connecting,
    Connected,
    Inbound(InboundEvent),
    Disconnected {
        reason: String,
        attempt: u32,
        delay: Duration,
    },
    Reconnecting {
        attempt: u32,
    },
    Fatal {
        reason: String,
    },
}

#[derive(Debug, Default)]
struct SessionState {
    agent_id: Option<AgentId>,
    connection_id: Option<ConnectionId>,
    status: ConnectionStatus,
    status_reason: Option<String>,
    attempt: u32,
    transcript: Transcript,
    outbound: VecDeque<String>,
}

impl SessionState {
    fn set_status(
        &mut self,
        status: ConnectionStatus,
        reason: Option<String>,
        updates: &mut Vec<SessionUpdate>,
    ) {
        if self.status == status && self.status_reason == reason {
            return;
        }
        self.status = status;
        self.status_reason = reason.clone();
        updates.push(SessionUpdate::StatusChanged { status, reason });
    }

    fn apply_transcript(&mut self, event: TranscriptEvent, updates: &mut Vec<SessionUpdate>) {
        self.transcript.apply(event);
        updates.push(SessionUpdate::TranscriptChanged);
    }
}

/// State shared between the session handle and its connection worker.
pub(crate) struct Shared {
    state: Mutex<SessionState>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl Shared {
    fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(SessionState::default()),
            updates,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock_unpoisoned(&self.state)
    }

    fn publish(&self, updates: Vec<SessionUpdate>) {
        for update in updates {
            // No subscribers is fine.
            let _ = self.updates.send(update);
        }
    }

    /// Applies a worker event. Returns false when `connection_id` has been superseded.
    pub(crate) fn apply(&self, connection_id: ConnectionId, event: WorkerEvent) -> bool {
        let mut updates = Vec::new();
        {
            let mut state = self.lock();
            if state.connection_id != Some(connection_id) {
                debug!(connection_id, ?event, "dropping event from superseded connection");
                return false;
            }

            match event {
                WorkerEvent::Connecting => {
                    let reason = if state.attempt == 0 {
                        None
                    } else {
                        state.status_reason.clone()
                    };
                    state.set_status(ConnectionStatus::Connecting, reason, &mut updates);
                }
                WorkerEvent::Connected => {
                    state.attempt = 0;
                    state.set_status(ConnectionStatus::Connected, None, &mut updates);
                }
                WorkerEvent::Inbound(inbound) => {
                    let agent_id = state.agent_id.clone();
                    match inbound {
                        InboundEvent::Fragment(text) => state.apply_transcript(
                            TranscriptEvent::fragment(text, agent_id),
                            &mut updates,
                        ),
                        InboundEvent::Completed => {
                            state.apply_transcript(TranscriptEvent::StreamCompleted, &mut updates)
                        }
                        InboundEvent::Errored(message) => state.apply_transcript(
                            TranscriptEvent::stream_errored(message),
                            &mut updates,
                        ),
                        InboundEvent::SessionAssigned(_) | InboundEvent::Ignored { .. } => {}
                    }
                }
                WorkerEvent::Disconnected {
                    reason,
                    attempt,
                    delay,
                } => {
                    state.attempt = attempt;
                    state.set_status(ConnectionStatus::Disconnected, Some(reason), &mut updates);
                    updates.push(SessionUpdate::RetryScheduled { attempt, delay });
                }
                WorkerEvent::Reconnecting { attempt } => {
                    state.attempt = attempt;
                    let reason = state.status_reason.clone();
                    state.set_status(ConnectionStatus::Reconnecting, reason, &mut updates);
                }
                WorkerEvent::Fatal { reason } => {
                    if state.transcript.open_message().is_some() {
                        state.apply_transcript(
                            TranscriptEvent::stream_errored(reason.clone()),
                            &mut updates,
                        );
                    }
                    state.set_status(ConnectionStatus::Errored, Some(reason), &mut updates);
                }
            }
        }

        self.publish(updates);
        true
    }

    /// Pops the next queued send while `connection_id` is current and connected.
    pub(crate) fn take_outbound(&self, connection_id: ConnectionId) -> Option<String> {
        let mut state = self.lock();
        if state.connection_id != Some(connection_id) || !state.status.is_live() {
            return None;
        }
        state.outbound.pop_front()
    }

    /// Puts back a send that failed to transmit so it goes out first next time.
    ///
    /// Keyed by agent: teardown clears the connection id before the worker
    /// observes cancellation.
    pub(crate) fn requeue_front(&self, agent_id: &AgentId, text: String) {
        let mut state = self.lock();
        if state.agent_id.as_ref() == Some(agent_id) {
            state.outbound.push_front(text);
        }
    }
}

struct ActiveConnection {
    connection_id: ConnectionId,
    cancel: CancellationToken,
    flush: Arc<Notify>,
    join_handle: JoinHandle<()>,
}

/// Chat session bound to at most one agent and one live connection.
///
/// Must be used from within a tokio runtime.
pub struct ChatSession {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    active: Option<ActiveConnection>,
    next_connection_id: ConnectionId,
}

impl ChatSession {
    pub fn new(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            shared: Arc::new(Shared::new()),
            active: None,
            next_connection_id: 1,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Binds the session to `agent_id`, replacing any previous connection.
    ///
    /// The previous worker is cancelled and joined before the new one starts, so
    /// no event from the old connection can reach the transcript afterwards.
    /// `None` deselects: the session returns to `idle` without connecting.
    pub async fn open(&mut self, agent_id: Option<AgentId>) -> Result<(), SessionError> {
        let endpoint = agent_id
            .as_ref()
            .map(|agent_id| agent_endpoint(&self.config.base_url, agent_id))
            .transpose()?;

        self.teardown().await;

        let (Some(agent_id), Some(endpoint)) = (agent_id, endpoint) else {
            self.reset_to_idle(None);
            return Ok(());
        };

        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;

        let mut updates = Vec::new();
        {
            let mut state = self.shared.lock();
            if state.agent_id.as_ref() != Some(&agent_id) {
                let dropped = state.outbound.len();
                state.outbound.clear();
                if dropped > 0 {
                    warn!(dropped, "discarding queued sends addressed to previous agent");
                }
                if state.transcript.open_message().is_some() {
                    state.apply_transcript(TranscriptEvent::StreamCompleted, &mut updates);
                }
            }
            state.agent_id = Some(agent_id.clone());
            state.connection_id = Some(connection_id);
            state.attempt = 0;
            state.set_status(ConnectionStatus::Connecting, None, &mut updates);
        }
        self.shared.publish(updates);

        info!(agent = %agent_id, connection_id, endpoint = %endpoint, "opening chat session");

        let cancel = CancellationToken::new();
        let flush = Arc::new(Notify::new());
        let join_handle = tokio::spawn(run_worker(WorkerContext {
            connection_id,
            agent_id,
            endpoint,
            connector: Arc::clone(&self.connector),
            shared: Arc::clone(&self.shared),
            cancel: cancel.clone(),
            flush: Arc::clone(&flush),
            config: self.config.clone(),
        }));

        self.active = Some(ActiveConnection {
            connection_id,
            cancel,
            flush,
            join_handle,
        });
        Ok(())
    }

    /// Reopens the current agent, e.g. after a fatal error. Queued sends are kept.
    pub async fn reconnect(&mut self) -> Result<(), SessionError> {
        let agent_id = self.agent_id().ok_or(SessionError::NoAgentSelected)?;
        self.open(Some(agent_id)).await
    }

    /// Cancels the connection and any scheduled reconnect. The agent stays selected.
    pub async fn close(&mut self) {
        self.teardown().await;
        let agent_id = self.agent_id();
        self.reset_to_idle(agent_id);
    }

    /// Appends the user turn to the transcript and transmits or queues it.
    pub fn send(&self, text: &str) -> Result<SendOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let mut updates = Vec::new();
        let outcome = {
            let mut state = self.shared.lock();
            let Some(agent_id) = state.agent_id.clone() else {
                return Err(SessionError::NoAgentSelected);
            };
            state.apply_transcript(
                TranscriptEvent::user_submitted(text, Some(agent_id)),
                &mut updates,
            );
            state.outbound.push_back(text.to_owned());
            if state.status.is_live() {
                SendOutcome::Dispatched
            } else {
                SendOutcome::Queued
            }
        };
        self.shared.publish(updates);

        if outcome == SendOutcome::Dispatched {
            if let Some(active) = self.active.as_ref() {
                active.flush.notify_one();
            }
        }

        Ok(outcome)
    }

    pub fn clear_transcript(&self) {
        let mut updates = Vec::new();
        self.shared
            .lock()
            .apply_transcript(TranscriptEvent::Cleared, &mut updates);
        self.shared.publish(updates);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.shared.updates.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock().status
    }

    pub fn status_reason(&self) -> Option<String> {
        self.shared.lock().status_reason.clone()
    }

    /// Retries scheduled since the last successful connect.
    pub fn attempt(&self) -> u32 {
        self.shared.lock().attempt
    }

    pub fn agent_id(&self) -> Option<AgentId> {
        self.shared.lock().agent_id.clone()
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.shared.lock().connection_id
    }

    pub fn transcript(&self) -> Transcript {
        self.shared.lock().transcript.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().transcript.messages().to_vec()
    }

    pub fn pending_sends(&self) -> Vec<String> {
        self.shared.lock().outbound.iter().cloned().collect()
    }

    async fn teardown(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        {
            let mut state = self.shared.lock();
            if state.connection_id == Some(active.connection_id) {
                state.connection_id = None;
            }
        }

        active.cancel.cancel();
        if let Err(join_error) = active.join_handle.await {
            if join_error.is_panic() {
                error!(
                    connection_id = active.connection_id,
                    "connection worker panicked during teardown"
                );
            }
        }
        debug!(connection_id = active.connection_id, "connection torn down");
    }

    fn reset_to_idle(&self, agent_id: Option<AgentId>) {
        let mut updates = Vec::new();
        {
            let mut state = self.shared.lock();
            if agent_id.is_none() {
                state.outbound.clear();
            }
            if state.agent_id != agent_id && state.transcript.open_message().is_some() {
                state.apply_transcript(TranscriptEvent::StreamCompleted, &mut updates);
            }
            state.agent_id = agent_id;
            state.connection_id = None;
            state.attempt = 0;
            state.set_status(ConnectionStatus::Idle, None, &mut updates);
        }
        self.shared.publish(updates);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            active.join_handle.abort();
        }
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
