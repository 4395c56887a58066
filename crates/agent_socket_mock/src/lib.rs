//! Scripted in-memory implementation of the `agent_socket` connector seam.
//!
//! No sockets are opened. Each connect attempt consumes the next script entry,
//! and accepted connections are driven from the test side through a
//! [`MockPeer`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use agent_socket::{CloseInfo, Connection, Connector, Inbound, SocketError};
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

/// Reason used when the script is exhausted and the connector refuses.
pub const REFUSED_REASON: &str = "connection refused";

/// Close code reported once the inbound channel is gone.
pub const PEER_DROPPED_CLOSE_CODE: u16 = 1006;

type InboundItem = Result<Inbound, SocketError>;

enum Script {
    Accept(MockPeer, MockConnection),
    Refuse(SocketError),
    Hang,
}

#[derive(Default)]
struct Inner {
    scripts: VecDeque<Script>,
    attempts: Vec<Url>,
    peers: Vec<MockPeer>,
    accept_when_exhausted: bool,
}

/// Connector that plays back a queue of accept/refuse outcomes.
///
/// Once the script runs out it refuses with [`REFUSED_REASON`], or accepts
/// every attempt after [`ScriptedConnector::accept_always`].
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an accepted connection and returns the handle that drives it.
    pub fn accept(&self) -> MockPeer {
        let (peer, connection) = mock_pair();
        lock_unpoisoned(&self.inner)
            .scripts
            .push_back(Script::Accept(peer.clone(), connection));
        peer
    }

    pub fn refuse(&self, error: SocketError) -> &Self {
        lock_unpoisoned(&self.inner)
            .scripts
            .push_back(Script::Refuse(error));
        self
    }

    /// Queues `count` transport-level refusals.
    pub fn refuse_times(&self, count: usize) -> &Self {
        for _ in 0..count {
            self.refuse(SocketError::transport(REFUSED_REASON));
        }
        self
    }

    /// Queues a connect attempt that never resolves.
    pub fn hang(&self) -> &Self {
        lock_unpoisoned(&self.inner).scripts.push_back(Script::Hang);
        self
    }

    /// Accepts every attempt once the script is exhausted.
    pub fn accept_always(&self) -> &Self {
        lock_unpoisoned(&self.inner).accept_when_exhausted = true;
        self
    }

    /// Endpoints of every connect attempt so far, in order.
    pub fn attempts(&self) -> Vec<Url> {
        lock_unpoisoned(&self.inner).attempts.clone()
    }

    pub fn attempt_count(&self) -> usize {
        lock_unpoisoned(&self.inner).attempts.len()
    }

    /// Peers of every connection accepted so far, in order.
    pub fn peers(&self) -> Vec<MockPeer> {
        lock_unpoisoned(&self.inner).peers.clone()
    }

    pub fn last_peer(&self) -> Option<MockPeer> {
        lock_unpoisoned(&self.inner).peers.last().cloned()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, endpoint: &Url) -> Result<Box<dyn Connection>, SocketError> {
        let outcome: Option<Result<Box<dyn Connection>, SocketError>> = {
            let mut inner = lock_unpoisoned(&self.inner);
            inner.attempts.push(endpoint.clone());
            let script = match inner.scripts.pop_front() {
                Some(script) => script,
                None if inner.accept_when_exhausted => {
                    let (peer, connection) = mock_pair();
                    Script::Accept(peer, connection)
                }
                None => Script::Refuse(SocketError::transport(REFUSED_REASON)),
            };
            match script {
                Script::Accept(peer, connection) => {
                    inner.peers.push(peer);
                    Some(Ok(Box::new(connection)))
                }
                Script::Refuse(error) => Some(Err(error)),
                Script::Hang => None,
            }
        };

        match outcome {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

/// Test-side handle of one mock connection.
#[derive(Clone)]
pub struct MockPeer {
    inbound: mpsc::UnboundedSender<InboundItem>,
    shared: Arc<PeerShared>,
}

#[derive(Default)]
struct PeerShared {
    sent: Mutex<Vec<String>>,
    send_failures: Mutex<VecDeque<SocketError>>,
    stall_sends: AtomicBool,
    closed_by_client: AtomicBool,
}

impl MockPeer {
    /// Delivers one text frame to the session.
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.inbound.send(Ok(Inbound::Text(text.into())));
    }

    /// Closes the stream from the server side.
    pub fn close_with(&self, code: u16, reason: impl Into<String>) {
        let _ = self
            .inbound
            .send(Ok(Inbound::Closed(CloseInfo::new(Some(code), reason))));
    }

    /// Fails the next read with `error`.
    pub fn fail(&self, error: SocketError) {
        let _ = self.inbound.send(Err(error));
    }

    /// Fails the next outbound send with `error`.
    pub fn fail_next_send(&self, error: SocketError) {
        lock_unpoisoned(&self.shared.send_failures).push_back(error);
    }

    /// Records every later send as written but never completes it.
    pub fn stall_sends(&self) {
        self.shared.stall_sends.store(true, Ordering::SeqCst);
    }

    /// Frames the session transmitted on this connection, in order.
    pub fn sent_frames(&self) -> Vec<String> {
        lock_unpoisoned(&self.shared.sent).clone()
    }

    pub fn is_closed_by_client(&self) -> bool {
        self.shared.closed_by_client.load(Ordering::SeqCst)
    }
}

struct MockConnection {
    inbound: mpsc::UnboundedReceiver<InboundItem>,
    shared: Arc<PeerShared>,
}

fn mock_pair() -> (MockPeer, MockConnection) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(PeerShared::default());
    let peer = MockPeer {
        inbound: tx,
        shared: Arc::clone(&shared),
    };
    (peer, MockConnection { inbound: rx, shared })
}

#[async_trait]
impl Connection for MockConnection {
    async fn send_text(&mut self, text: String) -> Result<(), SocketError> {
        if let Some(error) = lock_unpoisoned(&self.shared.send_failures).pop_front() {
            return Err(error);
        }
        lock_unpoisoned(&self.shared.sent).push(text);
        if self.shared.stall_sends.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn next_inbound(&mut self) -> Result<Inbound, SocketError> {
        match self.inbound.recv().await {
            Some(item) => item,
            None => Ok(Inbound::Closed(CloseInfo::new(
                Some(PEER_DROPPED_CLOSE_CODE),
                "peer dropped",
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.shared.closed_by_client.store(true, Ordering::SeqCst);
        self.inbound.close();
        Ok(())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
