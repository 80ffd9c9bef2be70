use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use crate::error::TransportError;

use super::{Connection, Connector, FrameSink, FrameStream};

/// Failure modes a [`MemoryHub`] can inject for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HubFault {
    /// `connect` is refused.
    RefuseConnect,
    /// Every `send` fails.
    FailSend,
    /// The inbound half delivers nothing. It fails once the first `send` has
    /// been broadcast.
    FailReceiveAfterSend,
}

/// In-process broadcast server.
///
/// Every frame a peer sends is delivered to all other registered peers and
/// never echoed back to the sender.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

#[derive(Debug, Default)]
struct HubState {
    peers: HashMap<String, mpsc::UnboundedSender<Vec<u8>>>,
    faults: HashMap<String, HashSet<HubFault>>,
}

#[derive(Debug, Default)]
struct PeerFault {
    tripped: AtomicBool,
    notify: Notify,
}

impl PeerFault {
    fn trip(&self) {
        self.tripped.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}

impl MemoryHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn inject(&self, identity: &str, fault: HubFault) {
        self.lock()
            .faults
            .entry(identity.to_owned())
            .or_default()
            .insert(fault);
    }

    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.lock().peers.len()
    }

    /// Delivers `frame` to one peer only. Returns false when the peer is not
    /// connected.
    pub fn deliver(&self, identity: &str, frame: Vec<u8>) -> bool {
        self.lock()
            .peers
            .get(identity)
            .is_some_and(|tx| tx.send(frame).is_ok())
    }

    fn has_fault(&self, identity: &str, fault: HubFault) -> bool {
        self.lock()
            .faults
            .get(identity)
            .is_some_and(|faults| faults.contains(&fault))
    }

    fn broadcast(&self, from: &str, frame: &[u8]) -> Result<(), TransportError> {
        let state = self.lock();
        if !state.peers.contains_key(from) {
            return Err(TransportError::Closed);
        }
        for (identity, tx) in &state.peers {
            if identity == from {
                continue;
            }
            // A peer whose receiver is gone is unregistering; skip it.
            drop(tx.send(frame.to_vec()));
        }
        Ok(())
    }

    fn unregister(&self, identity: &str) {
        self.lock().peers.remove(identity);
    }
}

#[async_trait]
impl Connector for MemoryHub {
    async fn connect(&self, identity: &str) -> Result<Connection, TransportError> {
        if self.has_fault(identity, HubFault::RefuseConnect) {
            return Err(TransportError::Refused {
                identity: identity.to_owned(),
            });
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().peers.insert(identity.to_owned(), tx);
        let fault = Arc::new(PeerFault::default());
        let withhold = self.has_fault(identity, HubFault::FailReceiveAfterSend);
        Ok(Connection {
            outbound: Box::new(MemorySink {
                hub: self.clone(),
                identity: identity.to_owned(),
                fault: Arc::clone(&fault),
                closed: false,
            }),
            inbound: Box::new(MemorySource {
                rx,
                fault,
                withhold,
            }),
        })
    }
}

struct MemorySink {
    hub: MemoryHub,
    identity: String,
    fault: Arc<PeerFault>,
    closed: bool,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed || self.hub.has_fault(&self.identity, HubFault::FailSend) {
            return Err(TransportError::Closed);
        }
        self.hub.broadcast(&self.identity, &frame)?;
        if self
            .hub
            .has_fault(&self.identity, HubFault::FailReceiveAfterSend)
        {
            self.fault.trip();
        }
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.hub.unregister(&self.identity);
    }
}

struct MemorySource {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    fault: Arc<PeerFault>,
    withhold: bool,
}

#[async_trait]
impl FrameStream for MemorySource {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.withhold {
            if !self.fault.is_tripped() {
                self.fault.notify.notified().await;
            }
            return Err(TransportError::Closed);
        }
        Ok(self.rx.recv().await)
    }
}
