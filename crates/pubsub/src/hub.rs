//! Serialized register/unregister/broadcast loop
//!
//! The hub task is the sole mutator of `clients` and `subscriptions`.
//! Everything else talks to it by sending on one of three unbounded
//! inbound channels through a cloneable [`HubHandle`]; the loop decides
//! visibility order by the order it dequeues.

use crate::session::{Session, SessionId};
use hearth_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::debug;

/// A published message: the channel it targets and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Target channel name
    pub channel: String,
    /// Arbitrary JSON payload
    pub data: Value,
}

/// Cloneable sending side of the hub's inbound channels.
#[derive(Debug, Clone)]
pub struct HubHandle {
    register_tx: mpsc::UnboundedSender<Session>,
    unregister_tx: mpsc::UnboundedSender<SessionId>,
    broadcast_tx: mpsc::UnboundedSender<Message>,
}

impl HubHandle {
    /// Hand a freshly admitted session to the hub.
    pub fn register(&self, session: Session) {
        let _ = self.register_tx.send(session);
    }

    /// Ask the hub to remove a session.
    pub fn unregister(&self, id: SessionId) {
        let _ = self.unregister_tx.send(id);
    }

    /// Publish a message to every current subscriber of its channel.
    pub fn publish(&self, message: Message) {
        let _ = self.broadcast_tx.send(message);
    }
}

/// Single-writer owner of all pub/sub state.
pub struct Hub {
    register_rx: mpsc::UnboundedReceiver<Session>,
    unregister_rx: mpsc::UnboundedReceiver<SessionId>,
    broadcast_rx: mpsc::UnboundedReceiver<Message>,

    clients: HashMap<SessionId, Session>,
    subscriptions: HashMap<String, HashSet<SessionId>>,
}

impl Hub {
    /// Create a hub and its handle.
    pub fn new() -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();

        let hub = Self {
            register_rx,
            unregister_rx,
            broadcast_rx,
            clients: HashMap::new(),
            subscriptions: HashMap::new(),
        };
        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
        };
        (hub, handle)
    }

    /// Run the event loop until every inbound channel has closed.
    ///
    /// Messages on a single channel are handled in send order; there is
    /// no ordering guarantee across the three channels beyond dequeue
    /// order here.
    pub async fn run(mut self) {
        let mut register_open = true;
        let mut unregister_open = true;
        let mut broadcast_open = true;

        loop {
            // Admission and removal are drained before fan-out
            tokio::select! {
                biased;

                session = self.register_rx.recv(), if register_open => match session {
                    Some(session) => self.add_client(session),
                    None => register_open = false,
                },
                id = self.unregister_rx.recv(), if unregister_open => match id {
                    Some(id) => {
                        if self.clients.contains_key(&id) {
                            self.remove_client(id);
                        }
                    }
                    None => unregister_open = false,
                },
                message = self.broadcast_rx.recv(), if broadcast_open => match message {
                    Some(message) => self.broadcast(message),
                    None => broadcast_open = false,
                },
                else => break,
            }
        }
        debug!("hub inbound channels closed, loop exiting");
    }

    fn add_client(&mut self, session: Session) {
        let id = session.id();
        for channel in session.channels() {
            self.subscriptions
                .entry(channel.clone())
                .or_default()
                .insert(id);
            debug!(id, channel = %channel, "client subscribed");
        }
        self.clients.insert(id, session);
    }

    /// Remove a session from `clients` and from every per-channel set,
    /// pruning sets that become empty. Dropping the session closes its
    /// send queue, which releases the connection's writer task.
    fn remove_client(&mut self, id: SessionId) {
        let Some(session) = self.clients.remove(&id) else {
            return;
        };
        for channel in session.channels() {
            if let Some(subscribers) = self.subscriptions.get_mut(channel) {
                subscribers.remove(&id);
                if subscribers.is_empty() {
                    self.subscriptions.remove(channel);
                }
            }
        }
        debug!(id, user_id = %session.user_id(), "client removed");
    }

    fn broadcast(&mut self, message: Message) {
        let Some(subscribers) = self.subscriptions.get(&message.channel) else {
            return;
        };

        // A full queue is a slow consumer; a closed one is already dead.
        // Either way the client is removed before the next inbound
        // message is processed.
        let mut doomed: Vec<SessionId> = Vec::new();
        for &id in subscribers {
            let Some(session) = self.clients.get(&id) else {
                continue;
            };
            if session.offer(message.clone()).is_err() {
                doomed.push(id);
            }
        }

        for id in doomed {
            debug!(id, channel = %message.channel, "slow consumer disconnected");
            self.remove_client(id);
        }
    }
}
