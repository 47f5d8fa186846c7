//! Client session handle
//!
//! A session binds one connected client to the hub: an identifier, the
//! immutable channel list granted by its ticket, and the sending half of
//! a bounded outbound queue. The hub owns the `Session`; the connection's
//! writer task owns the matching receiver and drains it to the transport.

use crate::hub::Message;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Capacity of the per-session outbound queue.
///
/// A queue that fills up marks the client as a slow consumer; the hub
/// disconnects it rather than let one stalled socket delay the rest.
pub const SEND_QUEUE_CAPACITY: usize = 256;

/// Unique identifier of a session within this process.
pub type SessionId = u64;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Hub-side handle for one connected client.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    user_id: String,
    channels: Vec<String>,
    sender: mpsc::Sender<Message>,
}

impl Session {
    /// Create a session and the receiving half of its outbound queue.
    ///
    /// The receiver goes to the connection's writer task; when the hub
    /// drops the `Session`, the queue closes and the writer task winds
    /// down with a normal close.
    pub fn new(
        user_id: impl Into<String>,
        channels: Vec<String>,
    ) -> (Self, mpsc::Receiver<Message>) {
        let (sender, receiver) = mpsc::channel(SEND_QUEUE_CAPACITY);
        let session = Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            user_id: user_id.into(),
            channels,
            sender,
        };
        (session, receiver)
    }

    /// Process-unique session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// User this session was admitted for.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Channels fixed at admission time.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Non-blocking offer of a message to the outbound queue.
    ///
    /// Fails when the queue is full (slow consumer) or the receiving
    /// side is gone; either way the hub treats it as grounds for removal.
    pub(crate) fn offer(&self, message: Message) -> Result<(), mpsc::error::TrySendError<Message>> {
        self.sender.try_send(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(n: i64) -> Message {
        Message {
            channel: "c".into(),
            data: json!(n),
        }
    }

    #[test]
    fn ids_are_unique() {
        let (a, _ra) = Session::new("u", vec![]);
        let (b, _rb) = Session::new("u", vec![]);
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn offer_fails_once_queue_is_full() {
        let (session, mut receiver) = Session::new("u", vec!["c".into()]);

        for i in 0..SEND_QUEUE_CAPACITY {
            session.offer(message(i as i64)).unwrap();
        }
        assert!(session.offer(message(-1)).is_err());

        // Draining one slot makes room again
        assert_eq!(receiver.recv().await.unwrap().data, json!(0));
        session.offer(message(-2)).unwrap();
    }

    #[tokio::test]
    async fn dropping_session_closes_queue() {
        let (session, mut receiver) = Session::new("u", vec![]);
        session.offer(message(1)).unwrap();
        drop(session);

        assert_eq!(receiver.recv().await.unwrap().data, json!(1));
        assert!(receiver.recv().await.is_none());
    }
}
