//! One-time connection tickets
//!
//! A ticket is a short-lived opaque credential authorizing exactly one
//! session upgrade and fixing the channel set that session may subscribe
//! to. Tokens come from the operating system CSPRNG. There is no purge
//! worker; expired entries are reaped lazily by `validate`.

use hearth_core::now_secs;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use tracing::debug;

/// Number of random bytes per token (hex-encoded to twice this length).
const TOKEN_BYTES: usize = 16;

/// What a ticket grants once redeemed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketInfo {
    /// User the ticket was issued to
    pub user_id: String,
    /// Channels the resulting session may subscribe to
    pub channels: Vec<String>,
    /// Absolute expiration, seconds since the Unix epoch
    pub expires_at: i64,
}

/// Store of outstanding (not yet redeemed) tickets.
#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: Mutex<HashMap<String, TicketInfo>>,
}

impl TicketStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for `user_id` limited to `channels`, valid for
    /// `ttl_seconds` from now. Returns the lowercase-hex token.
    pub fn create(
        &self,
        user_id: impl Into<String>,
        channels: Vec<String>,
        ttl_seconds: i64,
    ) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let info = TicketInfo {
            user_id: user_id.into(),
            channels,
            expires_at: now_secs() + ttl_seconds,
        };

        self.tickets.lock().insert(token.clone(), info);
        token
    }

    /// Redeem a token.
    ///
    /// The token is deleted before the expiry check, so it is consumed by
    /// exactly one `validate` call that observes it, whether or not that
    /// call accepts it. Returns `None` for unknown, already-redeemed or
    /// expired tokens.
    pub fn validate(&self, token: &str) -> Option<TicketInfo> {
        let info = self.tickets.lock().remove(token)?;

        if now_secs() > info.expires_at {
            debug!(user_id = %info.user_id, "ticket expired at redemption");
            return None;
        }
        Some(info)
    }

    /// Number of outstanding tickets, expired ones included.
    pub fn outstanding(&self) -> usize {
        self.tickets.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_32_lowercase_hex_chars() {
        let store = TicketStore::new();
        let token = store.create("u1", vec!["room/a".into()], 15);
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tokens_are_unique() {
        let store = TicketStore::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(store.create("u", vec![], 15)));
        }
    }

    #[test]
    fn valid_ticket_redeems_once() {
        let store = TicketStore::new();
        let token = store.create("u1", vec!["room/a".into(), "room/b".into()], 15);

        let info = store.validate(&token).unwrap();
        assert_eq!(info.user_id, "u1");
        assert_eq!(info.channels, vec!["room/a", "room/b"]);

        // One-time use: the same token never validates twice
        assert!(store.validate(&token).is_none());
        assert_eq!(store.outstanding(), 0);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = TicketStore::new();
        assert!(store.validate("deadbeefdeadbeefdeadbeefdeadbeef").is_none());
    }

    #[test]
    fn expired_ticket_is_rejected_and_consumed() {
        let store = TicketStore::new();
        let token = store.create("u1", vec![], -1);

        assert!(store.validate(&token).is_none());
        // Consumed on first observation even though it was rejected
        assert_eq!(store.outstanding(), 0);
    }

    #[test]
    fn expiry_check_happens_after_deletion() {
        let store = TicketStore::new();
        let live = store.create("u1", vec![], 60);
        let dead = store.create("u2", vec![], -1);
        assert_eq!(store.outstanding(), 2);

        assert!(store.validate(&dead).is_none());
        assert_eq!(store.outstanding(), 1);

        assert!(store.validate(&live).is_some());
        assert_eq!(store.outstanding(), 0);
    }
}
