//! Channel-oriented pub/sub hub for Hearth
//!
//! A single-writer event loop owns all hub state; registration,
//! removal and fan-out arrive as messages on inbound channels, never as
//! direct mutation. Connection admission is governed by one-time tickets.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hub;
pub mod session;
pub mod ticket;

pub use hub::{Hub, HubHandle, Message};
pub use session::{Session, SessionId, SEND_QUEUE_CAPACITY};
pub use ticket::{TicketInfo, TicketStore};
