//! Core types for Hearth
//!
//! This crate defines the foundational pieces shared by every subsystem:
//! - Value: dynamic JSON value stored in the cache
//! - Item: a stored value plus its absolute expiration
//! - Error: unified error type hierarchy
//! - Clock helpers: nanosecond wall-clock timestamps and TTL normalization

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod error;
pub mod item;

pub use clock::{expiry_for_ttl, now_nanos, now_secs, FOREVER_TTL_YEARS};
pub use error::{Error, Result};
pub use item::{Item, Value};
