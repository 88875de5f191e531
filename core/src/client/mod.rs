//! Correlated, framed connection to the proxy process.
//!
//! [`ProxyConnection`] owns one byte stream to the proxy. It runs a single
//! receive loop that resolves replies through [`PendingReplies`] and hands
//! inbound requests and events to the registered [`InboundHandler`]s.

mod connection;
mod correlation;

pub use connection::{InboundHandler, ProxyConnection};
pub use correlation::{PendingReplies, PendingReply};
