//! Chrome DevTools Protocol plumbing.
//!
//! Single WebSocket connection, multiplexed sessions, request/response
//! matching by ID, events on a broadcast channel.

pub mod client;
pub mod protocol;
pub mod session;

pub use client::{CdpClient, CdpError};
pub use protocol::{CdpEvent, CdpRequest, CdpResponse, TargetInfo};
pub use session::CdpSession;
