//! rollcall-vision — client for the external face service.
//!
//! The capture, detection and embedding pipeline runs in a
//! separate service process; this crate only speaks its wire protocol
//! and adapts it to the capability traits in rollcall-core.

pub mod client;
pub mod protocol;

pub use client::VisionClient;
pub use protocol::{Request, Response, DEFAULT_SOCKET_PATH};
