//! Host-side implementations for the audio groups engine
//!
//! - [`routing::InMemoryRoutingHost`]: a self-contained routing service that
//!   keeps group objects in memory
//! - [`routing::SharedEngine`]: a reloadable, thread-safe engine handle

pub mod routing;

pub use routing::{HostedGroup, InMemoryRoutingHost, SharedEngine};
