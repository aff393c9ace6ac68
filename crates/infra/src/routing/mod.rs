//! Routing service implementations and shared engine state

pub mod memory_host;
pub mod shared;

pub use memory_host::*;
pub use shared::*;
