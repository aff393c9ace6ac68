//! Audio group policy engine
//!
//! Classifies newly created audio streams into configured audio groups using
//! declarative match rules, and binds their volume/mute controls to the
//! group's controls through the host routing service.

pub mod domain;
