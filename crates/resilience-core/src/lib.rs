//! Shared event infrastructure for the resilience-core pattern crates.
//!
//! This crate provides the observability plumbing consumed by pattern crates
//! that need an event stream, currently `resilience-circuitbreaker`
//! (`resilience-retry` is a pure function with nothing to report):
//! - A `ResilienceEvent` trait every pattern-specific event enum implements.
//! - An `EventListener` trait and a panic-isolating `EventListeners` registry.
//! - A `FnListener` adapter so callers can register plain closures.

pub mod events;

pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
