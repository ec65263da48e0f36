//! # Pulsemeter Engine
//!
//! Turns a stream of discrete tick events into a cumulative counter value
//! and a smoothed instantaneous rate ("power"), and answers historical
//! usage queries over day-aligned windows.
//!
//! ## Core pieces
//!
//! - [`metering::Meter`]: per-counter state machine driven by tick events
//! - [`metering::MeterRegistry`]: meter lifecycle owner and usage query
//!   router
//! - [`interval`]: day-span parsing and full-day window arithmetic
//! - [`config::EngineSettings`]: environment-driven settings
//!
//! Counter storage, tick delivery, item lookup and the clock are host
//! collaborators injected through the traits in [`pulsemeter_common::host`].

pub mod config;
pub mod interval;
pub mod metering;

// Re-export the externally driven surface at crate root
pub use config::EngineSettings;
pub use interval::{fullday_interval, SpanArg, UsageInterval};
pub use metering::{Meter, MeterDraft, MeterRegistry};
