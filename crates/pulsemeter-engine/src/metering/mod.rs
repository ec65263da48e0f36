//! Metering domain
//!
//! Provides the per-counter state machine and its lifecycle owner:
//! - [`MeterDraft`]/[`Meter`]: two-phase construction, tick handling,
//!   historical usage
//! - [`MeterRegistry`]: owns the configured meters and routes usage
//!   queries

pub mod meter;
pub mod registry;

pub use meter::{Meter, MeterDraft};
pub use registry::MeterRegistry;
