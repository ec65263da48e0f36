//! # Pulsemeter Common
//!
//! Shared error taxonomy and host collaborator abstractions for the
//! pulsemeter metering engine.
//!
//! ## Core pieces
//!
//! - [`error`]: unified [`MeterError`] with configuration, lookup and
//!   interval variants
//! - [`host`]: injected traits for counter cells, tick sources, sinks,
//!   item lookup and the clock
//! - [`host::memory`]: in-process reference implementations of the host
//!   traits
//! - [`host::channel`]: tokio-channel backed tick delivery

pub mod error;
pub mod host;

// Re-export commonly used types at crate root
pub use error::{ConfigError, IntervalError, LookupError, MeterError, Result};
pub use host::{
    Aggregate, Clock, CounterCell, ItemResolver, SinkValue, TickHandler, TickSource, ValueSink,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of instantaneous rate samples kept for power smoothing
pub const POWER_SAMPLE_WINDOW: usize = 10;

/// Counter advance applied per tick when none is configured
pub const DEFAULT_INCREMENT: f64 = 1.0;

/// Conf key marking an entry as a meter and naming its tick source
pub const CONF_TICK: &str = "meter_tick";

/// Conf key overriding the per-tick counter increment
pub const CONF_INCREMENT: &str = "meter_increment";

/// Conf key naming the sink that receives the smoothed power figure
pub const CONF_POWER: &str = "meter_power";
