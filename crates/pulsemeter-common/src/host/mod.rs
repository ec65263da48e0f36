//! Host collaborator abstractions
//!
//! The engine never owns counter storage, event delivery, item lookup or
//! the clock. Hosts inject these through the traits below:
//!
//! - [`CounterCell`]: the externally owned cumulative reading, its
//!   configuration mapping and its recorded history
//! - [`TickSource`]/[`TickHandler`]: trigger subscription with a typed
//!   handler signature
//! - [`ValueSink`]: writable output cells
//! - [`ItemResolver`]: name-based lookup of tick sources and sinks
//! - [`Clock`]: source of "today" for interval math

pub mod channel;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregation selector for historical counter queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregate {
    Min,
    Max,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Min => f.write_str("min"),
            Aggregate::Max => f.write_str("max"),
        }
    }
}

/// Value written to a sink
///
/// Power figures are numbers; interval boundary dates arrive as
/// preformatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SinkValue {
    Number(f64),
    Text(String),
}

/// Externally owned counter cell backing one meter
pub trait CounterCell: Send + Sync {
    /// Stable identity; the meter id is derived from it
    fn id(&self) -> String;

    /// Human readable label
    fn name(&self) -> String {
        self.id()
    }

    /// Current cumulative reading
    fn value(&self) -> f64;

    /// Overwrite the cumulative reading
    fn set_value(&self, value: f64);

    /// Min or max of the recorded history within `[from_ms, to_ms]`
    /// (UTC milliseconds, inclusive)
    ///
    /// `None` means no data; a store failure is indistinguishable from
    /// no data.
    fn history(&self, agg: Aggregate, from_ms: i64, to_ms: i64) -> Option<f64>;

    /// Configuration value attached to this entry
    fn conf(&self, key: &str) -> Option<String>;
}

/// Receiver side of a tick subscription
pub trait TickHandler: Send + Sync {
    fn on_tick(&self);
}

/// Trigger source a meter subscribes to
///
/// Delivery contract: a source invokes its handlers one at a time, in
/// arrival order. Overlapping invocations for the same handler are not
/// allowed.
pub trait TickSource: Send + Sync {
    /// Register a handler for change events
    fn subscribe(&self, handler: Arc<dyn TickHandler>);

    /// Seconds since the source's previous recorded change, if any
    fn prev_age(&self) -> Option<f64>;
}

/// Writable output cell
pub trait ValueSink: Send + Sync {
    fn write(&self, value: SinkValue);
}

/// Host item lookup for tick sources and sinks
pub trait ItemResolver: Send + Sync {
    fn tick_source(&self, name: &str) -> Option<Arc<dyn TickSource>>;

    fn sink(&self, name: &str) -> Option<Arc<dyn ValueSink>>;
}

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_display() {
        assert_eq!(Aggregate::Min.to_string(), "min");
        assert_eq!(Aggregate::Max.to_string(), "max");
    }
}
