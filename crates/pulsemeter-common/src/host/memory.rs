//! In-process host implementations
//!
//! Reference implementations of the host traits backed by plain in-memory
//! state. Embedders without a full item registry can wire meters against
//! these; the test suites use them throughout.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use super::{
    Aggregate, Clock, CounterCell, ItemResolver, SinkValue, TickHandler, TickSource, ValueSink,
};

/// Counter cell held in process memory
///
/// Carries its own history as `(timestamp_ms, value)` samples so min/max
/// queries can be answered without an external store.
pub struct MemoryCell {
    id: String,
    value: Mutex<f64>,
    conf: HashMap<String, String>,
    history: Mutex<Vec<(i64, f64)>>,
}

impl MemoryCell {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: Mutex::new(0.0),
            conf: HashMap::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Attach a configuration entry
    pub fn with_conf(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conf.insert(key.into(), value.into());
        self
    }

    /// Record a historical sample for later min/max queries
    pub fn record(&self, ts_ms: i64, value: f64) {
        self.history.lock().push((ts_ms, value));
    }
}

impl CounterCell for MemoryCell {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn value(&self) -> f64 {
        *self.value.lock()
    }

    fn set_value(&self, value: f64) {
        *self.value.lock() = value;
    }

    fn history(&self, agg: Aggregate, from_ms: i64, to_ms: i64) -> Option<f64> {
        let samples = self.history.lock();
        let in_range = samples
            .iter()
            .filter(|(ts, _)| *ts >= from_ms && *ts <= to_ms)
            .map(|(_, value)| *value);
        match agg {
            Aggregate::Min => in_range.reduce(f64::min),
            Aggregate::Max => in_range.reduce(f64::max),
        }
    }

    fn conf(&self, key: &str) -> Option<String> {
        self.conf.get(key).cloned()
    }
}

/// Sink that retains everything written to it
#[derive(Default)]
pub struct MemorySink {
    writes: Mutex<Vec<SinkValue>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All values written so far, oldest first
    pub fn writes(&self) -> Vec<SinkValue> {
        self.writes.lock().clone()
    }

    /// Most recent write, if any
    pub fn last(&self) -> Option<SinkValue> {
        self.writes.lock().last().cloned()
    }

    /// Most recent numeric write, if any
    pub fn last_number(&self) -> Option<f64> {
        match self.last() {
            Some(SinkValue::Number(value)) => Some(value),
            _ => None,
        }
    }

    /// Most recent text write, if any
    pub fn last_text(&self) -> Option<String> {
        match self.last() {
            Some(SinkValue::Text(value)) => Some(value),
            _ => None,
        }
    }
}

impl ValueSink for MemorySink {
    fn write(&self, value: SinkValue) {
        self.writes.lock().push(value);
    }
}

/// Tick source driven by explicit [`fire`](ManualTickSource::fire) calls
///
/// Handlers run synchronously on the firing thread; `elapsed` becomes the
/// `prev_age` handlers observe during the callbacks.
#[derive(Default)]
pub struct ManualTickSource {
    handlers: RwLock<Vec<Arc<dyn TickHandler>>>,
    prev_age: Mutex<Option<f64>>,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire one tick with the given seconds-since-previous-change
    pub fn fire(&self, elapsed: Option<f64>) {
        *self.prev_age.lock() = elapsed;
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            handler.on_tick();
        }
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl TickSource for ManualTickSource {
    fn subscribe(&self, handler: Arc<dyn TickHandler>) {
        self.handlers.write().push(handler);
    }

    fn prev_age(&self) -> Option<f64> {
        *self.prev_age.lock()
    }
}

/// Item lookup backed by name-keyed maps
#[derive(Default)]
pub struct MemoryResolver {
    ticks: RwLock<HashMap<String, Arc<dyn TickSource>>>,
    sinks: RwLock<HashMap<String, Arc<dyn ValueSink>>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tick_source(&self, name: impl Into<String>, source: Arc<dyn TickSource>) {
        self.ticks.write().insert(name.into(), source);
    }

    pub fn add_sink(&self, name: impl Into<String>, sink: Arc<dyn ValueSink>) {
        self.sinks.write().insert(name.into(), sink);
    }
}

impl ItemResolver for MemoryResolver {
    fn tick_source(&self, name: &str) -> Option<Arc<dyn TickSource>> {
        self.ticks.read().get(name).cloned()
    }

    fn sink(&self, name: &str) -> Option<Arc<dyn ValueSink>> {
        self.sinks.read().get(name).cloned()
    }
}

/// Clock pinned to a fixed instant, for deterministic interval math
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Clock reading the system time
#[derive(Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
