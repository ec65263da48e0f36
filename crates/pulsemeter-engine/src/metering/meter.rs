//! Per-counter meter state machine
//!
//! A meter advances its externally owned counter cell on every tick of its
//! trigger source and, when a power sink is configured, maintains a sliding
//! window of instantaneous rates whose mean it reports as smoothed power.
//! A single inter-tick gap is noisy; the fixed-size window gives a
//! bounded-memory approximation of recent average power.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use pulsemeter_common::{
    Aggregate, ConfigError, CounterCell, ItemResolver, LookupError, MeterError, SinkValue,
    TickHandler, TickSource, ValueSink, CONF_INCREMENT, CONF_POWER, CONF_TICK, DEFAULT_INCREMENT,
    POWER_SAMPLE_WINDOW,
};

use crate::interval::UsageInterval;

/// Seconds per hour, the time base of the power figure
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Meter candidate built at parse time, before host items can be resolved
pub struct MeterDraft {
    id: String,
    cell: Arc<dyn CounterCell>,
}

impl MeterDraft {
    /// Build a draft from a counter cell that declares a tick source
    pub fn try_build(cell: Arc<dyn CounterCell>) -> Result<Self, MeterError> {
        let id = cell.id();
        if id.is_empty() {
            return Err(ConfigError::EmptyCounterId.into());
        }
        Ok(Self { id, cell })
    }

    /// Meter id this draft will take
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolve host items, subscribe to the tick source and finish the meter
    ///
    /// An unresolved tick source or a malformed increment fails completion
    /// and the draft must be discarded. An unresolved power sink only
    /// disables power reporting; the meter still completes.
    pub fn complete(self, resolver: &dyn ItemResolver) -> Result<Arc<Meter>, MeterError> {
        let tick_name = self
            .cell
            .conf(CONF_TICK)
            .ok_or_else(|| ConfigError::MissingTickConf(self.id.clone()))?;

        let tick = resolver.tick_source(&tick_name).ok_or_else(|| {
            error!(
                meter = %self.id,
                tick = %tick_name,
                "Tick source not found, meter will be disabled"
            );
            ConfigError::TickSourceNotFound {
                meter: self.id.clone(),
                tick: tick_name.clone(),
            }
        })?;

        let increment = match self.cell.conf(CONF_INCREMENT) {
            Some(raw) => raw.parse::<f64>().map_err(|_| ConfigError::InvalidIncrement {
                meter: self.id.clone(),
                value: raw.clone(),
            })?,
            None => DEFAULT_INCREMENT,
        };

        let (power, power_label) = match self.cell.conf(CONF_POWER) {
            Some(power_name) => match resolver.sink(&power_name) {
                Some(sink) => (Some(sink), power_name),
                None => {
                    error!(
                        meter = %self.id,
                        err = %LookupError::ItemNotFound(power_name),
                        "Power sink not found, power will not be available"
                    );
                    (None, "(not found)".to_string())
                }
            },
            None => (None, "(not available)".to_string()),
        };

        let meter = Arc::new(Meter {
            id: self.id,
            cell: self.cell,
            tick: Arc::clone(&tick),
            increment,
            power,
            samples: Mutex::new(VecDeque::with_capacity(POWER_SAMPLE_WINDOW)),
        });

        tick.subscribe(Arc::clone(&meter) as Arc<dyn TickHandler>);

        info!(
            meter = %meter.id,
            increment = meter.increment,
            tick = %tick_name,
            power = %power_label,
            "Meter initialized"
        );

        Ok(meter)
    }
}

/// A running meter: cumulative counter plus optional smoothed power
pub struct Meter {
    id: String,
    cell: Arc<dyn CounterCell>,
    tick: Arc<dyn TickSource>,
    increment: f64,
    power: Option<Arc<dyn ValueSink>>,
    samples: Mutex<VecDeque<f64>>,
}

impl Meter {
    /// Meter id, derived from the backing counter cell
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human readable name of the backing counter cell
    pub fn name(&self) -> String {
        self.cell.name()
    }

    /// Counter advance applied per tick
    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Historical usage over a day-aligned window
    ///
    /// Max minus min of the recorded counter values, each absent side
    /// counting as 0. Answered entirely from the history store; in-memory
    /// tick state is not consulted and no lock is taken.
    pub fn usage(&self, interval: &UsageInterval) -> f64 {
        let from_ms = interval.start_ms();
        let to_ms = interval.end_ms();

        let min = self
            .cell
            .history(Aggregate::Min, from_ms, to_ms)
            .unwrap_or(0.0);
        let max = self
            .cell
            .history(Aggregate::Max, from_ms, to_ms)
            .unwrap_or(0.0);
        max - min
    }

    fn record_power(&self) {
        let Some(sink) = &self.power else { return };

        let elapsed = match self.tick.prev_age() {
            Some(age) if age > 0.0 => age,
            // No prior change or non-positive gap: rate undefined, skip
            // the sample.
            _ => {
                debug!(meter = %self.id, "Tick without usable elapsed time, power sample skipped");
                return;
            }
        };

        let rate = (SECONDS_PER_HOUR * self.increment / elapsed).max(0.0);

        let mean = {
            let mut samples = self.samples.lock();
            samples.push_back(rate);
            while samples.len() > POWER_SAMPLE_WINDOW {
                samples.pop_front();
            }
            samples.iter().sum::<f64>() / samples.len() as f64
        };

        sink.write(SinkValue::Number(mean));
    }
}

impl TickHandler for Meter {
    fn on_tick(&self) {
        self.cell.set_value(self.cell.value() + self.increment);
        self.record_power();
    }
}
