//! Meter registry: lifecycle owner and usage query router

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument};

use pulsemeter_common::{
    Clock, CounterCell, ItemResolver, LookupError, SinkValue, CONF_TICK,
};

use crate::config::EngineSettings;
use crate::interval::{fullday_interval, SpanArg};
use crate::metering::meter::{Meter, MeterDraft};

/// Owns the configured meters and routes usage queries
///
/// Lifecycle: feed every configuration entry through
/// [`parse_entry`](Self::parse_entry), then [`activate`](Self::activate)
/// once all host items are known. Only meters whose completion succeeded
/// remain queryable.
pub struct MeterRegistry {
    resolver: Arc<dyn ItemResolver>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    drafts: Mutex<HashMap<String, MeterDraft>>,
    meters: DashMap<String, Arc<Meter>>,
    running: AtomicBool,
}

impl MeterRegistry {
    /// Create an inactive registry
    pub fn new(
        resolver: Arc<dyn ItemResolver>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            resolver,
            clock,
            settings,
            drafts: Mutex::new(HashMap::new()),
            meters: DashMap::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Feed one configuration entry
    ///
    /// Entries without a tick source reference are not meter entries and
    /// are ignored. A failing entry is logged and skipped, never fatal to
    /// the registry.
    pub fn parse_entry(&self, cell: Arc<dyn CounterCell>) {
        if cell.conf(CONF_TICK).is_none() {
            return;
        }

        match MeterDraft::try_build(cell) {
            Ok(draft) => {
                // Last registration for an id wins.
                self.drafts.lock().insert(draft.id().to_string(), draft);
            }
            Err(err) => {
                error!(%err, "Skipping meter entry");
            }
        }
    }

    /// Complete all parsed drafts and mark the registry running
    ///
    /// Drafts that fail completion are dropped; only resolved meters stay
    /// in the active set.
    pub fn activate(&self) {
        let drafts: Vec<MeterDraft> = {
            let mut drafts = self.drafts.lock();
            drafts.drain().map(|(_, draft)| draft).collect()
        };

        for draft in drafts {
            let id = draft.id().to_string();
            match draft.complete(self.resolver.as_ref()) {
                Ok(meter) => {
                    self.meters.insert(meter.id().to_string(), meter);
                }
                Err(err) => {
                    error!(meter = %id, %err, "Meter completion failed, meter removed");
                }
            }
        }

        let count = self.meters.len();
        if count > 0 {
            info!(meters = count, "Metering active");
        } else {
            info!("Metering inactive, no meters have been found");
        }

        self.running.store(true, Ordering::SeqCst);
    }

    /// Mark the registry as stopped
    ///
    /// Tick subscriptions stay in place; the host tears down the
    /// underlying items at shutdown.
    pub fn deactivate(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether activate has run and deactivate has not
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of active meters
    pub fn meter_count(&self) -> usize {
        self.meters.len()
    }

    /// Historical usage of one meter over a day-aligned window
    ///
    /// `start` and `length` accept a plain day count or `<integer><unit>`
    /// with unit d/w/m/y. When given, `from_sink` and `to_sink` receive
    /// the window boundary dates formatted per the configured date format;
    /// unresolved sinks are skipped. All failures are logged and answered
    /// with `None`.
    #[instrument(skip_all, fields(meter = %meter_id))]
    pub fn get_usage(
        &self,
        meter_id: &str,
        start: impl Into<SpanArg>,
        length: impl Into<SpanArg>,
        from_sink: Option<&str>,
        to_sink: Option<&str>,
    ) -> Option<f64> {
        let meter = self.find_meter(meter_id)?;

        let today = self.clock.now().date_naive();
        let interval = match fullday_interval(today, &start.into(), &length.into()) {
            Ok(interval) => interval,
            // Already logged by the interval helper.
            Err(_) => return None,
        };

        self.write_boundary(from_sink, interval.start());
        self.write_boundary(to_sink, interval.end());

        Some(meter.usage(&interval))
    }

    fn find_meter(&self, meter_id: &str) -> Option<Arc<Meter>> {
        match self.meters.get(meter_id) {
            Some(meter) => Some(Arc::clone(meter.value())),
            None => {
                error!(err = %LookupError::MeterNotFound(meter_id.to_string()), "Usage query rejected");
                None
            }
        }
    }

    fn write_boundary(&self, sink_name: Option<&str>, boundary: DateTime<Utc>) {
        let Some(name) = sink_name else { return };
        match self.resolver.sink(name) {
            Some(sink) => {
                let formatted = boundary.format(&self.settings.date_format).to_string();
                sink.write(SinkValue::Text(formatted));
            }
            None => {
                // Date sinks are optional; a miss is not an error.
                debug!(sink = %name, "Date sink not found, skipped");
            }
        }
    }
}
