//! End-to-end engine tests
//!
//! Wires a registry against the in-process host implementations and drives
//! the full lifecycle: parse entries, activate, tick, query usage.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use pulsemeter_common::host::channel::ChannelTickSource;
use pulsemeter_common::host::memory::{
    FixedClock, ManualTickSource, MemoryCell, MemoryResolver, MemorySink, SystemClock,
};
use pulsemeter_common::{Clock, CounterCell, CONF_INCREMENT, CONF_POWER, CONF_TICK};
use pulsemeter_engine::{EngineSettings, MeterRegistry};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

#[test]
fn full_lifecycle_counts_reports_power_and_answers_usage() {
    init_tracing();

    let resolver = Arc::new(MemoryResolver::new());
    let tick = Arc::new(ManualTickSource::new());
    let power = Arc::new(MemorySink::new());
    let from = Arc::new(MemorySink::new());
    let to = Arc::new(MemorySink::new());
    resolver.add_tick_source("garage.s0", tick.clone());
    resolver.add_sink("garage.power", power.clone());
    resolver.add_sink("ui.from", from.clone());
    resolver.add_sink("ui.to", to.clone());

    let meter_cell = Arc::new(
        MemoryCell::new("garage.energy")
            .with_conf(CONF_TICK, "garage.s0")
            .with_conf(CONF_INCREMENT, "0.5")
            .with_conf(CONF_POWER, "garage.power"),
    );
    // Counter readings recorded by the external store across two days.
    meter_cell.record(noon(2024, 1, 7).timestamp_millis(), 120.0);
    meter_cell.record(noon(2024, 1, 8).timestamp_millis(), 145.5);

    let plain_cell = Arc::new(MemoryCell::new("garage.temperature"));
    let broken_cell = Arc::new(MemoryCell::new("attic.energy").with_conf(CONF_TICK, "attic.s0"));

    let registry = MeterRegistry::new(
        resolver,
        Arc::new(FixedClock::new(noon(2024, 1, 10))),
        EngineSettings::default(),
    );
    registry.parse_entry(meter_cell.clone());
    registry.parse_entry(plain_cell);
    registry.parse_entry(broken_cell);
    registry.activate();

    // Only the fully wired meter survives activation.
    assert_eq!(registry.meter_count(), 1);
    assert!(registry.is_running());

    // Two ticks 30 minutes apart: 0.5 units each, 1.0 units/h smoothed.
    tick.fire(Some(1800.0));
    tick.fire(Some(1800.0));
    assert_eq!(meter_cell.value(), 1.0);
    assert_eq!(power.last_number(), Some(1.0));

    // Usage over 2024-01-07 .. 2024-01-08 with boundary dates exported.
    let usage = registry.get_usage("garage.energy", "3d", "2d", Some("ui.from"), Some("ui.to"));
    assert_eq!(usage, Some(25.5));
    assert_eq!(from.last_text().as_deref(), Some("07.01.2024"));
    assert_eq!(to.last_text().as_deref(), Some("08.01.2024"));

    registry.deactivate();
    assert!(!registry.is_running());
}

#[test]
fn system_clock_is_close_to_chrono_now() {
    let clock = SystemClock::new();
    let delta = (Utc::now() - clock.now()).num_seconds().abs();
    assert!(delta <= 1);
}

#[tokio::test]
async fn channel_fed_meter_counts_ticks() {
    init_tracing();

    let (source, tx) = ChannelTickSource::spawn();
    let resolver = Arc::new(MemoryResolver::new());
    resolver.add_tick_source("hall.s0", source);

    let cell = Arc::new(MemoryCell::new("hall.energy").with_conf(CONF_TICK, "hall.s0"));
    let registry = MeterRegistry::new(
        resolver,
        Arc::new(SystemClock::new()),
        EngineSettings::default(),
    );
    registry.parse_entry(cell.clone());
    registry.activate();
    assert_eq!(registry.meter_count(), 1);

    for _ in 0..4 {
        tx.send(()).unwrap();
    }

    // The dispatch task drains the channel in the background.
    for _ in 0..100 {
        if cell.value() >= 4.0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(cell.value(), 4.0);
}

proptest! {
    // N ticks at increment k always accumulate to N * k.
    #[test]
    fn counter_accumulates_n_times_increment(n in 0usize..200, k in 0.001f64..1000.0) {
        let resolver = Arc::new(MemoryResolver::new());
        let tick = Arc::new(ManualTickSource::new());
        resolver.add_tick_source("prop.tick", tick.clone());

        let cell = Arc::new(
            MemoryCell::new("prop.meter")
                .with_conf(CONF_TICK, "prop.tick")
                .with_conf(CONF_INCREMENT, k.to_string()),
        );
        let registry = MeterRegistry::new(
            resolver,
            Arc::new(FixedClock::new(noon(2024, 1, 10))),
            EngineSettings::default(),
        );
        registry.parse_entry(cell.clone());
        registry.activate();
        prop_assert_eq!(registry.meter_count(), 1);

        for _ in 0..n {
            tick.fire(Some(1.0));
        }

        let expected = n as f64 * k;
        let tolerance = expected.abs() * 1e-9 + 1e-9;
        prop_assert!((cell.value() - expected).abs() <= tolerance);
    }

    // The sample window never grows past ten entries, so the reported
    // power converges to the newest rate after ten equal gaps.
    #[test]
    fn window_converges_after_ten_ticks(warmup in 0usize..30) {
        let resolver = Arc::new(MemoryResolver::new());
        let tick = Arc::new(ManualTickSource::new());
        let power = Arc::new(MemorySink::new());
        resolver.add_tick_source("prop.tick", tick.clone());
        resolver.add_sink("prop.power", power.clone());

        let cell = Arc::new(
            MemoryCell::new("prop.meter")
                .with_conf(CONF_TICK, "prop.tick")
                .with_conf(CONF_POWER, "prop.power"),
        );
        let registry = MeterRegistry::new(
            resolver,
            Arc::new(FixedClock::new(noon(2024, 1, 10))),
            EngineSettings::default(),
        );
        registry.parse_entry(cell);
        registry.activate();

        for _ in 0..warmup {
            tick.fire(Some(360.0));
        }
        for _ in 0..10 {
            tick.fire(Some(3600.0));
        }

        // Ten most recent rates are all 1.0, whatever came before.
        let last = power.last_number();
        prop_assert!(last.is_some());
        prop_assert!((last.unwrap_or(0.0) - 1.0).abs() < 1e-9);
    }
}
