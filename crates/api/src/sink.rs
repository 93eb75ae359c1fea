//! Latest-value gauges for scraping
//!
//! The adapter only sees the [`MetricsSink`] trait. Updates are
//! infallible and never block on I/O.

use metrics::{describe_gauge, gauge, with_local_recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

pub const TEMPERATURE_GAUGE: &str = "htcollector_readings_temperature";
pub const HUMIDITY_GAUGE: &str = "htcollector_readings_humidity";

/// Destination for the most recent reading of each station
pub trait MetricsSink: Send + Sync {
    /// Overwrite the temperature and humidity gauges of a station
    fn record_reading(&self, station_id: Option<&str>, temperature: f64, humidity: f64);

    /// Text exposition of the current gauge values
    fn render(&self) -> String {
        String::new()
    }
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record_reading(&self, _station_id: Option<&str>, _temperature: f64, _humidity: f64) {}
}

/// Prometheus gauges, labelled by `stationid`
///
/// Owns its recorder instead of installing a global one, so several
/// instances can coexist in one process.
pub struct PrometheusSink {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl PrometheusSink {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            describe_gauge!(TEMPERATURE_GAUGE, "The current temperature reading");
            describe_gauge!(HUMIDITY_GAUGE, "The current humidity reading");
        });

        Self { recorder, handle }
    }
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for PrometheusSink {
    fn record_reading(&self, station_id: Option<&str>, temperature: f64, humidity: f64) {
        with_local_recorder(&self.recorder, || match station_id {
            Some(id) => {
                gauge!(TEMPERATURE_GAUGE, "stationid" => id.to_string()).set(temperature);
                gauge!(HUMIDITY_GAUGE, "stationid" => id.to_string()).set(humidity);
            }
            None => {
                gauge!(TEMPERATURE_GAUGE).set(temperature);
                gauge!(HUMIDITY_GAUGE).set(humidity);
            }
        });
    }

    fn render(&self) -> String {
        self.handle.render()
    }
}
