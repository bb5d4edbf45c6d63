use tracing::debug;

use crate::{
    client::WireClient,
    delta::{DeltaTracker, SeriesKey},
    sample::{InvalidSampleError, MetricSample},
};

/// A single reporting pass.
///
/// Callers feed every gauge and counter from a registry snapshot into the session, then flush and close it.
pub trait Session {
    /// Adds a gauge to the session.
    ///
    /// # Errors
    ///
    /// If the sample has no data points, an error is returned.
    fn add_gauge(&mut self, gauge: &MetricSample) -> Result<(), InvalidSampleError>;

    /// Adds a counter to the session.
    ///
    /// # Errors
    ///
    /// If the sample has no data points, an error is returned.
    fn add_counter(&mut self, counter: &MetricSample) -> Result<(), InvalidSampleError>;

    /// Commits everything added so far.
    fn flush(&mut self);

    /// Ends the session.
    fn close(self)
    where
        Self: Sized;
}

/// A reporting pass over a [`UdpTransport`][crate::UdpTransport].
///
/// DogStatsD has no notion of a batch, so every sample is sent the moment it is added, and [`flush`][Session::flush]
/// has nothing to do. Closing the session leaves the transport open for the next pass.
pub struct UdpSession<'a> {
    client: &'a WireClient,
    deltas: &'a DeltaTracker,
    gauges: usize,
    counters: usize,
}

impl<'a> UdpSession<'a> {
    pub(crate) fn new(client: &'a WireClient, deltas: &'a DeltaTracker) -> Self {
        Self { client, deltas, gauges: 0, counters: 0 }
    }
}

impl<'a> Session for UdpSession<'a> {
    fn add_gauge(&mut self, gauge: &MetricSample) -> Result<(), InvalidSampleError> {
        let value = gauge.first_value()?;
        self.client.send_gauge(&gauge.metric, value, &gauge.tags);
        self.gauges += 1;

        Ok(())
    }

    fn add_counter(&mut self, counter: &MetricSample) -> Result<(), InvalidSampleError> {
        let absolute = counter.first_count()?;

        // DogStatsD expects the increment since the last report, not the running total.
        let key = SeriesKey::new(&counter.metric, counter.tags.as_slice());
        let delta = self.deltas.delta(key, absolute);

        self.client.send_count(&counter.metric, delta, &counter.tags);
        self.counters += 1;

        Ok(())
    }

    fn flush(&mut self) {}

    fn close(self) {
        debug!(gauges = self.gauges, counters = self.counters, "Finished reporting pass.");
    }
}
