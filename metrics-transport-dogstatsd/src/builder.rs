use std::sync::Arc;

use thiserror::Error;

use crate::{
    client::{ErrorHandler, LoggingErrorHandler, WireClient},
    delta::DeltaTracker,
    resolver::{ResolutionError, RetryingResolver, StaticResolver},
    transport::UdpTransport,
};

const DEFAULT_STATSD_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8125;

/// Errors that could occur while building a UDP transport.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to resolve the address of the DogStatsD server.
    #[error("failed to resolve DogStatsD server address: {0}")]
    Resolution(#[from] ResolutionError),
}

/// Builder for a [`UdpTransport`].
pub struct UdpTransportBuilder {
    statsd_host: String,
    port: u16,
    retrying_lookup: bool,
    prefix: Option<String>,
    global_tags: Vec<String>,
    error_handler: Box<dyn ErrorHandler>,
    deltas: Option<Arc<DeltaTracker>>,
    telemetry: bool,
}

impl UdpTransportBuilder {
    /// Set the host of the DogStatsD server.
    ///
    /// Defaults to `localhost`.
    #[must_use]
    pub fn with_statsd_host<H>(mut self, host: H) -> Self
    where
        H: Into<String>,
    {
        self.statsd_host = host.into();
        self
    }

    /// Set the port of the DogStatsD server.
    ///
    /// Defaults to 8125.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets whether or not to resolve the DogStatsD server address for every metric sent.
    ///
    /// When disabled, the address is resolved once, when the transport is built, and building fails if it can't be
    /// resolved. When enabled, the address is resolved again before every send, which lets the transport follow the
    /// server across IP changes without being rebuilt. Lookup failures are then reported to the error handler, and the
    /// affected metric is dropped.
    ///
    /// Defaults to `false`.
    #[must_use]
    pub fn with_retrying_lookup(mut self, retrying_lookup: bool) -> Self {
        self.retrying_lookup = retrying_lookup;
        self
    }

    /// Set a prefix for all metric names.
    ///
    /// The prefix is joined to metric names with a period: a prefix of `app` turns `requests` into `app.requests`.
    ///
    /// Defaults to no prefix.
    #[must_use]
    pub fn with_prefix<P>(mut self, prefix: P) -> Self
    where
        P: Into<String>,
    {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set tags to apply to every metric.
    ///
    /// Global tags are written after the tags of the metric itself, and do not affect how counters are tracked.
    ///
    /// Defaults to no tags.
    #[must_use]
    pub fn with_global_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.global_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the handler for errors that occur while sending metrics.
    ///
    /// Defaults to [`LoggingErrorHandler`], which logs each error.
    #[must_use]
    pub fn with_error_handler<E>(mut self, error_handler: E) -> Self
    where
        E: ErrorHandler + 'static,
    {
        self.error_handler = Box::new(error_handler);
        self
    }

    /// Set the delta tracker used to convert counter readings into increments.
    ///
    /// Supplying a tracker lets it be inspected, or shared with another transport reporting the same counters.
    ///
    /// Defaults to a new, empty tracker.
    #[must_use]
    pub fn with_delta_tracker(mut self, deltas: Arc<DeltaTracker>) -> Self {
        self.deltas = Some(deltas);
        self
    }

    /// Sets whether or not to enable telemetry for the transport.
    ///
    /// When enabled, the transport records how many metrics, packets and bytes it sent or dropped, as metrics emitted
    /// through the globally installed [`metrics`] recorder.
    ///
    /// Defaults to `true`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: bool) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Builds the transport.
    ///
    /// # Errors
    ///
    /// If retrying lookups are disabled and the DogStatsD server address cannot be resolved, an error will be
    /// returned.
    pub fn build(self) -> Result<UdpTransport, BuildError> {
        let client = if self.retrying_lookup {
            let resolver = RetryingResolver::new(self.statsd_host, self.port);
            WireClient::from_boxed(Box::new(resolver), self.prefix, &self.global_tags, self.error_handler)
        } else {
            let resolver = StaticResolver::new(&self.statsd_host, self.port)?;
            WireClient::from_boxed(Box::new(resolver), self.prefix, &self.global_tags, self.error_handler)
        };

        let client = if self.telemetry { client.with_telemetry() } else { client };
        let deltas = self.deltas.unwrap_or_default();

        Ok(UdpTransport::new(client, deltas))
    }
}

impl Default for UdpTransportBuilder {
    fn default() -> Self {
        UdpTransportBuilder {
            statsd_host: DEFAULT_STATSD_HOST.to_string(),
            port: DEFAULT_PORT,
            retrying_lookup: false,
            prefix: None,
            global_tags: Vec::new(),
            error_handler: Box::new(LoggingErrorHandler),
            deltas: None,
            telemetry: true,
        }
    }
}
