//! A UDP transport for pushing metrics to a [DogStatsD][dsd]-compatible server.
//!
//! [dsd]: https://docs.datadoghq.com/developers/dogstatsd/
//!
//! # Usage
//!
//! The transport sits between a metrics registry and the DogStatsD server. Something else decides when to report; each
//! time it does, it opens a session, feeds it every gauge and counter from a snapshot of the registry, and closes it:
//!
//! ```no_run
//! # use metrics_transport_dogstatsd::{MetricSample, Session as _, Transport as _, UdpTransportBuilder};
//! // First, create a builder.
//! //
//! // The builder can configure the server address, a prefix for all metric names, tags to apply to every metric, how
//! // send errors are handled, and more.
//! let transport = UdpTransportBuilder::default()
//!     .with_statsd_host("localhost")
//!     .with_port(8125)
//!     .with_prefix("app")
//!     .with_global_tags(["service:checkout"])
//!     .build()
//!     .expect("failed to build transport");
//!
//! // Then, for every reporting pass, open a session and add every sample to it.
//! let mut session = transport.open_session();
//! session
//!     .add_gauge(&MetricSample::gauge("queue.depth", [(1_700_000_000, 42.5)], ["env:prod"]))
//!     .expect("sample has a data point");
//! session
//!     .add_counter(&MetricSample::counter("requests", [(1_700_000_000, 1_250.0)], ["env:prod"]))
//!     .expect("sample has a data point");
//! session.flush();
//! session.close();
//!
//! // Finally, close the transport when shutting down.
//! transport.close();
//! ```
//!
//! # Behavior
//!
//! ## One datagram per metric
//!
//! DogStatsD over UDP has no notion of a batch, and no way to attach a timestamp to a counter or gauge: every metric
//! is attributed to the time it was received. Samples are therefore sent the moment they're added to a session, each in
//! its own datagram, and only the first data point of a sample is used.
//!
//! ## Counters as increments
//!
//! Registries report counters as running totals, but DogStatsD expects the increment since the last report. The
//! transport remembers the last total seen for every series (metric name plus tag set, regardless of tag order) in a
//! [`DeltaTracker`], and sends the difference. A total that goes down, such as after a process restart, is sent as
//! zero and becomes the new baseline.
//!
//! ## Best-effort delivery
//!
//! Sends never block and never fail the caller. If the server address can't be resolved, or the socket refuses a
//! datagram, the error is handed to the configured [`ErrorHandler`] and the metric is dropped. Gauges with a `NaN` or
//! infinite value can't be represented on the wire, and are handled the same way. The only errors a session returns
//! are for samples that carry no data points at all.
//!
//! ## Address resolution
//!
//! By default the server address is resolved once, when the transport is built. With
//! [`with_retrying_lookup`][UdpTransportBuilder::with_retrying_lookup], it is resolved again for every metric
//! instead, so the transport follows the server across IP changes.
//!
//! ## Telemetry
//!
//! The transport captures its own internal telemetry around the number of metrics, packets, and bytes it sent or
//! dropped, and emits it through the globally installed [`metrics`] recorder, under the `datadog.dogstatsd.client`
//! namespace.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, UdpTransportBuilder};

mod client;
pub use self::client::{ErrorHandler, LoggingErrorHandler, TransportError, WireClient};

mod delta;
pub use self::delta::{DeltaTracker, SeriesKey};

mod resolver;
pub use self::resolver::{AddressResolver, ResolutionError, RetryingResolver, StaticResolver};

mod sample;
pub use self::sample::{InvalidSampleError, MetricKind, MetricSample, Point};

mod session;
pub use self::session::{Session, UdpSession};

mod telemetry;

mod transport;
pub use self::transport::{Transport, UdpTransport};

mod writer;
