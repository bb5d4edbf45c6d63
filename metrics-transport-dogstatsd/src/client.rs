use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, trace};

use crate::{
    resolver::{AddressResolver, ResolutionError},
    telemetry::{MetricType, Telemetry},
    writer::MessageWriter,
};

/// Errors that could occur while sending a metric.
///
/// These never propagate out of [`WireClient`]: they are handed to its [`ErrorHandler`], and the metric is dropped.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The address of the DogStatsD server could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The socket could not be bound, or the datagram could not be sent.
    #[error("failed to send metric: {0}")]
    Io(#[from] io::Error),

    /// The value can't be represented on the wire.
    #[error("metric '{metric}' has a non-finite value: {value}")]
    NonFiniteValue {
        /// Name of the metric.
        metric: String,
        /// The rejected value.
        value: f64,
    },

    /// The client was closed.
    #[error("transport is closed")]
    Closed,
}

/// Handles errors that occur while sending metrics.
///
/// Handlers are called synchronously, on the thread that attempted the send.
pub trait ErrorHandler: Send + Sync {
    /// Handles a send error.
    fn handle(&self, error: &TransportError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&TransportError) + Send + Sync,
{
    fn handle(&self, error: &TransportError) {
        self(error);
    }
}

/// An [`ErrorHandler`] that logs errors and otherwise ignores them.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle(&self, error: &TransportError) {
        error!(error = %error, "Failed to send metric.");
    }
}

enum ClientState {
    // Socket has not been bound yet, or was dropped after a failed send.
    Disconnected,

    // Socket is bound and ready to send.
    Ready(UdpSocket),

    // Client has been closed and will not send anything else.
    Closed,
}

impl ClientState {
    fn try_send(&mut self, payload: &[u8], addr: SocketAddr) -> io::Result<usize> {
        loop {
            let old_state = std::mem::replace(self, ClientState::Disconnected);
            match old_state {
                ClientState::Closed => {
                    *self = ClientState::Closed;
                    return Err(io::Error::new(io::ErrorKind::NotConnected, "client is closed"));
                }
                ClientState::Ready(socket) if same_family(&socket, addr) => {
                    let result = socket.send_to(payload, addr);
                    if result.is_ok() {
                        *self = ClientState::Ready(socket);
                    }

                    return result;
                }
                // Not bound yet, or bound for the other address family.
                ClientState::Disconnected | ClientState::Ready(_) => {
                    *self = ClientState::Ready(bind_for(addr)?);
                }
            }
        }
    }
}

fn same_family(socket: &UdpSocket, addr: SocketAddr) -> bool {
    socket.local_addr().map(|local| local.is_ipv4() == addr.is_ipv4()).unwrap_or(false)
}

fn bind_for(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = if addr.is_ipv4() {
        UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?
    } else {
        UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0))?
    };
    socket.set_nonblocking(true)?;
    Ok(socket)
}

struct Inner {
    state: ClientState,
    writer: MessageWriter,
}

/// A fire-and-forget DogStatsD client.
///
/// Every metric is formatted into a single datagram and handed to a non-blocking UDP socket. Nothing is buffered,
/// batched, or retried: if the address can't be resolved, or the socket refuses the datagram, the error goes to the
/// configured [`ErrorHandler`] and the metric is dropped.
pub struct WireClient {
    inner: Mutex<Inner>,
    resolver: Box<dyn AddressResolver>,
    error_handler: Box<dyn ErrorHandler>,
    telemetry: Option<Telemetry>,
}

impl WireClient {
    /// Creates a new `WireClient`.
    ///
    /// The socket is bound when the first metric is sent.
    pub fn new<R, E>(resolver: R, prefix: Option<String>, global_tags: &[String], error_handler: E) -> Self
    where
        R: AddressResolver + 'static,
        E: ErrorHandler + 'static,
    {
        Self::from_boxed(Box::new(resolver), prefix, global_tags, Box::new(error_handler))
    }

    pub(crate) fn from_boxed(
        resolver: Box<dyn AddressResolver>,
        prefix: Option<String>,
        global_tags: &[String],
        error_handler: Box<dyn ErrorHandler>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ClientState::Disconnected,
                writer: MessageWriter::new(prefix).with_global_tags(global_tags),
            }),
            resolver,
            error_handler,
            telemetry: None,
        }
    }

    /// Enables internal telemetry for this client.
    pub(crate) fn with_telemetry(mut self) -> Self {
        self.telemetry = Some(Telemetry::new("udp"));
        self
    }

    /// Sends a gauge.
    ///
    /// DogStatsD has no representation for `NaN` or infinite values, so those are reported to the error handler as
    /// [`TransportError::NonFiniteValue`] and dropped.
    pub fn send_gauge(&self, name: &str, value: f64, tags: &[String]) {
        if value.is_finite() {
            self.send(MetricType::Gauge, |writer| writer.write_gauge(name, value, tags));
        } else {
            self.drop_metric(&TransportError::NonFiniteValue { metric: name.to_string(), value });
        }
    }

    /// Sends a count.
    pub fn send_count(&self, name: &str, value: u64, tags: &[String]) {
        self.send(MetricType::Count, |writer| writer.write_counter(name, value, tags));
    }

    fn send<F>(&self, metric_type: MetricType, write: F)
    where
        F: FnOnce(&mut MessageWriter) -> &[u8],
    {
        if let Err(e) = self.try_send(metric_type, write) {
            self.drop_metric(&e);
        }
    }

    fn drop_metric(&self, error: &TransportError) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.track_packet_dropped();
        }
        self.error_handler.handle(error);
    }

    fn try_send<F>(&self, metric_type: MetricType, write: F) -> Result<(), TransportError>
    where
        F: FnOnce(&mut MessageWriter) -> &[u8],
    {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        // Lookups can block on DNS, so they happen before taking the lock. The client may have been closed in the
        // meantime, which is checked again once the lock is held.
        let addr = self.resolver.resolve()?;

        let mut inner = self.inner.lock();
        if matches!(inner.state, ClientState::Closed) {
            return Err(TransportError::Closed);
        }

        let Inner { state, writer } = &mut *inner;
        let payload = write(writer);
        if let Some(telemetry) = &self.telemetry {
            telemetry.track_metric(metric_type);
        }

        match state.try_send(payload, addr) {
            Ok(sent) => {
                trace!(%addr, bytes = sent, "Sent metric.");
                if let Some(telemetry) = &self.telemetry {
                    telemetry.track_packet_sent(sent);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(telemetry) = &self.telemetry {
                    telemetry.track_bytes_dropped(payload.len());
                }
                Err(e.into())
            }
        }
    }

    /// Closes the client, releasing its socket.
    ///
    /// This waits for any send that is currently in progress. Metrics sent after closing are reported to the error
    /// handler as [`TransportError::Closed`]. Closing an already-closed client does nothing.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.state = ClientState::Closed;
    }

    /// Returns `true` if the client has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.inner.lock().state, ClientState::Closed)
    }
}
