use std::sync::Arc;

use crate::{
    client::WireClient,
    delta::DeltaTracker,
    session::{Session, UdpSession},
};

/// A destination for reporting passes.
pub trait Transport {
    /// Session type handed out for each reporting pass.
    type Session<'a>: Session
    where
        Self: 'a;

    /// Starts a reporting pass.
    fn open_session(&self) -> Self::Session<'_>;

    /// Releases any resources held by the transport.
    fn close(&self);
}

/// Pushes metrics to a DogStatsD server over UDP.
///
/// The transport owns the [`WireClient`] used to send metrics, which lives across reporting passes, and shares a
/// [`DeltaTracker`] that turns cumulative counter readings into the increments DogStatsD expects.
///
/// Build one with [`UdpTransportBuilder`][crate::UdpTransportBuilder].
pub struct UdpTransport {
    client: WireClient,
    deltas: Arc<DeltaTracker>,
}

impl UdpTransport {
    pub(crate) fn new(client: WireClient, deltas: Arc<DeltaTracker>) -> Self {
        Self { client, deltas }
    }

    /// Returns the delta tracker used for counters.
    pub fn delta_tracker(&self) -> &Arc<DeltaTracker> {
        &self.deltas
    }

    /// Returns `true` if the transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}

impl Transport for UdpTransport {
    type Session<'a> = UdpSession<'a>;

    fn open_session(&self) -> UdpSession<'_> {
        UdpSession::new(&self.client, &self.deltas)
    }

    /// Closes the underlying client.
    ///
    /// Any send in progress on another thread finishes first. Sessions opened afterwards still accept samples, but the
    /// metrics are reported to the error handler instead of being sent.
    fn close(&self) {
        self.client.close();
    }
}
