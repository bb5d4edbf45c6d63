use std::{
    net::UdpSocket,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use metrics_transport_dogstatsd::{
    DeltaTracker, MetricSample, Session as _, Transport as _, TransportError, UdpTransport, UdpTransportBuilder,
};

struct Server {
    socket: UdpSocket,
    port: u16,
}

impl Server {
    fn start() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("failed to bind test server");
        socket.set_read_timeout(Some(Duration::from_millis(500))).expect("failed to set read timeout");
        let port = socket.local_addr().expect("test server has no local address").port();
        Self { socket, port }
    }

    fn received(&self) -> Vec<String> {
        let mut messages = Vec::new();
        let mut buf = [0; 2048];
        while let Ok(len) = self.socket.recv(&mut buf) {
            messages.push(String::from_utf8_lossy(&buf[..len]).into_owned());
        }
        messages
    }
}

fn transport_for(server: &Server, retrying_lookup: bool) -> (UdpTransport, Arc<AtomicUsize>) {
    let errors = Arc::new(AtomicUsize::new(0));
    let handler_errors = Arc::clone(&errors);

    let transport = UdpTransportBuilder::default()
        .with_statsd_host("127.0.0.1")
        .with_port(server.port)
        .with_retrying_lookup(retrying_lookup)
        .with_prefix("app")
        .with_global_tags(["service:checkout"])
        .with_error_handler(move |_: &TransportError| {
            handler_errors.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .expect("failed to build transport");

    (transport, errors)
}

#[test]
fn reporting_passes() {
    for retrying_lookup in [false, true] {
        let server = Server::start();
        let (transport, errors) = transport_for(&server, retrying_lookup);

        let passes = [(42.5, 100.0), (43.0, 150.0), (41.0, 30.0)];
        for (depth, requests) in passes {
            let mut session = transport.open_session();
            session.add_gauge(&MetricSample::gauge("queue.depth", [(1, depth)], ["env:prod"])).unwrap();
            session
                .add_counter(&MetricSample::counter("requests", [(1, requests), (2, 9999.0)], ["env:prod", "az:a"]))
                .unwrap();
            session.flush();
            session.close();
        }
        transport.close();

        assert_eq!(
            server.received(),
            [
                "app.queue.depth:42.5|g|#env:prod,service:checkout",
                "app.requests:100|c|#env:prod,az:a,service:checkout",
                "app.queue.depth:43.0|g|#env:prod,service:checkout",
                "app.requests:50|c|#env:prod,az:a,service:checkout",
                "app.queue.depth:41.0|g|#env:prod,service:checkout",
                "app.requests:0|c|#env:prod,az:a,service:checkout",
            ]
        );
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn closed_transport_drops_and_reports() {
    let server = Server::start();
    let (transport, errors) = transport_for(&server, false);

    transport.close();
    transport.close();

    let mut session = transport.open_session();
    assert!(session.add_gauge(&MetricSample::gauge("queue.depth", [(1, 1.0)], ["env:prod"])).is_ok());
    assert!(session.add_counter(&MetricSample::counter("requests", [(1, 1.0)], ["env:prod"])).is_ok());
    session.close();

    assert!(server.received().is_empty());
    assert_eq!(errors.load(Ordering::SeqCst), 2);
}

#[test]
fn shared_tracker_across_overlapping_passes() {
    let server = Server::start();
    let deltas = Arc::new(DeltaTracker::new());
    let transport = Arc::new(
        UdpTransportBuilder::default()
            .with_statsd_host("127.0.0.1")
            .with_port(server.port)
            .with_telemetry(false)
            .with_delta_tracker(Arc::clone(&deltas))
            .build()
            .expect("failed to build transport"),
    );

    // Each pass reports a distinct series, so the totals sent must match exactly no matter how the passes interleave.
    let handles = (0..4)
        .map(|pass| {
            let transport = Arc::clone(&transport);
            thread::spawn(move || {
                let tag = format!("pass:{pass}");
                for reading in [10.0, 25.0, 40.0] {
                    let mut session = transport.open_session();
                    session.add_counter(&MetricSample::counter("jobs", [(1, reading)], [tag.as_str()])).unwrap();
                    session.close();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut received = server.received();
    received.sort();

    let mut expected = (0..4)
        .flat_map(|pass| ["10", "15", "15"].map(|delta| format!("jobs:{delta}|c|#pass:{pass}")))
        .collect::<Vec<_>>();
    expected.sort();

    assert_eq!(received, expected);
    assert_eq!(deltas.len(), 4);
}
