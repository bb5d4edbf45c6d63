use std::{
    thread::sleep,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use metrics_transport_dogstatsd::{MetricSample, Session as _, Transport as _, UdpTransportBuilder};

fn main() {
    tracing_subscriber::fmt::init();

    let transport = UdpTransportBuilder::default()
        .with_statsd_host("localhost")
        .with_port(9125)
        .with_retrying_lookup(true)
        .with_prefix("example")
        .with_global_tags(["service:udp_transport"])
        .with_telemetry(false)
        .build()
        .expect("failed to build DogStatsD transport");

    // Pretend to be a scheduled reporter, pushing a snapshot every few seconds.
    let mut requests = 0.0;
    loop {
        requests += 17.0;
        let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);

        let mut session = transport.open_session();
        session
            .add_gauge(&MetricSample::gauge("queue.depth", [(now, requests % 7.0)], ["queue:default"]))
            .expect("gauge has a data point");
        session
            .add_counter(&MetricSample::counter("requests", [(now, requests)], ["route:/", "method:GET"]))
            .expect("counter has a data point");
        session.flush();
        session.close();

        sleep(Duration::from_secs(3));
    }
}
