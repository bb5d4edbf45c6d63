#[derive(Clone, Copy)]
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            MetricType::Counter => b"|c",
            MetricType::Gauge => b"|g",
        }
    }
}

#[derive(Clone, Copy)]
enum MetricValue {
    Integer(u64),
    FloatingPoint(f64),
}

struct MetricValueFormatter {
    int_writer: itoa::Buffer,
    float_writer: ryu::Buffer,
}

impl MetricValueFormatter {
    fn new() -> Self {
        Self { int_writer: itoa::Buffer::new(), float_writer: ryu::Buffer::new() }
    }

    fn format(&mut self, value: MetricValue) -> &str {
        match value {
            MetricValue::Integer(v) => self.int_writer.format(v),
            MetricValue::FloatingPoint(v) => self.float_writer.format(v),
        }
    }
}

/// Writes single DogStatsD messages.
///
/// Every message is sent as its own datagram, so unlike a batching writer there is no newline delimiter and no
/// payload splitting: the writer formats one metric into its internal buffer and hands back the bytes, reusing the
/// allocation for the next one.
pub(crate) struct MessageWriter {
    buf: Vec<u8>,
    formatter: MetricValueFormatter,
    prefix: Option<String>,
    global_tags: Vec<String>,
}

impl MessageWriter {
    /// Creates a new `MessageWriter`.
    ///
    /// When a non-empty `prefix` is given, it is prepended to every metric name, separated by a period.
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            buf: Vec::new(),
            formatter: MetricValueFormatter::new(),
            prefix: prefix.filter(|p| !p.is_empty()),
            global_tags: Vec::new(),
        }
    }

    /// Sets the global tags to apply to all metrics.
    pub fn with_global_tags(mut self, global_tags: &[String]) -> Self {
        self.global_tags = global_tags.to_vec();
        self
    }

    fn write_message(
        &mut self,
        name: &str,
        metric_value: MetricValue,
        metric_type: MetricType,
        tags: &[String],
    ) -> &[u8] {
        self.buf.clear();

        if let Some(prefix) = &self.prefix {
            self.buf.extend_from_slice(prefix.as_bytes());
            self.buf.push(b'.');
        }
        self.buf.extend_from_slice(name.as_bytes());

        self.buf.push(b':');
        self.buf.extend_from_slice(self.formatter.format(metric_value).as_bytes());
        self.buf.extend_from_slice(metric_type.as_bytes());

        // Write the metric's own tags first, and then any global tags.
        let mut wrote_tag = false;
        for tag in tags.iter().chain(self.global_tags.iter()) {
            if wrote_tag {
                self.buf.push(b',');
            } else {
                self.buf.extend_from_slice(b"|#");
                wrote_tag = true;
            }

            self.buf.extend_from_slice(tag.as_bytes());
        }

        &self.buf
    }

    /// Writes a counter message.
    pub fn write_counter(&mut self, name: &str, value: u64, tags: &[String]) -> &[u8] {
        self.write_message(name, MetricValue::Integer(value), MetricType::Counter, tags)
    }

    /// Writes a gauge message.
    pub fn write_gauge(&mut self, name: &str, value: f64, tags: &[String]) -> &[u8] {
        self.write_message(name, MetricValue::FloatingPoint(value), MetricType::Gauge, tags)
    }
}
