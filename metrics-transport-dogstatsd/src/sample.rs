use thiserror::Error;
use tracing::debug;

/// Errors caused by a sample that cannot be reported at all.
///
/// These point at a bug in whatever produced the sample, so they are returned to the caller rather than swallowed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidSampleError {
    /// The sample had no data points.
    #[error("metric '{metric}' has no data points")]
    NoPoints {
        /// Name of the offending metric.
        metric: String,
    },
}

/// Kind of a metric sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    /// A point-in-time value, sent as-is.
    Gauge,

    /// A cumulative value, sent as the increment since the previous report.
    Counter,
}

/// A single observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Seconds since the Unix epoch.
    ///
    /// DogStatsD attributes every metric to the time it was received, so this is never written to the wire.
    pub timestamp: u64,

    /// Observed value.
    pub value: f64,
}

impl Point {
    /// Creates a new `Point`.
    pub const fn new(timestamp: u64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A tagged metric observation taken from a registry snapshot.
///
/// Samples are built fresh for every reporting pass and consumed immediately.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSample {
    /// Metric name.
    pub metric: String,

    /// Observed points. Only the first one is reported.
    pub points: Vec<Point>,

    /// Tags, in `key:value` or bare `key` form.
    pub tags: Vec<String>,

    /// Metric kind.
    pub kind: MetricKind,
}

impl MetricSample {
    /// Creates a gauge sample.
    pub fn gauge<N, P, T>(metric: N, points: P, tags: T) -> Self
    where
        N: Into<String>,
        P: IntoIterator<Item = (u64, f64)>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self::new(MetricKind::Gauge, metric, points, tags)
    }

    /// Creates a counter sample.
    pub fn counter<N, P, T>(metric: N, points: P, tags: T) -> Self
    where
        N: Into<String>,
        P: IntoIterator<Item = (u64, f64)>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self::new(MetricKind::Counter, metric, points, tags)
    }

    fn new<N, P, T>(kind: MetricKind, metric: N, points: P, tags: T) -> Self
    where
        N: Into<String>,
        P: IntoIterator<Item = (u64, f64)>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            metric: metric.into(),
            points: points.into_iter().map(|(timestamp, value)| Point::new(timestamp, value)).collect(),
            tags: tags.into_iter().map(Into::into).collect(),
            kind,
        }
    }

    /// Returns the value of the first point.
    ///
    /// Any additional points are ignored, since DogStatsD has no way to submit historical values.
    ///
    /// # Errors
    ///
    /// If the sample has no points, an error is returned.
    pub fn first_value(&self) -> Result<f64, InvalidSampleError> {
        let point = self
            .points
            .first()
            .ok_or_else(|| InvalidSampleError::NoPoints { metric: self.metric.clone() })?;

        if self.points.len() > 1 {
            debug!(
                metric_name = %self.metric,
                points = self.points.len(),
                "Metric has more than one data point, only the first will be reported."
            );
        }

        Ok(point.value)
    }

    /// Returns the value of the first point as a whole number, for counters.
    ///
    /// The fractional part is truncated. Out-of-range values saturate, and `NaN` reads as zero.
    ///
    /// # Errors
    ///
    /// If the sample has no points, an error is returned.
    pub fn first_count(&self) -> Result<i64, InvalidSampleError> {
        self.first_value().map(|value| value as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::{InvalidSampleError, MetricKind, MetricSample, Point};

    #[test]
    fn first_value_ignores_extra_points() {
        let sample = MetricSample::gauge("queue.depth", [(10, 42.5), (20, 99.0)], ["env:prod"]);
        assert_eq!(sample.kind, MetricKind::Gauge);
        assert_eq!(sample.points[1], Point::new(20, 99.0));
        assert_eq!(sample.first_value(), Ok(42.5));
    }

    #[test]
    fn empty_points_is_an_error() {
        let sample = MetricSample::counter("requests", Vec::new(), Vec::<String>::new());
        assert_eq!(
            sample.first_value(),
            Err(InvalidSampleError::NoPoints { metric: "requests".to_string() })
        );
        assert!(sample.first_count().is_err());
    }

    #[test]
    fn counts_truncate_and_saturate() {
        let cases = [(17.9, 17), (-3.5, -3), (f64::MAX, i64::MAX), (f64::NAN, 0)];

        for (input, expected) in cases {
            let sample = MetricSample::counter("c", [(0, input)], Vec::<String>::new());
            assert_eq!(sample.first_count(), Ok(expected));
        }
    }
}
