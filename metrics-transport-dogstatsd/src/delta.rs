use std::{collections::HashMap, fmt};

use parking_lot::Mutex;

/// Identity of a counter series.
///
/// A series is a metric name plus its tag set. Tags are sorted and de-duplicated, so the same tags given in any order
/// produce the same key. The name and tags are kept apart, so no combination of names and tags can collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    metric: String,
    tags: Vec<String>,
}

impl SeriesKey {
    /// Creates a new `SeriesKey` from a metric name and its tags.
    pub fn new<S>(metric: &str, tags: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        let mut tags: Vec<String> = tags.iter().map(|tag| tag.as_ref().to_string()).collect();
        tags.sort_unstable();
        tags.dedup();

        Self { metric: metric.to_string(), tags }
    }

    /// Returns the metric name.
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Returns the canonical tag set, sorted and de-duplicated.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.metric, self.tags.join(","))
    }
}

/// Converts cumulative counter readings into increments.
///
/// The tracker remembers the last absolute value seen for every series. The first reading of a series is reported
/// as-is, and every later reading is reported as the difference from the previous one. A reading lower than the
/// previous one (a counter reset, usually from a process restart) is reported as zero, and the lower reading becomes
/// the new baseline, so the increment for the cycle in which the reset happened is lost.
///
/// The tracker is meant to be shared, via `Arc`, by everything reporting into the same backend: lookups and updates for
/// a series happen under a single lock acquisition, so overlapping reporting passes never lose or double-count an
/// update. Entries are never evicted.
#[derive(Default)]
pub struct DeltaTracker {
    last_seen: Mutex<HashMap<SeriesKey, i64>>,
}

impl DeltaTracker {
    /// Creates a new, empty `DeltaTracker`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `absolute` as the latest reading for `key`, returning the increment since the previous reading.
    ///
    /// The increment is never negative: a reading below the previous one yields zero, as does a negative first reading.
    pub fn delta(&self, key: SeriesKey, absolute: i64) -> u64 {
        let mut last_seen = self.last_seen.lock();
        let delta = match last_seen.insert(key, absolute) {
            Some(last) => absolute.saturating_sub(last),
            None => absolute,
        };

        u64::try_from(delta).unwrap_or(0)
    }

    /// Returns the last reading recorded for `key`, if any.
    pub fn last_seen(&self, key: &SeriesKey) -> Option<i64> {
        self.last_seen.lock().get(key).copied()
    }

    /// Returns the number of series being tracked.
    pub fn len(&self) -> usize {
        self.last_seen.lock().len()
    }

    /// Returns `true` if no series are being tracked.
    pub fn is_empty(&self) -> bool {
        self.last_seen.lock().is_empty()
    }

    /// Forgets every series.
    ///
    /// The next reading of each series is reported as-is.
    pub fn clear(&self) {
        self.last_seen.lock().clear();
    }
}

impl fmt::Debug for DeltaTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaTracker").field("series", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use proptest::{collection::vec as arb_vec, prelude::*};

    use super::{DeltaTracker, SeriesKey};

    fn key(metric: &str, tags: &[&str]) -> SeriesKey {
        SeriesKey::new(metric, tags)
    }

    #[test]
    fn series_key_rendering() {
        // Cases are defined as: metric name, tags, expected key.
        let cases = [
            ("requests", &[][..], "requests:"),
            ("requests", &["env:prod"][..], "requests:env:prod"),
            ("requests", &["b:2", "a:1"][..], "requests:a:1,b:2"),
            ("requests", &["b:2", "a:1", "b:2"][..], "requests:a:1,b:2"),
            ("requests", &["bare", "a:1"][..], "requests:a:1,bare"),
        ];

        for (metric, tags, expected) in cases {
            assert_eq!(key(metric, tags).to_string(), expected);
        }
    }

    #[test]
    fn name_and_tags_never_collide() {
        let tracker = DeltaTracker::new();

        // Both render as `a:b:c`, but are different series.
        assert_eq!(key("a", &["b:c"]).to_string(), key("a:b", &["c"]).to_string());
        assert_ne!(key("a", &["b:c"]), key("a:b", &["c"]));
        assert_eq!(key("a:b", &["c"]).metric(), "a:b");
        assert_eq!(key("a", &["b:c", "b:c"]).tags(), ["b:c"]);

        assert_eq!(tracker.delta(key("a", &["b:c"]), 10), 10);
        assert_eq!(tracker.delta(key("a:b", &["c"]), 40), 40);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn tag_order_does_not_matter() {
        let tracker = DeltaTracker::new();

        assert_eq!(tracker.delta(key("requests", &["a:1", "b:2"]), 10), 10);
        assert_eq!(tracker.delta(key("requests", &["b:2", "a:1"]), 25), 15);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn series_are_independent() {
        let tracker = DeltaTracker::new();

        assert_eq!(tracker.delta(key("requests", &["env:prod"]), 10), 10);
        assert_eq!(tracker.delta(key("requests", &["env:dev"]), 3), 3);
        assert_eq!(tracker.delta(key("errors", &["env:prod"]), 1), 1);
        assert_eq!(tracker.delta(key("requests", &["env:prod"]), 12), 2);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn counter_reset_clamps_to_zero() {
        let tracker = DeltaTracker::new();
        let deltas = [100, 150, 30, 80]
            .into_iter()
            .map(|value| tracker.delta(key("requests", &[]), value))
            .collect::<Vec<_>>();

        assert_eq!(deltas, [100, 50, 0, 50]);
        assert_eq!(tracker.last_seen(&key("requests", &[])), Some(80));
    }

    #[test]
    fn negative_and_extreme_readings() {
        let tracker = DeltaTracker::new();

        assert_eq!(tracker.delta(key("c", &[]), -5), 0);
        assert_eq!(tracker.delta(key("c", &[]), 5), 10);
        assert_eq!(tracker.delta(key("c", &[]), i64::MIN), 0);
        assert_eq!(tracker.delta(key("c", &[]), i64::MAX), i64::MAX as u64);
    }

    #[test]
    fn clear_forgets_series() {
        let tracker = DeltaTracker::new();
        tracker.delta(key("requests", &[]), 10);
        assert!(!tracker.is_empty());

        tracker.clear();
        assert!(tracker.is_empty());
        assert_eq!(tracker.delta(key("requests", &[]), 12), 12);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        // Every thread ends on the same reading, so that must be the last one recorded, and the increments handed out
        // can never add up to less than it.
        let tracker = Arc::new(DeltaTracker::new());
        let handles = (0..4)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    (1..=1000).map(|value| tracker.delta(key("shared", &["a:1"]), value)).sum::<u64>()
                })
            })
            .collect::<Vec<_>>();

        let total = handles.into_iter().map(|handle| handle.join().unwrap()).sum::<u64>();
        assert!(total >= 1000);
        assert_eq!(tracker.last_seen(&key("shared", &["a:1"])), Some(1000));
    }

    proptest! {
        #[test]
        fn deltas_follow_readings(readings in arb_vec(0..1_000_000i64, 1..64)) {
            let tracker = DeltaTracker::new();
            let deltas = readings
                .iter()
                .map(|value| tracker.delta(key("requests", &["env:prod"]), *value))
                .collect::<Vec<_>>();

            prop_assert_eq!(deltas[0], readings[0] as u64);
            for (i, window) in readings.windows(2).enumerate() {
                prop_assert_eq!(deltas[i + 1], (window[1] - window[0]).max(0) as u64);
            }
        }
    }
}
