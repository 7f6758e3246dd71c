/// Rolling per-metric history buffers and aggregate statistics
use std::collections::VecDeque;

use crate::models::{MetricStats, Sample, SampleStats};

/// Retained values per metric. At one reading per 20 s this covers 12 hours.
pub const MAX_HISTORY: usize = 2160;

/// Fixed-capacity rolling history of one metric with incrementally
/// maintained mean/max/min.
///
/// The buffer holds the most recent `capacity` appended values in append
/// order; the oldest value is evicted first once the bound is reached. The
/// running sum and tracked extrema make the common append O(1); evicting a
/// value equal to the current max or min triggers a full recompute so the
/// reported statistics are never stale.
#[derive(Debug, Clone)]
pub struct RollingStatistics {
    history: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    max: f64,
    min: f64,
}

impl RollingStatistics {
    pub fn new(capacity: usize) -> Self {
        RollingStatistics {
            history: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            sum: 0.0,
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
        }
    }

    /// Append a value, evicting the oldest entry when the buffer is full,
    /// and return the statistics over the retained values.
    pub fn append(&mut self, value: f64) -> MetricStats {
        if self.history.len() == self.capacity {
            if let Some(evicted) = self.history.pop_front() {
                self.sum -= evicted;
                if evicted == self.max || evicted == self.min {
                    self.recompute();
                }
            }
        }

        self.history.push_back(value);
        self.sum += value;
        if value > self.max {
            self.max = value;
        }
        if value < self.min {
            self.min = value;
        }

        MetricStats {
            mean: self.sum / self.history.len() as f64,
            max: self.max,
            min: self.min,
        }
    }

    /// Statistics over the current buffer, `None` when empty.
    pub fn stats(&self) -> Option<MetricStats> {
        if self.history.is_empty() {
            return None;
        }
        Some(MetricStats {
            mean: self.sum / self.history.len() as f64,
            max: self.max,
            min: self.min,
        })
    }

    /// Empty the buffer. Statistics are absent until the next append.
    pub fn clear(&mut self) {
        self.history.clear();
        self.sum = 0.0;
        self.max = f64::NEG_INFINITY;
        self.min = f64::INFINITY;
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained values oldest to newest.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    // Full pass over the buffer. Also resets the running sum, so float
    // drift from long incremental sequences cannot accumulate unbounded.
    fn recompute(&mut self) {
        self.sum = 0.0;
        self.max = f64::NEG_INFINITY;
        self.min = f64::INFINITY;
        for &v in &self.history {
            self.sum += v;
            if v > self.max {
                self.max = v;
            }
            if v < self.min {
                self.min = v;
            }
        }
    }
}

/// The three per-metric rolling histories owned by a worker session.
#[derive(Debug, Clone)]
pub struct MetricHistories {
    temperature: RollingStatistics,
    pressure: RollingStatistics,
    humidity: RollingStatistics,
}

impl MetricHistories {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MetricHistories {
            temperature: RollingStatistics::new(capacity),
            pressure: RollingStatistics::new(capacity),
            humidity: RollingStatistics::new(capacity),
        }
    }

    /// Append each coercible metric of `sample` and return the resulting
    /// per-metric snapshot. Metrics without a numeric value keep their
    /// previous statistics.
    pub fn record(&mut self, sample: &Sample) -> SampleStats {
        if let Some(v) = sample.temperature.value {
            self.temperature.append(v);
        }
        if let Some(v) = sample.pressure.value {
            self.pressure.append(v);
        }
        if let Some(v) = sample.humidity.value {
            self.humidity.append(v);
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> SampleStats {
        SampleStats {
            temperature: self.temperature.stats(),
            pressure: self.pressure.stats(),
            humidity: self.humidity.stats(),
        }
    }

    pub fn clear(&mut self) {
        self.temperature.clear();
        self.pressure.clear();
        self.humidity.clear();
    }
}

impl Default for MetricHistories {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricReading;

    fn sample(temperature: Option<f64>, pressure: Option<f64>, humidity: Option<f64>) -> Sample {
        let reading = |value: Option<f64>| match value {
            Some(v) => MetricReading {
                display: v.to_string(),
                value: Some(v),
            },
            None => MetricReading {
                display: "N/A".to_string(),
                value: None,
            },
        };
        Sample {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            temperature: reading(temperature),
            pressure: reading(pressure),
            humidity: reading(humidity),
        }
    }

    #[test]
    fn computes_mean_max_min() {
        let mut stats = RollingStatistics::new(10);
        stats.append(20.0);
        stats.append(22.0);
        let result = stats.append(24.0);

        assert_eq!(result.mean, 22.0);
        assert_eq!(result.max, 24.0);
        assert_eq!(result.min, 20.0);
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut stats = RollingStatistics::new(5);
        for i in 0..100 {
            stats.append(i as f64);
            assert!(stats.len() <= 5);
        }
    }

    #[test]
    fn retains_last_values_in_append_order() {
        let mut stats = RollingStatistics::new(3);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.append(v);
        }
        let retained: Vec<f64> = stats.values().collect();
        assert_eq!(retained, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn min_mean_max_ordering_holds() {
        let mut stats = RollingStatistics::new(50);
        let values = [3.5, -1.2, 0.0, 7.75, 7.75, -1.2, 2.0];
        for v in values {
            let s = stats.append(v);
            assert!(s.min <= s.mean, "min {} > mean {}", s.min, s.mean);
            assert!(s.mean <= s.max, "mean {} > max {}", s.mean, s.max);
        }
    }

    #[test]
    fn append_beyond_capacity_evicts_oldest() {
        let mut stats = RollingStatistics::new(MAX_HISTORY);
        // First value is an outlier; it must vanish with the 2161st append.
        stats.append(1000.0);
        for _ in 0..(MAX_HISTORY - 1) {
            stats.append(10.0);
        }
        assert_eq!(stats.len(), MAX_HISTORY);
        assert_eq!(stats.stats().unwrap().max, 1000.0);

        let result = stats.append(10.0);
        assert_eq!(stats.len(), MAX_HISTORY);
        assert_eq!(result.max, 10.0);
        assert_eq!(result.min, 10.0);
        assert_eq!(result.mean, 10.0);
    }

    #[test]
    fn evicting_extremum_recomputes_stats() {
        let mut stats = RollingStatistics::new(3);
        stats.append(100.0); // max, evicted first
        stats.append(5.0);
        stats.append(7.0);

        let result = stats.append(6.0);
        assert_eq!(result.max, 7.0);
        assert_eq!(result.min, 5.0);
        assert_eq!(result.mean, 6.0);
    }

    #[test]
    fn clear_empties_history_and_stats() {
        let mut stats = RollingStatistics::new(10);
        stats.append(1.0);
        stats.append(2.0);
        stats.clear();

        assert!(stats.is_empty());
        assert!(stats.stats().is_none());

        // Usable again after clear.
        let result = stats.append(5.0);
        assert_eq!(result.mean, 5.0);
        assert_eq!(result.max, 5.0);
        assert_eq!(result.min, 5.0);
    }

    #[test]
    fn stats_none_when_empty() {
        let stats = RollingStatistics::new(10);
        assert!(stats.stats().is_none());
    }

    #[test]
    fn record_skips_metrics_without_value() {
        let mut histories = MetricHistories::with_capacity(10);
        histories.record(&sample(Some(20.0), Some(1010.0), Some(50.0)));

        let stats = histories.record(&sample(None, Some(1014.0), Some(52.0)));

        // Temperature untouched by the second sample.
        let temperature = stats.temperature.unwrap();
        assert_eq!(temperature.mean, 20.0);
        assert_eq!(temperature.max, 20.0);

        let pressure = stats.pressure.unwrap();
        assert_eq!(pressure.mean, 1012.0);
        assert_eq!(pressure.max, 1014.0);
        assert_eq!(pressure.min, 1010.0);
    }

    #[test]
    fn snapshot_absent_until_first_value() {
        let mut histories = MetricHistories::with_capacity(10);
        let stats = histories.record(&sample(Some(20.0), None, None));

        assert!(stats.temperature.is_some());
        assert!(stats.pressure.is_none());
        assert!(stats.humidity.is_none());
    }

    #[test]
    fn clear_resets_all_metrics() {
        let mut histories = MetricHistories::with_capacity(10);
        histories.record(&sample(Some(20.0), Some(1010.0), Some(50.0)));
        histories.clear();

        let stats = histories.snapshot();
        assert!(stats.temperature.is_none());
        assert!(stats.pressure.is_none());
        assert!(stats.humidity.is_none());
    }
}
