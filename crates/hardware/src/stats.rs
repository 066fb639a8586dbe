//! Cache statistics collection and reporting.
//!
//! This module tracks the counters the cache exposes to the host. It provides:
//! 1. **Counters:** Timing hits and misses; functional accesses are never counted.
//! 2. **Derived metrics:** Hit ratio over all timing accesses.
//! 3. **Miss latency:** A bucketed histogram of ticks from miss detection to refill.
//! 4. **Reporting:** A plain-text dump and a serializable snapshot for JSON output.

use serde::Serialize;

/// Default number of miss-latency histogram buckets.
pub const MISS_LATENCY_BUCKETS: usize = 16;

/// Histogram with a fixed bucket count and a bucket width that doubles as
/// samples outgrow the covered range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Histogram {
    buckets: Vec<u64>,
    bucket_size: u64,
    samples: u64,
    sum: u64,
    min: Option<u64>,
    max: Option<u64>,
}

impl Histogram {
    /// Creates an empty histogram with `buckets` buckets of width one.
    pub fn new(buckets: usize) -> Self {
        Self {
            buckets: vec![0; buckets.max(1)],
            bucket_size: 1,
            samples: 0,
            sum: 0,
            min: None,
            max: None,
        }
    }

    /// Records one sample.
    ///
    /// Samples beyond the widest representable range land in the last bucket.
    pub fn sample(&mut self, value: u64) {
        let len = self.buckets.len() as u64;
        while let Some(covered) = self.bucket_size.checked_mul(len) {
            if value < covered || self.bucket_size > u64::MAX / 2 {
                break;
            }
            self.grow();
        }
        let index = ((value / self.bucket_size) as usize).min(self.buckets.len() - 1);
        self.buckets[index] += 1;

        self.samples += 1;
        self.sum = self.sum.saturating_add(value);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Doubles the bucket width, folding pairs of buckets together.
    fn grow(&mut self) {
        let mut folded = vec![0; self.buckets.len()];
        for (i, count) in self.buckets.iter().enumerate() {
            folded[i / 2] += count;
        }
        self.buckets = folded;
        self.bucket_size *= 2;
    }

    /// Per-bucket sample counts; bucket `i` covers `[i * bucket_size, (i + 1) * bucket_size)`.
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Current bucket width.
    pub const fn bucket_size(&self) -> u64 {
        self.bucket_size
    }

    /// Number of samples recorded.
    pub const fn samples(&self) -> u64 {
        self.samples
    }

    /// Sum of all samples.
    pub const fn sum(&self) -> u64 {
        self.sum
    }

    /// Smallest sample.
    pub const fn min(&self) -> Option<u64> {
        self.min
    }

    /// Largest sample.
    pub const fn max(&self) -> Option<u64> {
        self.max
    }

    /// Mean of all samples, or 0.0 when empty.
    pub fn mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.sum as f64 / self.samples as f64
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new(MISS_LATENCY_BUCKETS)
    }
}

/// Statistics of one cache instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Timing accesses served from a resident block.
    pub hits: u64,
    /// Timing accesses that had to fetch from memory.
    pub misses: u64,
    /// Ticks from miss detection to the refill response.
    pub miss_latency: Histogram,
}

/// Serializable view of `CacheStats`, including derived metrics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Timing hits.
    pub hits: u64,
    /// Timing misses.
    pub misses: u64,
    /// `hits / (hits + misses)`.
    pub hit_ratio: f64,
    /// Miss latency distribution.
    pub miss_latency: Histogram,
}

impl CacheStats {
    /// Timing accesses completed.
    pub const fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of timing accesses that hit, or 0.0 before any access.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Serializable snapshot of the current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits,
            misses: self.misses,
            hit_ratio: self.hit_ratio(),
            miss_latency: self.miss_latency.clone(),
        }
    }

    /// Prints the statistics of the cache called `name` to stdout.
    pub fn print(&self, name: &str) {
        let lat = &self.miss_latency;
        println!("\n==========================================================");
        println!("CACHE STATISTICS ({name})");
        println!("==========================================================");
        println!("{name}.hits                 {}", self.hits);
        println!("{name}.misses               {}", self.misses);
        println!("{name}.hitRatio             {:.4}", self.hit_ratio());
        println!("----------------------------------------------------------");
        println!("{name}.missLatency::samples {}", lat.samples());
        println!("{name}.missLatency::mean    {:.2}", lat.mean());
        if let (Some(min), Some(max)) = (lat.min(), lat.max()) {
            println!("{name}.missLatency::min     {min}");
            println!("{name}.missLatency::max     {max}");
        }
        for (i, count) in lat.buckets().iter().enumerate() {
            if *count > 0 {
                let lo = i as u64 * lat.bucket_size();
                let hi = lo + lat.bucket_size() - 1;
                println!("{name}.missLatency::{lo}-{hi:<10} {count}");
            }
        }
        println!("==========================================================");
    }
}
