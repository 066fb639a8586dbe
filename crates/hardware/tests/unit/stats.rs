//! # Statistics Tests
//!
//! Verifies counters, hit ratio, the doubling miss-latency histogram, and the
//! serialized snapshot.

use pretty_assertions::assert_eq;
use serde_json::json;

use cachesim_core::stats::{CacheStats, Histogram, MISS_LATENCY_BUCKETS};

use crate::common::harness::{CacheHarness, small_config};

#[test]
fn hit_ratio_is_zero_without_accesses() {
    let stats = CacheStats::default();
    assert_eq!(stats.accesses(), 0);
    assert!(stats.hit_ratio().abs() < f64::EPSILON);
}

#[test]
fn hit_ratio_is_hits_over_accesses() {
    let stats = CacheStats {
        hits: 3,
        misses: 1,
        ..CacheStats::default()
    };
    assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
}

#[test]
fn histogram_default_bucket_count() {
    let h = Histogram::default();
    assert_eq!(h.buckets().len(), MISS_LATENCY_BUCKETS);
    assert_eq!(h.bucket_size(), 1);
}

#[test]
fn histogram_keeps_every_sample_while_widening() {
    let mut h = Histogram::new(16);
    let samples = [0, 5, 15, 16, 100, 30_000];
    for s in samples {
        h.sample(s);
    }
    assert_eq!(h.samples(), samples.len() as u64);
    assert_eq!(h.buckets().iter().sum::<u64>(), samples.len() as u64);
    assert_eq!(h.sum(), samples.iter().sum::<u64>());
    assert_eq!(h.min(), Some(0));
    assert_eq!(h.max(), Some(30_000));
    assert!(h.bucket_size().is_power_of_two());
    assert!(h.bucket_size() * 16 > 30_000);
    let last = (30_000 / h.bucket_size()) as usize;
    assert!(h.buckets()[last] >= 1);
}

#[test]
fn counters_track_timing_accesses() {
    let mut h = CacheHarness::new(&small_config());
    for _ in 0..3 {
        let _ = h.read(0x40, 4);
    }
    let _ = h.read(0x400, 4);

    let stats = h.cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.miss_latency.samples(), 2);
}

#[test]
fn snapshot_serializes_derived_metrics() {
    let mut stats = CacheStats {
        hits: 1,
        misses: 1,
        ..CacheStats::default()
    };
    stats.miss_latency.sample(3);

    let value = serde_json::to_value(stats.snapshot()).unwrap();
    assert_eq!(value["hits"], json!(1));
    assert_eq!(value["misses"], json!(1));
    assert_eq!(value["hit_ratio"], json!(0.5));
    assert_eq!(value["miss_latency"]["samples"], json!(1));
    assert_eq!(value["miss_latency"]["min"], json!(3));
}
