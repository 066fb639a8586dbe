//! Configuration system for the cache simulator.
//!
//! This module defines all configuration structures used to parameterize a run.
//! It provides:
//! 1. **Defaults:** Baseline cache, memory, and clock constants.
//! 2. **Structures:** Cache, memory, and simulation settings.
//! 3. **Validation:** Rejects geometries the cache cannot model.
//!
//! Configuration is supplied as JSON (every field optional) or built with `Config::default()`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::addr::AddrRange;
use crate::common::error::ConfigError;

/// Default configuration constants for the simulator.
mod defaults {
    /// Cycles between accepting a request and resolving hit or miss.
    pub const ACCESS_LATENCY: u64 = 1;

    /// Cache line size in bytes.
    ///
    /// Matches the system line size of typical memory hierarchies.
    pub const BLOCK_SIZE: usize = 64;

    /// Cache capacity in bytes (16 KiB).
    pub const CACHE_SIZE: usize = 16 * 1024;

    /// Number of CPU-side ports.
    pub const CPU_SIDE_PORTS: usize = 1;

    /// Ticks per cache clock cycle (1 GHz with picosecond ticks).
    pub const CLOCK_PERIOD: u64 = 1000;

    /// Base address of the backing memory.
    pub const MEMORY_BASE: u64 = 0;

    /// Size of the backing memory (512 MiB).
    pub const MEMORY_SIZE: u64 = 512 * 1024 * 1024;

    /// Backing memory access latency in ticks (30 ns).
    pub const MEMORY_LATENCY: u64 = 30_000;

    /// Requests the backing memory holds before refusing new ones.
    pub const MEMORY_QUEUE_DEPTH: usize = 16;

    /// Replacement policy seed.
    pub const SEED: u64 = 1;
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use cachesim_core::config::Config;
///
/// let json = r#"{
///     "cache": { "size_bytes": 128, "block_size": 64, "access_latency": 2 },
///     "memory": { "latency": 5000 },
///     "sim": { "seed": 9 }
/// }"#;
///
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.cache.capacity(), 2);
/// assert_eq!(config.cache.cpu_side_ports, 1);
/// assert_eq!(config.memory.latency, 5000);
/// assert_eq!(config.sim.seed, 9);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Cache geometry and timing
    pub cache: CacheConfig,
    /// Backing memory
    pub memory: MemoryConfig,
    /// Run control
    pub sim: SimConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed JSON, or any validation error.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as `from_json_str`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// The first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.memory.validate()
    }
}

/// Blocking cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cycles added before a request resolves as hit or miss
    pub access_latency: u64,
    /// Bytes per cache line (power of two)
    pub block_size: usize,
    /// Total capacity in bytes
    pub size_bytes: usize,
    /// Number of CPU-side ports
    pub cpu_side_ports: usize,
    /// Ticks per cache clock cycle
    pub clock_period: u64,
}

impl CacheConfig {
    /// Number of blocks the cache holds.
    pub const fn capacity(&self) -> usize {
        if self.block_size == 0 {
            0
        } else {
            self.size_bytes / self.block_size
        }
    }

    /// Checks the geometry.
    ///
    /// # Errors
    ///
    /// The first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.block_size.is_power_of_two() {
            return Err(ConfigError::BlockSizeNotPowerOfTwo(self.block_size));
        }
        if self.size_bytes % self.block_size != 0 {
            return Err(ConfigError::SizeNotMultiple {
                size: self.size_bytes,
                block_size: self.block_size,
            });
        }
        if self.capacity() == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.cpu_side_ports == 0 {
            return Err(ConfigError::NoCpuSidePorts);
        }
        if self.clock_period == 0 {
            return Err(ConfigError::ZeroClockPeriod);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            access_latency: defaults::ACCESS_LATENCY,
            block_size: defaults::BLOCK_SIZE,
            size_bytes: defaults::CACHE_SIZE,
            cpu_side_ports: defaults::CPU_SIDE_PORTS,
            clock_period: defaults::CLOCK_PERIOD,
        }
    }
}

/// Backing memory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// First address served
    pub base: u64,
    /// Bytes served
    pub size_bytes: u64,
    /// Ticks from accepting a request to responding
    pub latency: u64,
    /// Outstanding requests accepted before refusing with a retry
    pub queue_depth: usize,
}

impl MemoryConfig {
    /// Address range served by the memory.
    pub const fn range(&self) -> AddrRange {
        AddrRange::with_size(self.base, self.size_bytes)
    }

    /// Checks the memory parameters.
    ///
    /// # Errors
    ///
    /// The first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size_bytes == 0 {
            return Err(ConfigError::EmptyMemory);
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base: defaults::MEMORY_BASE,
            size_bytes: defaults::MEMORY_SIZE,
            latency: defaults::MEMORY_LATENCY,
            queue_depth: defaults::MEMORY_QUEUE_DEPTH,
        }
    }
}

/// Run control settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the replacement policy's random source
    pub seed: u64,
    /// Stop once simulated time passes this tick
    pub max_tick: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: defaults::SEED,
            max_tick: None,
        }
    }
}
