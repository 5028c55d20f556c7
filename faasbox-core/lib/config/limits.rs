use std::fmt;

use getset::Getters;
use typed_builder::TypedBuilder;

use faasbox_utils::DEFAULT_MAX_CPUS;

use crate::{FaasboxError, FaasboxResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// CPU and memory caps applied to every execution.
#[derive(Debug, Clone, PartialEq, Getters, TypedBuilder)]
#[getset(get = "pub with_prefix")]
pub struct ResourceLimits {
    /// Number of CPUs, may be fractional.
    #[builder(default = DEFAULT_MAX_CPUS)]
    cpus: f64,

    /// Memory ceiling. Swap is always disabled.
    #[builder(default)]
    memory: MemorySize,
}

/// A memory size in bytes, written the way systemd and container engines accept it (`128M`, `1G`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySize(u64);

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ResourceLimits {
    /// Creates limits, rejecting non-positive CPU counts.
    pub fn new(cpus: f64, memory: MemorySize) -> FaasboxResult<Self> {
        if !cpus.is_finite() || cpus <= 0.0 {
            return Err(FaasboxError::Validation(format!(
                "cpu limit must be positive, got {}",
                cpus
            )));
        }

        Ok(Self { cpus, memory })
    }

    /// The systemd `CPUQuota` value, e.g. `150%` for 1.5 CPUs.
    pub fn cpu_quota(&self) -> String {
        format!("{}%", (self.cpus * 100.0).round() as u64)
    }
}

impl MemorySize {
    /// Creates a size from a byte count.
    pub fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Parses `512`, `64K`, `128M`, `1G` (case-insensitive, optional trailing `B`).
    pub fn parse(value: &str) -> FaasboxResult<Self> {
        let trimmed = value.trim();
        let upper = trimmed.to_ascii_uppercase();
        let digits = upper.strip_suffix('B').unwrap_or(&upper);

        let (number, multiplier) = match digits.chars().last() {
            Some('K') => (&digits[..digits.len() - 1], 1u64 << 10),
            Some('M') => (&digits[..digits.len() - 1], 1u64 << 20),
            Some('G') => (&digits[..digits.len() - 1], 1u64 << 30),
            _ => (digits, 1u64),
        };

        let number: u64 = number.trim().parse().map_err(|_| {
            FaasboxError::Validation(format!("invalid memory size: {:?}", trimmed))
        })?;

        if number == 0 {
            return Err(FaasboxError::Validation(format!(
                "memory size must be positive: {:?}",
                trimmed
            )));
        }

        Ok(Self(number * multiplier))
    }

    /// The size in bytes.
    pub fn bytes(&self) -> u64 {
        self.0
    }

    /// The size in whole mebibytes, rounded up.
    pub fn mebibytes(&self) -> u64 {
        self.0.div_ceil(1 << 20)
    }

    /// The size in the container engine's `--memory` format, e.g. `128m`.
    pub fn as_container_arg(&self) -> String {
        format!("{}m", self.mebibytes())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Default for MemorySize {
    fn default() -> Self {
        Self(128 << 20)
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const G: u64 = 1 << 30;
        const M: u64 = 1 << 20;
        const K: u64 = 1 << 10;

        match self.0 {
            b if b % G == 0 => write!(f, "{}G", b / G),
            b if b % M == 0 => write!(f, "{}M", b / M),
            b if b % K == 0 => write!(f, "{}K", b / K),
            b => write!(f, "{}", b),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_size_parse() {
        assert_eq!(MemorySize::parse("128M").unwrap().bytes(), 128 << 20);
        assert_eq!(MemorySize::parse("1g").unwrap().bytes(), 1 << 30);
        assert_eq!(MemorySize::parse("64KB").unwrap().bytes(), 64 << 10);
        assert_eq!(MemorySize::parse("4096").unwrap().bytes(), 4096);
        assert!(MemorySize::parse("lots").is_err());
        assert!(MemorySize::parse("0M").is_err());
    }

    #[test]
    fn test_memory_size_formats() {
        let size = MemorySize::parse("128M").unwrap();
        assert_eq!(size.to_string(), "128M");
        assert_eq!(size.as_container_arg(), "128m");
        assert_eq!(MemorySize::from_bytes(1536 << 10).to_string(), "1536K");
    }

    #[test]
    fn test_default_limits() {
        let limits = ResourceLimits::default();
        assert_eq!(*limits.get_cpus(), 1.0);
        assert_eq!(limits.get_memory().to_string(), "128M");
        assert_eq!(limits.cpu_quota(), "100%");
    }

    #[test]
    fn test_cpu_quota_for_fractional_cpus() {
        let limits = ResourceLimits::new(1.5, MemorySize::parse("256M").unwrap()).unwrap();
        assert_eq!(limits.cpu_quota(), "150%");
        assert!(ResourceLimits::new(0.0, MemorySize::from_bytes(1)).is_err());
    }
}
