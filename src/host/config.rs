use std::num::NonZeroUsize;
use crate::core::DeviceType;

/// Environment variable overriding the number of worker threads of [`HostConfig::from_env`]
pub const WORKERS_ENV: &str = "FLARE_HOST_WORKERS";

/// Configuration of a [`HostBackend`](super::HostBackend): one platform with the listed devices,
/// whose commands run on a shared pool of worker threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub workers: NonZeroUsize,
    pub platform_name: String,
    pub platform_vendor: String,
    pub devices: Vec<HostDeviceConfig>,
}

impl HostConfig {
    /// A configuration without devices
    #[inline]
    pub fn new (workers: NonZeroUsize) -> Self {
        Self {
            workers,
            platform_name: "Flare Host".to_string(),
            platform_vendor: "flare".to_string(),
            devices: Vec::new()
        }
    }

    /// Default configuration, with the worker count taken from `FLARE_HOST_WORKERS` if it's set to a
    /// positive integer.
    pub fn from_env () -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var(WORKERS_ENV) {
            match v.trim().parse::<NonZeroUsize>() {
                Ok(workers) => cfg.workers = workers,
                Err(e) => tracing::warn!(value = %v, "ignoring {WORKERS_ENV}: {e}")
            }
        }

        cfg
    }

    #[inline(always)]
    pub fn with_workers (self, workers: NonZeroUsize) -> Self {
        Self { workers, ..self }
    }

    #[inline]
    pub fn with_platform (self, name: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self { platform_name: name.into(), platform_vendor: vendor.into(), ..self }
    }

    /// Appends a device to the platform
    #[inline]
    pub fn with_device (mut self, device: HostDeviceConfig) -> Self {
        self.devices.push(device);
        self
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
        Self::new(workers).with_device(HostDeviceConfig::default())
    }
}

/// Simulated device limits and capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDeviceConfig {
    pub name: String,
    pub ty: DeviceType,
    pub available: bool,
    /// Whether queues on this device may be created with out-of-order execution.
    pub out_of_order: bool,
    /// Required alignment of sub-buffer origins, in bytes. Values that aren't a power of two are
    /// rounded up to one when the backend is created.
    pub base_addr_align: usize,
    pub max_work_group_size: usize,
    pub max_work_item_sizes: [usize; 3],
    pub global_mem_size: u64,
    pub max_mem_alloc_size: u64,
}

impl HostDeviceConfig {
    #[inline]
    pub fn new (name: impl Into<String>, ty: DeviceType) -> Self {
        Self {
            name: name.into(),
            ty,
            available: true,
            out_of_order: true,
            base_addr_align: 128,
            max_work_group_size: 256,
            max_work_item_sizes: [256; 3],
            global_mem_size: 1 << 30,
            max_mem_alloc_size: 1 << 28
        }
    }

    #[inline(always)]
    pub fn with_available (self, available: bool) -> Self {
        Self { available, ..self }
    }

    #[inline(always)]
    pub fn with_out_of_order (self, out_of_order: bool) -> Self {
        Self { out_of_order, ..self }
    }

    /// Sets the sub-buffer alignment, rounded up to a power of two.
    #[inline]
    pub fn with_base_addr_align (self, base_addr_align: usize) -> Self {
        Self { base_addr_align: align_up(base_addr_align), ..self }
    }

    #[inline(always)]
    pub fn with_work_limits (self, max_work_group_size: usize, max_work_item_sizes: [usize; 3]) -> Self {
        Self { max_work_group_size, max_work_item_sizes, ..self }
    }

    #[inline(always)]
    pub fn with_memory (self, global_mem_size: u64, max_mem_alloc_size: u64) -> Self {
        Self { global_mem_size, max_mem_alloc_size, ..self }
    }

    /// The configuration a device is registered with. Sub-buffer offsets are checked modulo the
    /// alignment, so it must be a non-zero power of two.
    pub(super) fn normalized (self) -> Self {
        if !self.base_addr_align.is_power_of_two() {
            tracing::warn!(device = %self.name, align = self.base_addr_align, "rounding base address alignment up to a power of two");
        }

        let base_addr_align = align_up(self.base_addr_align);
        Self { base_addr_align, ..self }
    }
}

#[inline]
fn align_up (align: usize) -> usize {
    align.checked_next_power_of_two().unwrap_or(1 << (usize::BITS - 1))
}

impl Default for HostDeviceConfig {
    #[inline]
    fn default() -> Self {
        Self::new("Flare Host CPU", DeviceType::CPU)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_one_cpu_device() {
        let cfg = HostConfig::default();
        assert_eq!(cfg.devices.len(), 1);
        assert_eq!(cfg.devices[0].ty, DeviceType::CPU);
        assert!(cfg.devices[0].base_addr_align.is_power_of_two());
    }

    #[test]
    fn builders_compose() {
        let workers = NonZeroUsize::new(3).unwrap();
        let cfg = HostConfig::new(workers)
            .with_platform("Test", "tests")
            .with_device(HostDeviceConfig::new("gpu", DeviceType::GPU).with_out_of_order(false))
            .with_device(HostDeviceConfig::default().with_memory(4096, 1024));

        assert_eq!(cfg.workers.get(), 3);
        assert_eq!(cfg.platform_name, "Test");
        assert!(!cfg.devices[0].out_of_order);
        assert_eq!(cfg.devices[1].max_mem_alloc_size, 1024);
    }

    #[test]
    fn alignment_is_a_non_zero_power_of_two() {
        let zero = HostDeviceConfig { base_addr_align: 0, ..Default::default() };
        assert_eq!(zero.normalized().base_addr_align, 1);

        let odd = HostDeviceConfig { base_addr_align: 48, ..Default::default() };
        assert_eq!(odd.normalized().base_addr_align, 64);

        assert_eq!(HostDeviceConfig::default().with_base_addr_align(0).base_addr_align, 1);
        assert_eq!(HostDeviceConfig::default().normalized().base_addr_align, 128);
    }
}
