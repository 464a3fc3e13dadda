use core::{fmt::Debug, num::NonZeroUsize};
use super::*;

/// Compute device. Root devices aren't reference counted, so this is a plain copy of the handle.
#[derive(Clone)]
pub struct RawDevice {
    handle: Handle,
    backend: SharedBackend,
}

impl RawDevice {
    /// # Safety
    /// `handle` must be a device issued by `backend`.
    #[inline(always)]
    pub unsafe fn from_raw (handle: Handle, backend: SharedBackend) -> Self {
        Self { handle, backend }
    }

    #[inline(always)]
    pub fn handle (&self) -> Handle {
        self.handle
    }

    #[inline(always)]
    pub fn backend (&self) -> &SharedBackend {
        &self.backend
    }

    /// Returns every device of every platform of the global backend.
    #[inline(always)]
    pub fn all () -> Result<Vec<RawDevice>> {
        Self::all_in(global_backend())
    }

    pub fn all_in (backend: &SharedBackend) -> Result<Vec<RawDevice>> {
        let mut result = Vec::new();
        for platform in RawPlatform::all_in(backend)? {
            match platform.devices(DeviceType::ALL) {
                Ok(devices) => result.extend(devices),
                Err(e) if e.code() == Some(ErrorCode::DeviceNotFound) => {},
                Err(e) => return Err(e)
            }
        }

        Ok(result)
    }

    /// Returns the first device of the global backend, if any.
    #[inline(always)]
    pub fn first () -> Result<Option<RawDevice>> {
        Ok(Self::all()?.into_iter().next())
    }

    /// Device name string.
    #[inline(always)]
    pub fn name (&self) -> Result<String> {
        self.get_info(InfoParam::DeviceName)
    }

    /// Vendor name string.
    #[inline(always)]
    pub fn vendor (&self) -> Result<String> {
        self.get_info(InfoParam::DeviceVendor)
    }

    /// The device type.
    #[inline(always)]
    pub fn ty (&self) -> Result<DeviceType> {
        let bits = self.get_info::<u64>(InfoParam::DeviceType)?;
        Ok(DeviceType::from_bits_truncate(bits))
    }

    /// The platform associated with this device.
    #[inline(always)]
    pub fn platform (&self) -> Result<RawPlatform> {
        let handle = self.get_info::<Handle>(InfoParam::DevicePlatform)?;
        unsafe { Ok(RawPlatform::from_raw(handle, self.backend.clone())) }
    }

    /// Is `true` if the device is available and `false` otherwise.
    #[inline(always)]
    pub fn available (&self) -> Result<bool> {
        self.get_info(InfoParam::DeviceAvailable)
    }

    /// Alignment requirement, in bits, of the origin of a sub-buffer used on this device.
    #[inline(always)]
    pub fn mem_base_addr_align (&self) -> Result<u32> {
        self.get_info(InfoParam::DeviceMemBaseAddrAlign)
    }

    /// The number of parallel compute units on the device.
    #[inline(always)]
    pub fn max_compute_units (&self) -> Result<u32> {
        self.get_info(InfoParam::DeviceMaxComputeUnits)
    }

    /// Maximum number of work-items in a work-group executing a kernel.
    #[inline(always)]
    pub fn max_work_group_size (&self) -> Result<NonZeroUsize> {
        let v = self.get_info::<usize>(InfoParam::DeviceMaxWorkGroupSize)?;
        NonZeroUsize::new(v).ok_or_else(|| Error::new(ErrorCode::InvalidValue, Operation::GetInfo, "zero work-group size"))
    }

    /// Maximum number of work-items that can be specified in each dimension of the work-group.
    #[inline(always)]
    pub fn max_work_item_sizes (&self) -> Result<Vec<usize>> {
        self.get_info(InfoParam::DeviceMaxWorkItemSizes)
    }

    /// Size of global device memory in bytes.
    #[inline(always)]
    pub fn global_mem_size (&self) -> Result<u64> {
        self.get_info(InfoParam::DeviceGlobalMemSize)
    }

    /// Max size of memory object allocation in bytes.
    #[inline(always)]
    pub fn max_mem_alloc_size (&self) -> Result<u64> {
        self.get_info(InfoParam::DeviceMaxMemAllocSize)
    }

    /// Command-queue properties supported by the device.
    #[inline(always)]
    pub fn queue_properties (&self) -> Result<QueueProperties> {
        let bits = self.get_info::<u64>(InfoParam::DeviceQueueProperties)?;
        Ok(QueueProperties::from_bits_truncate(bits))
    }

    #[inline]
    fn get_info<T: FromInfo> (&self, param: InfoParam) -> Result<T> {
        let value = tri!(Operation::GetInfo, self.backend.get_info(ObjectKind::Device, self.handle, param));
        T::from_info(value).ok_or_else(|| Error::new(ErrorCode::InvalidValue, Operation::GetInfo, format!("unexpected value kind for {param:?}")))
    }
}

impl PartialEq for RawDevice {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && same_backend(&self.backend, &other.backend)
    }
}

impl Eq for RawDevice {}

impl Debug for RawDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.handle.as_usize())
            .field("name", &self.name())
            .field("vendor", &self.vendor())
            .field("type", &self.ty())
            .finish()
    }
}

bitflags::bitflags! {
    /// The device type, also used as a selector when creating contexts and enumerating devices.
    #[repr(transparent)]
    pub struct DeviceType : u64 {
        const DEFAULT = 1 << 0;
        const CPU = 1 << 1;
        const GPU = 1 << 2;
        const ACCELERATOR = 1 << 3;
        const CUSTOM = 1 << 4;
        const ALL = 0xFFFFFFFF;
    }
}

impl Default for DeviceType {
    #[inline(always)]
    fn default() -> Self {
        Self::DEFAULT
    }
}
