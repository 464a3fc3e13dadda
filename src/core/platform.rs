use core::fmt::Debug;
use super::*;

/// Compute platform. Platforms aren't reference counted, so this is a plain copy of the handle.
#[derive(Clone)]
pub struct RawPlatform {
    handle: Handle,
    backend: SharedBackend,
}

impl RawPlatform {
    /// # Safety
    /// `handle` must be a platform issued by `backend`.
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

    /// Returns every platform of the global backend.
    #[inline(always)]
    pub fn all () -> Result<Vec<RawPlatform>> {
        Self::all_in(global_backend())
    }

    pub fn all_in (backend: &SharedBackend) -> Result<Vec<RawPlatform>> {
        let handles = tri!(Operation::Enumerate, backend.platforms());
        Ok(handles.into_iter().map(|handle| Self { handle, backend: backend.clone() }).collect())
    }

    /// Returns the first platform of `backend`.
    pub fn first_in (backend: &SharedBackend) -> Result<RawPlatform> {
        Self::all_in(backend)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::new(ErrorCode::InvalidPlatform, Operation::Enumerate, "no platforms found"))
    }

    /// Platform name string.
    #[inline(always)]
    pub fn name (&self) -> Result<String> {
        self.get_info(InfoParam::PlatformName)
    }

    /// Platform vendor string.
    #[inline(always)]
    pub fn vendor (&self) -> Result<String> {
        self.get_info(InfoParam::PlatformVendor)
    }

    /// Version string.
    #[inline(always)]
    pub fn version (&self) -> Result<String> {
        self.get_info(InfoParam::PlatformVersion)
    }

    /// Returns the platform's devices of the given type.
    pub fn devices (&self, ty: DeviceType) -> Result<Vec<RawDevice>> {
        let handles = tri!(Operation::Enumerate, self.backend.devices(self.handle, ty));
        Ok(handles.into_iter().map(|id| unsafe { RawDevice::from_raw(id, self.backend.clone()) }).collect())
    }

    #[inline]
    fn get_info<T: FromInfo> (&self, param: InfoParam) -> Result<T> {
        let value = tri!(Operation::GetInfo, self.backend.get_info(ObjectKind::Platform, self.handle, param));
        T::from_info(value).ok_or_else(|| Error::new(ErrorCode::InvalidValue, Operation::GetInfo, format!("unexpected value kind for {param:?}")))
    }
}

impl PartialEq for RawPlatform {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && same_backend(&self.backend, &other.backend)
    }
}

impl Eq for RawPlatform {}

impl Debug for RawPlatform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Platform")
            .field("name", &self.name())
            .field("vendor", &self.vendor())
            .field("version", &self.version())
            .finish()
    }
}
