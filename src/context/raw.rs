use crate::core::*;
use super::ContextProperties;

raw_object! {
    /// Owned reference to a context: a fixed set of devices scoping the queues, memory objects and
    /// kernels created on it.
    pub struct RawContext => Context
}

impl RawContext {
    /// Creates a context over `devices`, which must all belong to the same backend.
    pub fn new (props: ContextProperties, devices: &[RawDevice]) -> Result<Self> {
        const OP: Operation = Operation::CreateContext;

        let backend = match devices.first() {
            Some(x) => x.backend().clone(),
            None => return Err(Error::new(ErrorCode::InvalidValue, OP, "no devices specified"))
        };

        if devices.iter().any(|x| !same_backend(x.backend(), &backend)) {
            return Err(Error::new(ErrorCode::InvalidDevice, OP, "devices belong to different backends"));
        }

        let devices = devices.iter().map(RawDevice::handle).collect::<Vec<_>>();
        let id = tri!(OP, backend.create_context(&props, &devices));
        unsafe { Ok(Self::from_raw(id, backend)) }
    }

    /// Creates a context over the devices of the given type, on the platform of `props` (or the first
    /// platform) of the global backend.
    #[inline(always)]
    pub fn from_type (props: ContextProperties, ty: DeviceType) -> Result<Self> {
        Self::from_type_in(global_backend(), props, ty)
    }

    pub fn from_type_in (backend: &SharedBackend, props: ContextProperties, ty: DeviceType) -> Result<Self> {
        let id = tri!(Operation::CreateContext, backend.create_context_from_type(&props, ty));
        unsafe { Ok(Self::from_raw(id, backend.clone())) }
    }

    /// Return the list of devices in context.
    pub fn devices (&self) -> Result<Vec<RawDevice>> {
        let ids = self.info_as::<Vec<Handle>>(InfoParam::ContextDevices)?;
        Ok(ids.into_iter().map(|id| unsafe { RawDevice::from_raw(id, self.backend().clone()) }).collect())
    }

    /// Return the number of devices in context.
    #[inline(always)]
    pub fn num_devices (&self) -> Result<u32> {
        self.info_as(InfoParam::ContextNumDevices)
    }
}
