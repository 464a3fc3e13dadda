use std::{collections::{BTreeSet, HashMap}, fmt::Debug, num::NonZeroUsize, panic::{catch_unwind, AssertUnwindSafe}, sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard}};
use crate::{buffer::MemFlags, core::{*, codes::*}};
use super::{command::Command, config::{HostConfig, HostDeviceConfig}, kernel::{ArgValue, KernelFn}};

/// Backing memory of a buffer and its sub-buffers, kept in words so that kernels can view it as
/// any plain type of alignment up to 8.
pub(super) struct Storage {
    pub id: usize,
    pub len: usize,
    words: RwLock<Vec<u64>>,
}

impl Storage {
    pub fn zeroed (id: usize, len: usize) -> NativeResult<Self> {
        let count = len / 8 + usize::from(len % 8 != 0);
        let mut words = Vec::new();
        words.try_reserve_exact(count).map_err(|_| CL_OUT_OF_HOST_MEMORY)?;
        words.resize(count, 0);
        Ok(Self { id, len, words: RwLock::new(words) })
    }

    pub fn with_contents (id: usize, init: &[u8]) -> NativeResult<Self> {
        let this = Self::zeroed(id, init.len())?;
        bytes_mut(&mut this.write())[..init.len()].copy_from_slice(init);
        Ok(this)
    }

    #[inline]
    pub fn read (&self) -> RwLockReadGuard<'_, Vec<u64>> {
        self.words.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn write (&self) -> RwLockWriteGuard<'_, Vec<u64>> {
        self.words.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("id", &self.id).field("len", &self.len).finish_non_exhaustive()
    }
}

#[inline(always)]
pub(super) fn bytes (words: &[u64]) -> &[u8] {
    bytemuck::cast_slice(words)
}

#[inline(always)]
pub(super) fn bytes_mut (words: &mut [u64]) -> &mut [u8] {
    bytemuck::cast_slice_mut(words)
}

pub(super) struct PlatformObj {
    pub name: String,
    pub vendor: String,
    pub devices: Vec<Handle>,
}

pub(super) struct DeviceObj {
    pub platform: Handle,
    pub vendor: String,
    pub cfg: HostDeviceConfig,
    pub compute_units: u32,
    /// Bytes of global memory held by live buffers
    pub allocated: u64,
}

impl DeviceObj {
    #[inline]
    pub fn queue_properties (&self) -> QueueProperties {
        QueueProperties::new(self.cfg.out_of_order, true)
    }
}

pub(super) struct ContextObj {
    pub devices: Vec<Handle>,
}

pub(super) struct QueueObj {
    pub context: Handle,
    pub device: Handle,
    pub props: QueueProperties,
    /// Enqueued but not yet flushed, in enqueue order
    pub unflushed: Vec<Handle>,
    /// Not yet terminal
    pub outstanding: BTreeSet<Handle>,
    /// Last command of an in-order queue
    pub last: Option<Handle>,
}

pub(super) struct MemObj {
    pub context: Handle,
    pub flags: MemFlags,
    pub size: usize,
    pub offset: usize,
    pub parent: Option<Handle>,
    pub storage: Arc<Storage>,
    pub destructors: Vec<DestructorCallback>,
    /// Devices whose global memory the buffer is charged to. Empty for sub-buffers.
    pub charged: Vec<Handle>,
}

pub(super) struct EventObj {
    pub context: Handle,
    pub queue: Handle,
    pub command_type: u32,
    pub status: i32,
    pub profiling: bool,
    /// Queued, submit, start and end timestamps
    pub times: [u64; 4],
    pub callbacks: Vec<EventCallback>,
    /// Explicit wait-list, retained through `held`
    pub deps: Vec<Handle>,
    /// Ordering-only dependencies, not retained
    pub implicit: Vec<Handle>,
    /// Events waiting on this one, and whether they listed it explicitly
    pub dependents: Vec<(Handle, bool)>,
    pub remaining: usize,
    pub dep_failed: bool,
    pub command: Option<Command>,
    /// Objects retained until the command is terminal
    pub held: Vec<(ObjectKind, Handle)>,
}

impl EventObj {
    #[inline(always)]
    pub fn is_terminal (&self) -> bool {
        self.status <= CL_COMPLETE
    }
}

pub(super) struct KernelObj {
    pub context: Handle,
    pub name: String,
    pub num_args: u32,
    pub devices: Vec<Handle>,
    pub f: Arc<KernelFn>,
    pub args: Vec<Option<ArgValue>>,
}

pub(super) enum Object {
    Platform (PlatformObj),
    Device (DeviceObj),
    Context (ContextObj),
    Queue (QueueObj),
    Mem (MemObj),
    Event (EventObj),
    Kernel (KernelObj),
}

impl Object {
    #[inline]
    pub fn kind (&self) -> ObjectKind {
        match self {
            Self::Platform(_) => ObjectKind::Platform,
            Self::Device(_) => ObjectKind::Device,
            Self::Context(_) => ObjectKind::Context,
            Self::Queue(_) => ObjectKind::CommandQueue,
            Self::Mem(_) => ObjectKind::MemObject,
            Self::Event(_) => ObjectKind::Event,
            Self::Kernel(_) => ObjectKind::Kernel,
        }
    }

    #[inline]
    fn context (&self) -> Option<Handle> {
        match self {
            Self::Queue(x) => Some(x.context),
            Self::Mem(x) => Some(x.context),
            Self::Event(x) => Some(x.context),
            Self::Kernel(x) => Some(x.context),
            _ => None
        }
    }
}

/// Platforms and devices live as long as the backend, and ignore retain and release.
#[inline(always)]
fn is_counted (kind: ObjectKind) -> bool {
    !matches!(kind, ObjectKind::Platform | ObjectKind::Device)
}

struct Entry {
    refs: u32,
    object: Object,
}

/// A memory object whose last reference is gone. Its destructor callbacks have to run outside of
/// the registry lock, right before its storage is dropped.
pub(super) struct Burial {
    handle: Handle,
    destructors: Vec<DestructorCallback>,
    storage: Arc<Storage>,
}

impl Burial {
    pub fn bury (self) {
        let Self { handle, destructors, storage } = self;
        for f in destructors.into_iter().rev() {
            if catch_unwind(AssertUnwindSafe(|| f(handle))).is_err() {
                tracing::error!(handle = handle.as_usize(), "destructor callback panicked");
            }
        }
        drop(storage);
    }
}

/// Every live object of a host backend, by handle. Handles are never reused.
pub(super) struct Registry {
    next: NonZeroUsize,
    next_storage: usize,
    objects: HashMap<Handle, Entry>,
    pub platform: Handle,
    /// Commands that aren't terminal yet
    pub pending: usize,
    /// Workers to stop once no command is pending, set when the backend is dropped
    pub stopping: Option<usize>,
}

impl Registry {
    pub fn new (cfg: &HostConfig) -> Self {
        let mut this = Self {
            next: NonZeroUsize::MIN,
            next_storage: 0,
            objects: HashMap::new(),
            platform: Handle::from(NonZeroUsize::MIN),
            pending: 0,
            stopping: None
        };

        this.platform = this.insert(Object::Platform(PlatformObj {
            name: cfg.platform_name.clone(),
            vendor: cfg.platform_vendor.clone(),
            devices: Vec::new()
        }), 1);

        let platform = this.platform;
        let compute_units = u32::try_from(cfg.workers.get()).unwrap_or(u32::MAX);
        let devices = cfg.devices.iter()
            .map(|device| this.insert(Object::Device(DeviceObj {
                platform,
                vendor: cfg.platform_vendor.clone(),
                cfg: device.clone().normalized(),
                compute_units,
                allocated: 0
            }), 1))
            .collect::<Vec<_>>();

        if let Some(Entry { object: Object::Platform(x), .. }) = this.objects.get_mut(&platform) {
            x.devices = devices;
        }

        this
    }

    pub fn insert (&mut self, object: Object, refs: u32) -> Handle {
        let handle = Handle::from(self.next);
        self.next = self.next.saturating_add(1);
        tracing::debug!(handle = handle.as_usize(), kind = ?object.kind(), "object created");
        self.objects.insert(handle, Entry { refs, object });
        handle
    }

    pub fn storage_id (&mut self) -> usize {
        self.next_storage += 1;
        self.next_storage
    }

    /// Handles of every live command queue
    pub fn queues (&self) -> Vec<Handle> {
        self.objects.iter()
            .filter(|(_, entry)| matches!(entry.object, Object::Queue(_)))
            .map(|(handle, _)| *handle)
            .collect()
    }

    #[inline]
    pub fn kind_of (&self, handle: Handle) -> Option<ObjectKind> {
        self.objects.get(&handle).map(|x| x.object.kind())
    }

    pub fn retain (&mut self, kind: ObjectKind, handle: Handle) -> NativeResult<()> {
        match self.objects.get_mut(&handle) {
            Some(entry) if entry.object.kind() == kind => {
                if is_counted(kind) {
                    entry.refs = entry.refs.checked_add(1).ok_or(CL_OUT_OF_RESOURCES)?;
                }
                Ok(())
            },
            _ => Err(kind.invalid_code())
        }
    }

    /// Drops one reference, destroying the object and releasing whatever it holds once none are
    /// left. Memory objects that are destroyed are pushed onto `graveyard`.
    pub fn release (&mut self, kind: ObjectKind, handle: Handle, graveyard: &mut Vec<Burial>) -> NativeResult<()> {
        match self.kind_of(handle) {
            Some(x) if x == kind => {},
            _ => return Err(kind.invalid_code())
        }

        let mut stack = vec![handle];
        while let Some(handle) = stack.pop() {
            let entry = match self.objects.get_mut(&handle) {
                Some(x) if is_counted(x.object.kind()) => x,
                _ => continue
            };

            entry.refs -= 1;
            if entry.refs > 0 {
                continue
            }

            let object = match self.objects.remove(&handle) {
                Some(entry) => entry.object,
                None => continue
            };

            tracing::debug!(handle = handle.as_usize(), kind = ?object.kind(), "object destroyed");
            match object {
                Object::Queue(queue) => stack.push(queue.context),
                Object::Event(event) => stack.push(event.context),
                Object::Kernel(kernel) => stack.push(kernel.context),
                Object::Mem(mem) => {
                    stack.push(mem.context);
                    stack.extend(mem.parent);

                    for device in &mem.charged {
                        if let Ok(device) = self.device_mut(*device) {
                            device.allocated = device.allocated.saturating_sub(mem.size as u64);
                        }
                    }

                    graveyard.push(Burial { handle, destructors: mem.destructors, storage: mem.storage });
                },
                Object::Context(_) | Object::Platform(_) | Object::Device(_) => {}
            }
        }

        Ok(())
    }

    pub fn info (&self, kind: ObjectKind, handle: Handle, param: InfoParam) -> NativeResult<InfoValue> {
        use InfoParam as P;
        use InfoValue as V;

        let entry = match self.objects.get(&handle) {
            Some(x) if x.object.kind() == kind => x,
            _ => return Err(kind.invalid_code())
        };

        let value = match (&entry.object, param) {
            (object, P::ReferenceCount) if is_counted(object.kind()) => V::Uint(u64::from(entry.refs)),
            (object, P::Context) => V::Handle(Some(object.context().ok_or(CL_INVALID_VALUE)?)),

            (Object::Platform(x), P::PlatformName) => V::String(x.name.clone()),
            (Object::Platform(x), P::PlatformVendor) => V::String(x.vendor.clone()),
            (Object::Platform(_), P::PlatformVersion) => V::String(format!("OpenCL 1.2 flare-host {}", env!("CARGO_PKG_VERSION"))),

            (Object::Device(x), P::DeviceName) => V::String(x.cfg.name.clone()),
            (Object::Device(x), P::DeviceVendor) => V::String(x.vendor.clone()),
            (Object::Device(x), P::DeviceType) => V::Uint(x.cfg.ty.bits()),
            (Object::Device(x), P::DevicePlatform) => V::Handle(Some(x.platform)),
            (Object::Device(x), P::DeviceAvailable) => V::Bool(x.cfg.available),
            (Object::Device(x), P::DeviceMemBaseAddrAlign) => V::Uint(8 * x.cfg.base_addr_align as u64),
            (Object::Device(x), P::DeviceMaxComputeUnits) => V::Uint(u64::from(x.compute_units)),
            (Object::Device(x), P::DeviceMaxWorkGroupSize) => V::Uint(x.cfg.max_work_group_size as u64),
            (Object::Device(x), P::DeviceMaxWorkItemSizes) => V::Sizes(x.cfg.max_work_item_sizes.to_vec()),
            (Object::Device(x), P::DeviceGlobalMemSize) => V::Uint(x.cfg.global_mem_size),
            (Object::Device(x), P::DeviceMaxMemAllocSize) => V::Uint(x.cfg.max_mem_alloc_size),
            (Object::Device(x), P::DeviceQueueProperties) => V::Uint(x.queue_properties().bits()),

            (Object::Context(x), P::ContextDevices) => V::Handles(x.devices.clone()),
            (Object::Context(x), P::ContextNumDevices) => V::Uint(x.devices.len() as u64),

            (Object::Queue(x), P::QueueDevice) => V::Handle(Some(x.device)),
            (Object::Queue(x), P::QueueProperties) => V::Uint(x.props.bits()),

            (Object::Mem(_), P::MemType) => V::Uint(u64::from(CL_MEM_OBJECT_BUFFER)),
            (Object::Mem(x), P::MemFlags) => V::Uint(x.flags.to_bits()),
            (Object::Mem(x), P::MemSize) => V::Uint(x.size as u64),
            (Object::Mem(x), P::MemOffset) => V::Uint(x.offset as u64),
            (Object::Mem(x), P::MemAssociatedMemObject) => V::Handle(x.parent),

            (Object::Event(x), P::EventCommandQueue) => V::Handle(Some(x.queue)),
            (Object::Event(x), P::EventCommandType) => V::Uint(u64::from(x.command_type)),
            (Object::Event(x), P::EventCommandExecutionStatus) => V::Int(i64::from(x.status)),
            (Object::Event(x), P::ProfilingQueued | P::ProfilingSubmit | P::ProfilingStart | P::ProfilingEnd) => {
                if !x.profiling || x.status != CL_COMPLETE {
                    return Err(CL_PROFILING_INFO_NOT_AVAILABLE)
                }

                let idx = match param {
                    P::ProfilingQueued => 0,
                    P::ProfilingSubmit => 1,
                    P::ProfilingStart => 2,
                    _ => 3
                };
                V::Uint(x.times[idx])
            },

            (Object::Kernel(x), P::KernelFunctionName) => V::String(x.name.clone()),
            (Object::Kernel(x), P::KernelNumArgs) => V::Uint(u64::from(x.num_args)),

            _ => return Err(CL_INVALID_VALUE)
        };

        Ok(value)
    }
}

macro_rules! accessors {
    ($($get:ident $(/ $get_mut:ident)? => $variant:ident ($ty:ty), $code:ident);+ $(;)?) => {
        impl Registry {
            $(
                #[inline]
                pub fn $get (&self, handle: Handle) -> NativeResult<&$ty> {
                    match self.objects.get(&handle) {
                        Some(Entry { object: Object::$variant(x), .. }) => Ok(x),
                        _ => Err($code)
                    }
                }

                $(
                    #[inline]
                    pub fn $get_mut (&mut self, handle: Handle) -> NativeResult<&mut $ty> {
                        match self.objects.get_mut(&handle) {
                            Some(Entry { object: Object::$variant(x), .. }) => Ok(x),
                            _ => Err($code)
                        }
                    }
                )?
            )+
        }
    };
}

accessors! {
    platform => Platform (PlatformObj), CL_INVALID_PLATFORM;
    device / device_mut => Device (DeviceObj), CL_INVALID_DEVICE;
    context => Context (ContextObj), CL_INVALID_CONTEXT;
    queue / queue_mut => Queue (QueueObj), CL_INVALID_COMMAND_QUEUE;
    mem / mem_mut => Mem (MemObj), CL_INVALID_MEM_OBJECT;
    event / event_mut => Event (EventObj), CL_INVALID_EVENT;
    kernel / kernel_mut => Kernel (KernelObj), CL_INVALID_KERNEL;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry () -> Registry {
        Registry::new(&HostConfig::default())
    }

    #[test]
    fn handles_are_never_reused() {
        let mut reg = registry();
        let mut graveyard = Vec::new();

        let first = reg.insert(Object::Context(ContextObj { devices: Vec::new() }), 1);
        reg.release(ObjectKind::Context, first, &mut graveyard).unwrap();
        let second = reg.insert(Object::Context(ContextObj { devices: Vec::new() }), 1);

        assert_ne!(first, second);
        assert_eq!(reg.retain(ObjectKind::Context, first), Err(CL_INVALID_CONTEXT));
    }

    #[test]
    fn release_cascades_to_held_objects() {
        let mut reg = registry();
        let mut graveyard = Vec::new();

        let ctx = reg.insert(Object::Context(ContextObj { devices: Vec::new() }), 1);
        let id = reg.storage_id();
        let mem = reg.insert(Object::Mem(MemObj {
            context: ctx,
            flags: MemFlags::default(),
            size: 8,
            offset: 0,
            parent: None,
            storage: Arc::new(Storage::zeroed(id, 8).unwrap()),
            destructors: Vec::new(),
            charged: Vec::new()
        }), 1);

        reg.retain(ObjectKind::Context, ctx).unwrap();
        reg.release(ObjectKind::Context, ctx, &mut graveyard).unwrap();
        assert!(reg.context(ctx).is_ok());

        reg.release(ObjectKind::MemObject, mem, &mut graveyard).unwrap();
        assert_eq!(graveyard.len(), 1);
        assert_eq!(reg.context(ctx).err(), Some(CL_INVALID_CONTEXT));
    }

    #[test]
    fn info_of_the_wrong_kind_is_invalid() {
        let reg = registry();
        let platform = reg.platform;
        assert_eq!(reg.info(ObjectKind::Platform, platform, InfoParam::MemSize), Err(CL_INVALID_VALUE));
        assert_eq!(reg.info(ObjectKind::Platform, platform, InfoParam::ReferenceCount), Err(CL_INVALID_VALUE));
        assert_eq!(reg.info(ObjectKind::Device, platform, InfoParam::DeviceName), Err(CL_INVALID_DEVICE));
    }
}
