use std::{ffi::c_void, fmt::Debug, num::NonZeroUsize, sync::Arc};
use crate::{buffer::{BufferRect, MemAccess, MemFlags, RectCopy}, context::ContextProperties};
use super::{codes::*, DeviceType, QueueProperties};

/// Result of a raw backend call. The error side is the native result code, in OpenCL numbering.
pub type NativeResult<T> = ::core::result::Result<T, i32>;

/// Shared, thread-safe reference to a backend.
pub type SharedBackend = Arc<dyn Backend>;

/// Callback invoked once an event reaches a terminal status, with the event and its status code.
pub type EventCallback = Box<dyn FnOnce(Handle, i32) + Send>;

/// Callback invoked right before a memory object's storage is freed.
pub type DestructorCallback = Box<dyn FnOnce(Handle) + Send>;

/// Opaque, non-null native handle. Its value is never interpreted outside the backend that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Handle (NonZeroUsize);

impl Handle {
    #[inline(always)]
    pub const fn new (v: usize) -> Option<Self> {
        match NonZeroUsize::new(v) {
            Some(v) => Some(Self(v)),
            None => None
        }
    }

    #[inline(always)]
    pub const fn as_usize (self) -> usize {
        self.0.get()
    }

    #[inline(always)]
    pub fn from_ptr (ptr: *mut c_void) -> Option<Self> {
        Self::new(ptr as usize)
    }

    #[inline(always)]
    pub const fn as_ptr (self) -> *mut c_void {
        self.0.get() as *mut c_void
    }
}

impl From<NonZeroUsize> for Handle {
    #[inline(always)]
    fn from(v: NonZeroUsize) -> Self {
        Self(v)
    }
}

/// Kind of object a [`Handle`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Platform,
    Device,
    Context,
    CommandQueue,
    MemObject,
    Event,
    Kernel,
}

impl ObjectKind {
    /// Native code reported when a handle of this kind isn't valid.
    #[inline]
    pub const fn invalid_code (self) -> i32 {
        match self {
            Self::Platform => CL_INVALID_PLATFORM,
            Self::Device => CL_INVALID_DEVICE,
            Self::Context => CL_INVALID_CONTEXT,
            Self::CommandQueue => CL_INVALID_COMMAND_QUEUE,
            Self::MemObject => CL_INVALID_MEM_OBJECT,
            Self::Event => CL_INVALID_EVENT,
            Self::Kernel => CL_INVALID_KERNEL,
        }
    }
}

/// Information that can be queried from an object.
/// Asking for a parameter that the object's kind doesn't have fails with `CL_INVALID_VALUE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InfoParam {
    /// Reference count of a context, queue, memory object, event or kernel
    ReferenceCount,
    /// Context of a queue, memory object, event or kernel
    Context,

    PlatformName,
    PlatformVendor,
    PlatformVersion,

    DeviceName,
    DeviceVendor,
    DeviceType,
    DevicePlatform,
    DeviceAvailable,
    /// In bits
    DeviceMemBaseAddrAlign,
    DeviceMaxComputeUnits,
    DeviceMaxWorkGroupSize,
    DeviceMaxWorkItemSizes,
    DeviceGlobalMemSize,
    DeviceMaxMemAllocSize,
    DeviceQueueProperties,

    ContextDevices,
    ContextNumDevices,

    QueueDevice,
    QueueProperties,

    MemType,
    MemFlags,
    MemSize,
    MemOffset,
    MemAssociatedMemObject,

    EventCommandQueue,
    EventCommandType,
    EventCommandExecutionStatus,
    ProfilingQueued,
    ProfilingSubmit,
    ProfilingStart,
    ProfilingEnd,

    KernelFunctionName,
    KernelNumArgs,
}

/// Value of an object query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoValue {
    Uint (u64),
    Int (i64),
    Bool (bool),
    String (String),
    Handle (Option<Handle>),
    Handles (Vec<Handle>),
    Sizes (Vec<usize>),
}

/// Types that can be extracted from an [`InfoValue`]
pub trait FromInfo: Sized {
    fn from_info (v: InfoValue) -> Option<Self>;
}

macro_rules! impl_from_info {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl FromInfo for $ty {
                #[inline]
                fn from_info (v: InfoValue) -> Option<Self> {
                    match v {
                        InfoValue::$variant(x) => <$ty>::try_from(x).ok(),
                        _ => None
                    }
                }
            }
        )+
    };
}

impl_from_info! {
    u64 => Uint,
    u32 => Uint,
    usize => Uint,
    i64 => Int,
    i32 => Int,
}

impl FromInfo for bool {
    #[inline]
    fn from_info (v: InfoValue) -> Option<Self> {
        match v {
            InfoValue::Bool(x) => Some(x),
            InfoValue::Uint(x) => Some(x != 0),
            _ => None
        }
    }
}

impl FromInfo for String {
    #[inline]
    fn from_info (v: InfoValue) -> Option<Self> {
        match v {
            InfoValue::String(x) => Some(x),
            _ => None
        }
    }
}

impl FromInfo for Option<Handle> {
    #[inline]
    fn from_info (v: InfoValue) -> Option<Self> {
        match v {
            InfoValue::Handle(x) => Some(x),
            _ => None
        }
    }
}

impl FromInfo for Handle {
    #[inline]
    fn from_info (v: InfoValue) -> Option<Self> {
        match v {
            InfoValue::Handle(x) => x,
            _ => None
        }
    }
}

impl FromInfo for Vec<Handle> {
    #[inline]
    fn from_info (v: InfoValue) -> Option<Self> {
        match v {
            InfoValue::Handles(x) => Some(x),
            _ => None
        }
    }
}

impl FromInfo for Vec<usize> {
    #[inline]
    fn from_info (v: InfoValue) -> Option<Self> {
        match v {
            InfoValue::Sizes(x) => Some(x),
            _ => None
        }
    }
}

/// Value bound to a kernel argument
#[derive(Debug, Clone, Copy)]
pub enum KernelArg<'a> {
    /// A memory object
    Mem (Handle),
    /// Plain bytes, copied by the backend
    Bytes (&'a [u8]),
    /// Local memory of the given size, in bytes
    Local (usize),
}

/// Driver API the wrapper types are built on.
///
/// Every method maps to one native call and reports failure with the raw native result code, which
/// the caller interprets for the specific operation. Enqueue methods return a new event handle that
/// the caller owns (with a reference count of one).
pub trait Backend: Send + Sync + Debug {
    fn name (&self) -> &str;

    fn platforms (&self) -> NativeResult<Vec<Handle>>;
    fn devices (&self, platform: Handle, ty: DeviceType) -> NativeResult<Vec<Handle>>;

    fn create_context (&self, props: &ContextProperties, devices: &[Handle]) -> NativeResult<Handle>;
    fn create_context_from_type (&self, props: &ContextProperties, ty: DeviceType) -> NativeResult<Handle>;
    fn create_command_queue (&self, context: Handle, device: Handle, props: QueueProperties) -> NativeResult<Handle>;
    fn create_buffer (&self, context: Handle, flags: MemFlags, size: usize, init: Option<&[u8]>) -> NativeResult<Handle>;
    fn create_sub_buffer (&self, buffer: Handle, access: MemAccess, origin: usize, size: usize) -> NativeResult<Handle>;

    fn retain (&self, kind: ObjectKind, handle: Handle) -> NativeResult<()>;
    fn release (&self, kind: ObjectKind, handle: Handle) -> NativeResult<()>;
    fn get_info (&self, kind: ObjectKind, handle: Handle, param: InfoParam) -> NativeResult<InfoValue>;

    fn set_kernel_arg (&self, kernel: Handle, idx: u32, arg: KernelArg<'_>) -> NativeResult<()>;

    /// # Safety
    /// `dst` must be valid for writes of `size` bytes until the returned event completes.
    unsafe fn enqueue_read_buffer (&self, queue: Handle, buffer: Handle, blocking: bool, offset: usize, size: usize, dst: *mut u8, wait: &[Handle]) -> NativeResult<Handle>;
    /// # Safety
    /// `src` must be valid for reads of `size` bytes until the returned event completes.
    unsafe fn enqueue_write_buffer (&self, queue: Handle, buffer: Handle, blocking: bool, offset: usize, size: usize, src: *const u8, wait: &[Handle]) -> NativeResult<Handle>;
    fn enqueue_copy_buffer (&self, queue: Handle, src: Handle, dst: Handle, src_offset: usize, dst_offset: usize, size: usize, wait: &[Handle]) -> NativeResult<Handle>;

    /// # Safety
    /// `dst` must be valid for writes over the host side of `rect` until the returned event completes.
    unsafe fn enqueue_read_buffer_rect (&self, queue: Handle, buffer: Handle, blocking: bool, rect: &BufferRect, dst: *mut u8, wait: &[Handle]) -> NativeResult<Handle>;
    /// # Safety
    /// `src` must be valid for reads over the host side of `rect` until the returned event completes.
    unsafe fn enqueue_write_buffer_rect (&self, queue: Handle, buffer: Handle, blocking: bool, rect: &BufferRect, src: *const u8, wait: &[Handle]) -> NativeResult<Handle>;
    fn enqueue_copy_buffer_rect (&self, queue: Handle, src: Handle, dst: Handle, rect: &RectCopy, wait: &[Handle]) -> NativeResult<Handle>;

    #[allow(clippy::too_many_arguments)]
    fn enqueue_nd_range_kernel (&self, queue: Handle, kernel: Handle, work_dim: u32, offset: Option<&[usize]>, global: &[usize], local: Option<&[usize]>, wait: &[Handle]) -> NativeResult<Handle>;
    fn enqueue_marker (&self, queue: Handle, wait: &[Handle]) -> NativeResult<Handle>;

    fn flush (&self, queue: Handle) -> NativeResult<()>;
    fn finish (&self, queue: Handle) -> NativeResult<()>;
    fn wait_for_events (&self, events: &[Handle]) -> NativeResult<()>;

    /// Registers a completion callback. `None` fails with `CL_INVALID_VALUE`.
    fn set_event_callback (&self, event: Handle, callback: Option<EventCallback>) -> NativeResult<()>;
    /// Registers a destructor callback, run in LIFO order with any other. `None` fails with `CL_INVALID_VALUE`.
    fn set_destructor_callback (&self, mem: Handle, callback: Option<DestructorCallback>) -> NativeResult<()>;
}

/// Returns `true` if both references point to the same backend instance.
#[inline]
pub fn same_backend (a: &SharedBackend, b: &SharedBackend) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
