use std::{ffi::{c_void, CString}, mem::size_of, panic::{catch_unwind, AssertUnwindSafe}, ptr::{addr_of, addr_of_mut}, sync::Arc};
use bytemuck::Pod;
use opencl_sys as sys;
use crate::{buffer::{BufferRect, MemAccess, MemFlags, RectCopy}, context::{ContextProperties, RawContext}, core::{*, codes::*}};

/// Returns early with the native code if it isn't `CL_SUCCESS`.
macro_rules! check {
    ($e:expr) => {
        match $e {
            sys::CL_SUCCESS => {},
            code => return Err(code)
        }
    };
}

/// Backend over the system's OpenCL driver. Handles are the driver's own object pointers.
#[derive(Debug, Default)]
pub struct OpenClBackend {
    _priv: (),
}

impl OpenClBackend {
    #[inline]
    pub fn new () -> SharedBackend {
        Arc::new(Self::default())
    }

    /// Builds `source` for every device of `ctx` and creates the kernel called `name` out of it. The
    /// build log is attached to the error if the build fails.
    pub fn build_kernel (ctx: &RawContext, source: &str, name: &str) -> Result<RawKernel> {
        const OP: Operation = Operation::CreateKernel;

        if ctx.backend().name() != "opencl" {
            return Err(Error::new(ErrorCode::InvalidContext, OP, "context doesn't belong to an OpenCL backend"))
        }

        let name = CString::new(name).map_err(|e| Error::new(ErrorCode::InvalidKernelName, OP, e))?;
        let context = ctx.handle().as_ptr();
        let strings = [source.as_ptr().cast()];
        let lengths = [source.len()];

        let mut err = 0;
        let program = unsafe { sys::clCreateProgramWithSource(context, 1, strings.as_ptr(), lengths.as_ptr(), addr_of_mut!(err)) };
        let program = tri!(OP, created(program, err));

        let result = unsafe { Self::kernel_from_program(program.as_ptr(), &name) };
        unsafe { sys::clReleaseProgram(program.as_ptr()) };

        match result {
            Ok(id) => unsafe { Ok(RawKernel::from_raw(id, ctx.backend().clone())) },
            Err((code, log)) => {
                let mut error = Error::from_code(code, OP);
                error.desc = log;
                Err(error)
            }
        }
    }

    unsafe fn kernel_from_program (program: sys::cl_program, name: &CString) -> ::core::result::Result<Handle, (i32, Option<String>)> {
        let build = sys::clBuildProgram(program, 0, std::ptr::null(), std::ptr::null(), None, std::ptr::null_mut());
        if build != sys::CL_SUCCESS {
            return Err((build, build_log(program)))
        }

        let mut err = 0;
        let kernel = sys::clCreateKernel(program, name.as_ptr(), addr_of_mut!(err));
        created(kernel, err).map_err(|code| (code, None))
    }
}

/// Build log of the program's first device
unsafe fn build_log (program: sys::cl_program) -> Option<String> {
    let mut device: sys::cl_device_id = std::ptr::null_mut();
    let err = sys::clGetProgramInfo(program, sys::CL_PROGRAM_DEVICES, size_of::<sys::cl_device_id>(), addr_of_mut!(device).cast(), std::ptr::null_mut());
    if err != sys::CL_SUCCESS {
        return None
    }

    let mut len = 0;
    if sys::clGetProgramBuildInfo(program, device, sys::CL_PROGRAM_BUILD_LOG, 0, std::ptr::null_mut(), addr_of_mut!(len)) != sys::CL_SUCCESS {
        return None
    }

    let mut log = vec![0u8; len];
    if sys::clGetProgramBuildInfo(program, device, sys::CL_PROGRAM_BUILD_LOG, len, log.as_mut_ptr().cast(), std::ptr::null_mut()) != sys::CL_SUCCESS {
        return None
    }

    Some(String::from_utf8_lossy(&log).trim_end_matches('\0').to_string())
}

#[inline]
fn created (id: *mut c_void, err: i32) -> NativeResult<Handle> {
    check!(err);
    Handle::from_ptr(id).ok_or(CL_INVALID_VALUE)
}

#[inline]
fn raw_list (handles: &[Handle]) -> Vec<*mut c_void> {
    handles.iter().map(|x| x.as_ptr()).collect()
}

/// Wait-list arguments, with a null pointer for an empty list
#[inline]
fn wait_args (wait: &[*mut c_void]) -> NativeResult<(u32, *const *mut c_void)> {
    let len = u32::try_from(wait.len()).map_err(|_| CL_INVALID_EVENT_WAIT_LIST)?;
    Ok(match len {
        0 => (0, std::ptr::null()),
        len => (len, wait.as_ptr())
    })
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    U32,
    U64,
    Size,
    Bool,
    I32,
    Str,
    Ptr,
    Ptrs,
    Sizes,
}

/// Native parameter of a query, and how its value is laid out
fn native_param (kind: ObjectKind, param: InfoParam) -> NativeResult<(u32, Shape)> {
    use InfoParam as P;
    use ObjectKind as K;

    let v = match (kind, param) {
        (K::Device, P::ReferenceCount) => (sys::CL_DEVICE_REFERENCE_COUNT, Shape::U32),
        (K::Context, P::ReferenceCount) => (sys::CL_CONTEXT_REFERENCE_COUNT, Shape::U32),
        (K::CommandQueue, P::ReferenceCount) => (sys::CL_QUEUE_REFERENCE_COUNT, Shape::U32),
        (K::MemObject, P::ReferenceCount) => (sys::CL_MEM_REFERENCE_COUNT, Shape::U32),
        (K::Event, P::ReferenceCount) => (sys::CL_EVENT_REFERENCE_COUNT, Shape::U32),
        (K::Kernel, P::ReferenceCount) => (sys::CL_KERNEL_REFERENCE_COUNT, Shape::U32),

        (K::CommandQueue, P::Context) => (sys::CL_QUEUE_CONTEXT, Shape::Ptr),
        (K::MemObject, P::Context) => (sys::CL_MEM_CONTEXT, Shape::Ptr),
        (K::Event, P::Context) => (sys::CL_EVENT_CONTEXT, Shape::Ptr),
        (K::Kernel, P::Context) => (sys::CL_KERNEL_CONTEXT, Shape::Ptr),

        (K::Platform, P::PlatformName) => (sys::CL_PLATFORM_NAME, Shape::Str),
        (K::Platform, P::PlatformVendor) => (sys::CL_PLATFORM_VENDOR, Shape::Str),
        (K::Platform, P::PlatformVersion) => (sys::CL_PLATFORM_VERSION, Shape::Str),

        (K::Device, P::DeviceName) => (sys::CL_DEVICE_NAME, Shape::Str),
        (K::Device, P::DeviceVendor) => (sys::CL_DEVICE_VENDOR, Shape::Str),
        (K::Device, P::DeviceType) => (sys::CL_DEVICE_TYPE, Shape::U64),
        (K::Device, P::DevicePlatform) => (sys::CL_DEVICE_PLATFORM, Shape::Ptr),
        (K::Device, P::DeviceAvailable) => (sys::CL_DEVICE_AVAILABLE, Shape::Bool),
        (K::Device, P::DeviceMemBaseAddrAlign) => (sys::CL_DEVICE_MEM_BASE_ADDR_ALIGN, Shape::U32),
        (K::Device, P::DeviceMaxComputeUnits) => (sys::CL_DEVICE_MAX_COMPUTE_UNITS, Shape::U32),
        (K::Device, P::DeviceMaxWorkGroupSize) => (sys::CL_DEVICE_MAX_WORK_GROUP_SIZE, Shape::Size),
        (K::Device, P::DeviceMaxWorkItemSizes) => (sys::CL_DEVICE_MAX_WORK_ITEM_SIZES, Shape::Sizes),
        (K::Device, P::DeviceGlobalMemSize) => (sys::CL_DEVICE_GLOBAL_MEM_SIZE, Shape::U64),
        (K::Device, P::DeviceMaxMemAllocSize) => (sys::CL_DEVICE_MAX_MEM_ALLOC_SIZE, Shape::U64),
        (K::Device, P::DeviceQueueProperties) => (sys::CL_DEVICE_QUEUE_PROPERTIES, Shape::U64),

        (K::Context, P::ContextDevices) => (sys::CL_CONTEXT_DEVICES, Shape::Ptrs),
        (K::Context, P::ContextNumDevices) => (sys::CL_CONTEXT_NUM_DEVICES, Shape::U32),

        (K::CommandQueue, P::QueueDevice) => (sys::CL_QUEUE_DEVICE, Shape::Ptr),
        (K::CommandQueue, P::QueueProperties) => (sys::CL_QUEUE_PROPERTIES, Shape::U64),

        (K::MemObject, P::MemType) => (sys::CL_MEM_TYPE, Shape::U32),
        (K::MemObject, P::MemFlags) => (sys::CL_MEM_FLAGS, Shape::U64),
        (K::MemObject, P::MemSize) => (sys::CL_MEM_SIZE, Shape::Size),
        (K::MemObject, P::MemOffset) => (sys::CL_MEM_OFFSET, Shape::Size),
        (K::MemObject, P::MemAssociatedMemObject) => (sys::CL_MEM_ASSOCIATED_MEMOBJECT, Shape::Ptr),

        (K::Event, P::EventCommandQueue) => (sys::CL_EVENT_COMMAND_QUEUE, Shape::Ptr),
        (K::Event, P::EventCommandType) => (sys::CL_EVENT_COMMAND_TYPE, Shape::U32),
        (K::Event, P::EventCommandExecutionStatus) => (sys::CL_EVENT_COMMAND_EXECUTION_STATUS, Shape::I32),
        (K::Event, P::ProfilingQueued) => (sys::CL_PROFILING_COMMAND_QUEUED, Shape::U64),
        (K::Event, P::ProfilingSubmit) => (sys::CL_PROFILING_COMMAND_SUBMIT, Shape::U64),
        (K::Event, P::ProfilingStart) => (sys::CL_PROFILING_COMMAND_START, Shape::U64),
        (K::Event, P::ProfilingEnd) => (sys::CL_PROFILING_COMMAND_END, Shape::U64),

        (K::Kernel, P::KernelFunctionName) => (sys::CL_KERNEL_FUNCTION_NAME, Shape::Str),
        (K::Kernel, P::KernelNumArgs) => (sys::CL_KERNEL_NUM_ARGS, Shape::U32),

        _ => return Err(CL_INVALID_VALUE)
    };

    Ok(v)
}

#[inline]
fn is_profiling (param: InfoParam) -> bool {
    matches!(param, InfoParam::ProfilingQueued | InfoParam::ProfilingSubmit | InfoParam::ProfilingStart | InfoParam::ProfilingEnd)
}

unsafe fn info_call (kind: ObjectKind, handle: Handle, param: InfoParam, native: u32, size: usize, value: *mut c_void, size_ret: *mut usize) -> i32 {
    let h = handle.as_ptr();
    match kind {
        ObjectKind::Platform => sys::clGetPlatformInfo(h, native, size, value, size_ret),
        ObjectKind::Device => sys::clGetDeviceInfo(h, native, size, value, size_ret),
        ObjectKind::Context => sys::clGetContextInfo(h, native, size, value, size_ret),
        ObjectKind::CommandQueue => sys::clGetCommandQueueInfo(h, native, size, value, size_ret),
        ObjectKind::MemObject => sys::clGetMemObjectInfo(h, native, size, value, size_ret),
        ObjectKind::Event if is_profiling(param) => sys::clGetEventProfilingInfo(h, native, size, value, size_ret),
        ObjectKind::Event => sys::clGetEventInfo(h, native, size, value, size_ret),
        ObjectKind::Kernel => sys::clGetKernelInfo(h, native, size, value, size_ret),
    }
}

#[inline]
fn scalar<T: Pod> (bytes: &[u8]) -> NativeResult<T> {
    bytes.get(..size_of::<T>()).map(bytemuck::pod_read_unaligned).ok_or(CL_INVALID_VALUE)
}

fn decode (shape: Shape, bytes: &[u8]) -> NativeResult<InfoValue> {
    let v = match shape {
        Shape::U32 => InfoValue::Uint(u64::from(scalar::<u32>(bytes)?)),
        Shape::U64 => InfoValue::Uint(scalar::<u64>(bytes)?),
        Shape::Size => InfoValue::Uint(scalar::<usize>(bytes)? as u64),
        Shape::Bool => InfoValue::Bool(scalar::<u32>(bytes)? != 0),
        Shape::I32 => InfoValue::Int(i64::from(scalar::<i32>(bytes)?)),
        Shape::Str => InfoValue::String(String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()),
        Shape::Ptr => InfoValue::Handle(Handle::new(scalar::<usize>(bytes)?)),
        Shape::Ptrs => InfoValue::Handles(bytes.chunks_exact(size_of::<usize>()).filter_map(|x| Handle::new(bytemuck::pod_read_unaligned(x))).collect()),
        Shape::Sizes => InfoValue::Sizes(bytes.chunks_exact(size_of::<usize>()).map(bytemuck::pod_read_unaligned).collect()),
    };

    Ok(v)
}

unsafe extern "C" fn event_listener (event: sys::cl_event, status: sys::cl_int, user_data: *mut c_void) {
    let f = *Box::from_raw(user_data as *mut EventCallback);
    if let Some(event) = Handle::from_ptr(event) {
        if catch_unwind(AssertUnwindSafe(|| f(event, status))).is_err() {
            tracing::error!(event = event.as_usize(), "event callback panicked");
        }
    }
}

unsafe extern "C" fn destructor_listener (memobj: sys::cl_mem, user_data: *mut c_void) {
    let f = *Box::from_raw(user_data as *mut DestructorCallback);
    if let Some(memobj) = Handle::from_ptr(memobj) {
        if catch_unwind(AssertUnwindSafe(|| f(memobj))).is_err() {
            tracing::error!(handle = memobj.as_usize(), "destructor callback panicked");
        }
    }
}

impl OpenClBackend {
    #[inline]
    fn finish_enqueue (err: i32, event: sys::cl_event) -> NativeResult<Handle> {
        created(event, err)
    }
}

impl Backend for OpenClBackend {
    #[inline(always)]
    fn name (&self) -> &str {
        "opencl"
    }

    fn platforms (&self) -> NativeResult<Vec<Handle>> {
        unsafe {
            let mut len = 0;
            check!(sys::clGetPlatformIDs(0, std::ptr::null_mut(), addr_of_mut!(len)));

            let mut ids = vec![std::ptr::null_mut(); len as usize];
            check!(sys::clGetPlatformIDs(len, ids.as_mut_ptr(), std::ptr::null_mut()));
            Ok(ids.into_iter().filter_map(Handle::from_ptr).collect())
        }
    }

    fn devices (&self, platform: Handle, ty: DeviceType) -> NativeResult<Vec<Handle>> {
        unsafe {
            let mut len = 0;
            check!(sys::clGetDeviceIDs(platform.as_ptr(), ty.bits(), 0, std::ptr::null_mut(), addr_of_mut!(len)));

            let mut ids = vec![std::ptr::null_mut(); len as usize];
            check!(sys::clGetDeviceIDs(platform.as_ptr(), ty.bits(), len, ids.as_mut_ptr(), std::ptr::null_mut()));
            Ok(ids.into_iter().filter_map(Handle::from_ptr).collect())
        }
    }

    fn create_context (&self, props: &ContextProperties, devices: &[Handle]) -> NativeResult<Handle> {
        let props = props.to_bits();
        let props = props.as_ref().map_or(std::ptr::null(), |x| x.as_ptr());
        let devices = raw_list(devices);
        let len = u32::try_from(devices.len()).map_err(|_| CL_INVALID_VALUE)?;

        let mut err = 0;
        let id = unsafe { sys::clCreateContext(props, len, devices.as_ptr(), None, std::ptr::null_mut(), addr_of_mut!(err)) };
        created(id, err)
    }

    fn create_context_from_type (&self, props: &ContextProperties, ty: DeviceType) -> NativeResult<Handle> {
        let props = props.to_bits();
        let props = props.as_ref().map_or(std::ptr::null(), |x| x.as_ptr());

        let mut err = 0;
        let id = unsafe { sys::clCreateContextFromType(props, ty.bits(), None, std::ptr::null_mut(), addr_of_mut!(err)) };
        created(id, err)
    }

    #[allow(deprecated)]
    fn create_command_queue (&self, context: Handle, device: Handle, props: QueueProperties) -> NativeResult<Handle> {
        let mut err = 0;
        let id = unsafe { sys::clCreateCommandQueue(context.as_ptr(), device.as_ptr(), props.bits(), addr_of_mut!(err)) };
        created(id, err)
    }

    fn create_buffer (&self, context: Handle, flags: MemFlags, size: usize, init: Option<&[u8]>) -> NativeResult<Handle> {
        // the driver would keep using the host pointer past this call
        if flags.host.is_use() {
            return Err(CL_INVALID_VALUE)
        }

        let host_ptr = match init {
            Some(x) if x.len() != size => return Err(CL_INVALID_HOST_PTR),
            Some(x) => x.as_ptr() as *mut c_void,
            None => std::ptr::null_mut()
        };

        let mut err = 0;
        let id = unsafe { sys::clCreateBuffer(context.as_ptr(), flags.to_bits(), size, host_ptr, addr_of_mut!(err)) };
        created(id, err)
    }

    fn create_sub_buffer (&self, buffer: Handle, access: MemAccess, origin: usize, size: usize) -> NativeResult<Handle> {
        let region = sys::cl_buffer_region { origin, size };

        let mut err = 0;
        let id = unsafe {
            sys::clCreateSubBuffer(buffer.as_ptr(), access.to_bits(), sys::CL_BUFFER_CREATE_TYPE_REGION, addr_of!(region).cast(), addr_of_mut!(err))
        };
        created(id, err)
    }

    fn retain (&self, kind: ObjectKind, handle: Handle) -> NativeResult<()> {
        let h = handle.as_ptr();
        unsafe {
            check!(match kind {
                ObjectKind::Platform => sys::CL_SUCCESS,
                ObjectKind::Device => sys::clRetainDevice(h),
                ObjectKind::Context => sys::clRetainContext(h),
                ObjectKind::CommandQueue => sys::clRetainCommandQueue(h),
                ObjectKind::MemObject => sys::clRetainMemObject(h),
                ObjectKind::Event => sys::clRetainEvent(h),
                ObjectKind::Kernel => sys::clRetainKernel(h),
            });
        }
        Ok(())
    }

    fn release (&self, kind: ObjectKind, handle: Handle) -> NativeResult<()> {
        let h = handle.as_ptr();
        unsafe {
            check!(match kind {
                ObjectKind::Platform => sys::CL_SUCCESS,
                ObjectKind::Device => sys::clReleaseDevice(h),
                ObjectKind::Context => sys::clReleaseContext(h),
                ObjectKind::CommandQueue => sys::clReleaseCommandQueue(h),
                ObjectKind::MemObject => sys::clReleaseMemObject(h),
                ObjectKind::Event => sys::clReleaseEvent(h),
                ObjectKind::Kernel => sys::clReleaseKernel(h),
            });
        }
        Ok(())
    }

    fn get_info (&self, kind: ObjectKind, handle: Handle, param: InfoParam) -> NativeResult<InfoValue> {
        let (native, shape) = native_param(kind, param)?;

        let bytes = unsafe {
            let mut len = 0;
            check!(info_call(kind, handle, param, native, 0, std::ptr::null_mut(), addr_of_mut!(len)));

            let mut bytes = vec![0u8; len];
            check!(info_call(kind, handle, param, native, len, bytes.as_mut_ptr().cast(), std::ptr::null_mut()));
            bytes
        };

        decode(shape, &bytes)
    }

    fn set_kernel_arg (&self, kernel: Handle, idx: u32, arg: KernelArg<'_>) -> NativeResult<()> {
        let mem;
        let (size, value) = match arg {
            KernelArg::Mem(x) => {
                mem = x.as_ptr();
                (size_of::<sys::cl_mem>(), addr_of!(mem).cast::<c_void>())
            },
            KernelArg::Bytes(x) => (x.len(), x.as_ptr().cast()),
            KernelArg::Local(x) => (x, std::ptr::null())
        };

        unsafe { check!(sys::clSetKernelArg(kernel.as_ptr(), idx, size, value)) }
        Ok(())
    }

    unsafe fn enqueue_read_buffer (&self, queue: Handle, buffer: Handle, blocking: bool, offset: usize, size: usize, dst: *mut u8, wait: &[Handle]) -> NativeResult<Handle> {
        let wait = raw_list(wait);
        let (len, list) = wait_args(&wait)?;

        let mut event = std::ptr::null_mut();
        let err = sys::clEnqueueReadBuffer(queue.as_ptr(), buffer.as_ptr(), sys::cl_bool::from(blocking), offset, size, dst.cast(), len, list, addr_of_mut!(event));
        Self::finish_enqueue(err, event)
    }

    unsafe fn enqueue_write_buffer (&self, queue: Handle, buffer: Handle, blocking: bool, offset: usize, size: usize, src: *const u8, wait: &[Handle]) -> NativeResult<Handle> {
        let wait = raw_list(wait);
        let (len, list) = wait_args(&wait)?;

        let mut event = std::ptr::null_mut();
        let err = sys::clEnqueueWriteBuffer(queue.as_ptr(), buffer.as_ptr(), sys::cl_bool::from(blocking), offset, size, src.cast(), len, list, addr_of_mut!(event));
        Self::finish_enqueue(err, event)
    }

    fn enqueue_copy_buffer (&self, queue: Handle, src: Handle, dst: Handle, src_offset: usize, dst_offset: usize, size: usize, wait: &[Handle]) -> NativeResult<Handle> {
        let wait = raw_list(wait);
        let (len, list) = wait_args(&wait)?;

        let mut event = std::ptr::null_mut();
        let err = unsafe {
            sys::clEnqueueCopyBuffer(queue.as_ptr(), src.as_ptr(), dst.as_ptr(), src_offset, dst_offset, size, len, list, addr_of_mut!(event))
        };
        Self::finish_enqueue(err, event)
    }

    unsafe fn enqueue_read_buffer_rect (&self, queue: Handle, buffer: Handle, blocking: bool, rect: &BufferRect, dst: *mut u8, wait: &[Handle]) -> NativeResult<Handle> {
        let wait = raw_list(wait);
        let (len, list) = wait_args(&wait)?;

        let mut event = std::ptr::null_mut();
        let err = sys::clEnqueueReadBufferRect(
            queue.as_ptr(), buffer.as_ptr(), sys::cl_bool::from(blocking),
            rect.buffer_origin.as_ptr(), rect.host_origin.as_ptr(), rect.region.as_ptr(),
            rect.buffer_row_pitch, rect.buffer_slice_pitch, rect.host_row_pitch, rect.host_slice_pitch,
            dst.cast(), len, list, addr_of_mut!(event)
        );
        Self::finish_enqueue(err, event)
    }

    unsafe fn enqueue_write_buffer_rect (&self, queue: Handle, buffer: Handle, blocking: bool, rect: &BufferRect, src: *const u8, wait: &[Handle]) -> NativeResult<Handle> {
        let wait = raw_list(wait);
        let (len, list) = wait_args(&wait)?;

        let mut event = std::ptr::null_mut();
        let err = sys::clEnqueueWriteBufferRect(
            queue.as_ptr(), buffer.as_ptr(), sys::cl_bool::from(blocking),
            rect.buffer_origin.as_ptr(), rect.host_origin.as_ptr(), rect.region.as_ptr(),
            rect.buffer_row_pitch, rect.buffer_slice_pitch, rect.host_row_pitch, rect.host_slice_pitch,
            src.cast(), len, list, addr_of_mut!(event)
        );
        Self::finish_enqueue(err, event)
    }

    fn enqueue_copy_buffer_rect (&self, queue: Handle, src: Handle, dst: Handle, rect: &RectCopy, wait: &[Handle]) -> NativeResult<Handle> {
        let wait = raw_list(wait);
        let (len, list) = wait_args(&wait)?;

        let mut event = std::ptr::null_mut();
        let err = unsafe {
            sys::clEnqueueCopyBufferRect(
                queue.as_ptr(), src.as_ptr(), dst.as_ptr(),
                rect.src_origin.as_ptr(), rect.dst_origin.as_ptr(), rect.region.as_ptr(),
                rect.src_row_pitch, rect.src_slice_pitch, rect.dst_row_pitch, rect.dst_slice_pitch,
                len, list, addr_of_mut!(event)
            )
        };
        Self::finish_enqueue(err, event)
    }

    fn enqueue_nd_range_kernel (&self, queue: Handle, kernel: Handle, work_dim: u32, offset: Option<&[usize]>, global: &[usize], local: Option<&[usize]>, wait: &[Handle]) -> NativeResult<Handle> {
        let dims = work_dim as usize;
        if global.len() != dims || offset.map_or(false, |x| x.len() != dims) || local.map_or(false, |x| x.len() != dims) {
            return Err(CL_INVALID_WORK_DIMENSION)
        }

        let wait = raw_list(wait);
        let (len, list) = wait_args(&wait)?;
        let offset = offset.map_or(std::ptr::null(), <[usize]>::as_ptr);
        let local = local.map_or(std::ptr::null(), <[usize]>::as_ptr);

        let mut event = std::ptr::null_mut();
        let err = unsafe {
            sys::clEnqueueNDRangeKernel(queue.as_ptr(), kernel.as_ptr(), work_dim, offset, global.as_ptr(), local, len, list, addr_of_mut!(event))
        };
        Self::finish_enqueue(err, event)
    }

    fn enqueue_marker (&self, queue: Handle, wait: &[Handle]) -> NativeResult<Handle> {
        let wait = raw_list(wait);
        let (len, list) = wait_args(&wait)?;

        let mut event = std::ptr::null_mut();
        let err = unsafe { sys::clEnqueueMarkerWithWaitList(queue.as_ptr(), len, list, addr_of_mut!(event)) };
        Self::finish_enqueue(err, event)
    }

    fn flush (&self, queue: Handle) -> NativeResult<()> {
        unsafe { check!(sys::clFlush(queue.as_ptr())) }
        Ok(())
    }

    fn finish (&self, queue: Handle) -> NativeResult<()> {
        unsafe { check!(sys::clFinish(queue.as_ptr())) }
        Ok(())
    }

    fn wait_for_events (&self, events: &[Handle]) -> NativeResult<()> {
        let events = raw_list(events);
        let len = u32::try_from(events.len()).map_err(|_| CL_INVALID_VALUE)?;
        unsafe { check!(sys::clWaitForEvents(len, events.as_ptr())) }
        Ok(())
    }

    fn set_event_callback (&self, event: Handle, callback: Option<EventCallback>) -> NativeResult<()> {
        let f = callback.ok_or(CL_INVALID_VALUE)?;
        let data = Box::into_raw(Box::new(f));

        unsafe {
            let err = sys::clSetEventCallback(event.as_ptr(), sys::CL_COMPLETE, Some(event_listener), data.cast());
            if err != sys::CL_SUCCESS {
                drop(Box::from_raw(data));
                return Err(err)
            }
        }
        Ok(())
    }

    fn set_destructor_callback (&self, mem: Handle, callback: Option<DestructorCallback>) -> NativeResult<()> {
        let f = callback.ok_or(CL_INVALID_VALUE)?;
        let data = Box::into_raw(Box::new(f));

        unsafe {
            let err = sys::clSetMemObjectDestructorCallback(mem.as_ptr(), Some(destructor_listener), data.cast());
            if err != sys::CL_SUCCESS {
                drop(Box::from_raw(data));
                return Err(err)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_values_decode() {
        assert_eq!(decode(Shape::U32, &7u32.to_ne_bytes()), Ok(InfoValue::Uint(7)));
        assert_eq!(decode(Shape::I32, &(-14i32).to_ne_bytes()), Ok(InfoValue::Int(-14)));
        assert_eq!(decode(Shape::Bool, &1u32.to_ne_bytes()), Ok(InfoValue::Bool(true)));
        assert_eq!(decode(Shape::Str, b"gpu\0"), Ok(InfoValue::String("gpu".to_string())));
        assert_eq!(decode(Shape::Ptr, &0usize.to_ne_bytes()), Ok(InfoValue::Handle(None)));
        assert_eq!(decode(Shape::U64, &[0u8; 2]), Err(CL_INVALID_VALUE));

        let sizes = [4usize, 8, 16].iter().flat_map(|x| x.to_ne_bytes()).collect::<Vec<_>>();
        assert_eq!(decode(Shape::Sizes, &sizes), Ok(InfoValue::Sizes(vec![4, 8, 16])));
    }

    #[test]
    fn unknown_params_are_invalid() {
        assert!(native_param(ObjectKind::Platform, InfoParam::ReferenceCount).is_err());
        assert!(native_param(ObjectKind::Kernel, InfoParam::MemSize).is_err());
        assert!(matches!(native_param(ObjectKind::Event, InfoParam::ProfilingEnd), Ok((_, Shape::U64))));
    }
}
