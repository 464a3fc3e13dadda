use super::ErrorCode;

pub const CL_SUCCESS: i32 = 0;

// execution status
pub const CL_COMPLETE: i32 = 0x0;
pub const CL_RUNNING: i32 = 0x1;
pub const CL_SUBMITTED: i32 = 0x2;
pub const CL_QUEUED: i32 = 0x3;

// command types
pub const CL_COMMAND_NDRANGE_KERNEL: u32 = 0x11F0;
pub const CL_COMMAND_READ_BUFFER: u32 = 0x11F3;
pub const CL_COMMAND_WRITE_BUFFER: u32 = 0x11F4;
pub const CL_COMMAND_COPY_BUFFER: u32 = 0x11F5;
pub const CL_COMMAND_MARKER: u32 = 0x11FE;
pub const CL_COMMAND_READ_BUFFER_RECT: u32 = 0x1201;
pub const CL_COMMAND_WRITE_BUFFER_RECT: u32 = 0x1202;
pub const CL_COMMAND_COPY_BUFFER_RECT: u32 = 0x1203;

// memory object types
pub const CL_MEM_OBJECT_BUFFER: u32 = 0x10F0;

macro_rules! error_codes {
    ($($name:ident = $variant:ident),+ $(,)?) => {
        $(
            pub const $name: i32 = ErrorCode::$variant as i32;
        )+
    };
}

error_codes! {
    CL_DEVICE_NOT_FOUND = DeviceNotFound,
    CL_DEVICE_NOT_AVAILABLE = DeviceNotAvailable,
    CL_COMPILER_NOT_AVAILABLE = CompilerNotAvailable,
    CL_MEM_OBJECT_ALLOCATION_FAILURE = MemObjectAllocationFailure,
    CL_OUT_OF_RESOURCES = OutOfResources,
    CL_OUT_OF_HOST_MEMORY = OutOfHostMemory,
    CL_PROFILING_INFO_NOT_AVAILABLE = ProfilingInfoNotAvailable,
    CL_MEM_COPY_OVERLAP = MemCopyOverlap,
    CL_BUILD_PROGRAM_FAILURE = BuildProgramFailure,
    CL_MISALIGNED_SUB_BUFFER_OFFSET = MisalignedSubBufferOffset,
    CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST = ExecStatusErrorForEventsInWaitList,
    CL_INVALID_VALUE = InvalidValue,
    CL_INVALID_DEVICE_TYPE = InvalidDeviceType,
    CL_INVALID_PLATFORM = InvalidPlatform,
    CL_INVALID_DEVICE = InvalidDevice,
    CL_INVALID_CONTEXT = InvalidContext,
    CL_INVALID_QUEUE_PROPERTIES = InvalidQueueProperties,
    CL_INVALID_COMMAND_QUEUE = InvalidCommandQueue,
    CL_INVALID_HOST_PTR = InvalidHostPtr,
    CL_INVALID_MEM_OBJECT = InvalidMemObject,
    CL_INVALID_PROGRAM = InvalidProgram,
    CL_INVALID_PROGRAM_EXECUTABLE = InvalidProgramExecutable,
    CL_INVALID_KERNEL_NAME = InvalidKernelName,
    CL_INVALID_KERNEL = InvalidKernel,
    CL_INVALID_ARG_INDEX = InvalidArgIndex,
    CL_INVALID_ARG_VALUE = InvalidArgValue,
    CL_INVALID_ARG_SIZE = InvalidArgSize,
    CL_INVALID_KERNEL_ARGS = InvalidKernelArgs,
    CL_INVALID_WORK_DIMENSION = InvalidWorkDimension,
    CL_INVALID_WORK_GROUP_SIZE = InvalidWorkGroupSize,
    CL_INVALID_WORK_ITEM_SIZE = InvalidWorkItemSize,
    CL_INVALID_GLOBAL_OFFSET = InvalidGlobalOffset,
    CL_INVALID_EVENT_WAIT_LIST = InvalidEventWaitList,
    CL_INVALID_EVENT = InvalidEvent,
    CL_INVALID_OPERATION = InvalidOperation,
    CL_INVALID_BUFFER_SIZE = InvalidBufferSize,
    CL_INVALID_GLOBAL_WORK_SIZE = InvalidGlobalWorkSize,
    CL_INVALID_PROPERTY = InvalidProperty,
}
