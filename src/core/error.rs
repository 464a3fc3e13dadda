use std::fmt::{Debug, Display};
#[cfg(debug_assertions)]
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    sync::Arc,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub type Result<T> = ::core::result::Result<T, Error>;

/// Error returned by every fallible operation of the crate.
///
/// An error always carries the native result code that caused it, the [`Operation`] that produced
/// it, and the [`ErrorKind`] that the pair was interpreted as.
#[derive(Clone)]
#[non_exhaustive]
pub struct Error {
    pub kind: ErrorKind,
    pub code: i32,
    pub op: Operation,
    pub desc: Option<String>,
    #[cfg(debug_assertions)]
    pub backtrace: Arc<Backtrace>,
}

impl Error {
    /// Creates a new error from a known code, with a description.
    #[inline]
    pub fn new(code: ErrorCode, op: Operation, desc: impl ToString) -> Self {
        let mut this = Self::from_code(code.into(), op);
        this.desc = Some(desc.to_string());
        this
    }

    /// Interprets a native result code returned by `op`.
    pub fn from_code(code: i32, op: Operation) -> Self {
        let kind = op.classify(code);
        if kind == ErrorKind::Unrecognized {
            tracing::debug!(code, ?op, "unrecognized native result code");
        }

        Self {
            kind,
            code,
            op,
            desc: None,
            #[cfg(debug_assertions)]
            backtrace: Arc::new(Backtrace::capture()),
        }
    }

    #[inline(always)]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the known native code of this error, or `None` if the raw code isn't recognized.
    #[inline(always)]
    pub fn code(&self) -> Option<ErrorCode> {
        ErrorCode::try_from(self.code).ok()
    }

    #[inline(always)]
    pub fn raw_code(&self) -> i32 {
        self.code
    }

    #[inline(always)]
    pub fn operation(&self) -> Operation {
        self.op
    }
}

impl Debug for Error {
    #[inline(always)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{:?} ({code:?}) during {:?}", self.kind, self.op)?,
            None => write!(f, "{:?} (code {}) during {:?}", self.kind, self.code, self.op)?,
        }

        if let Some(ref desc) = self.desc {
            write!(f, ": {desc}")?;
        }

        #[cfg(debug_assertions)]
        if self.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\n{}", self.backtrace)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

/// Classification of a native result code, relative to the operation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A command-queue, context, memory object, event or kernel reference is not (or no longer) valid.
    InvalidHandle,
    /// An argument violates a documented bound: offsets, sizes, alignment, work dimensions, ...
    InvalidValue,
    /// Operands were drawn from different contexts.
    ContextMismatch,
    /// The backend couldn't allocate device or host storage for a memory object.
    AllocationFailure,
    /// The backend ran out of resources or host memory.
    ResourceExhaustion,
    /// An event in the wait-list completed in error.
    DependencyFailure,
    /// The requested device or information isn't available.
    Unavailable,
    /// The backend returned a code with no mapping for the operation.
    Unrecognized,
}

/// Known native result codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum ErrorCode {
    DeviceNotFound = -1,
    DeviceNotAvailable = -2,
    CompilerNotAvailable = -3,
    MemObjectAllocationFailure = -4,
    OutOfResources = -5,
    OutOfHostMemory = -6,
    ProfilingInfoNotAvailable = -7,
    MemCopyOverlap = -8,
    BuildProgramFailure = -11,
    MisalignedSubBufferOffset = -13,
    ExecStatusErrorForEventsInWaitList = -14,
    InvalidValue = -30,
    InvalidDeviceType = -31,
    InvalidPlatform = -32,
    InvalidDevice = -33,
    InvalidContext = -34,
    InvalidQueueProperties = -35,
    InvalidCommandQueue = -36,
    InvalidHostPtr = -37,
    InvalidMemObject = -38,
    InvalidProgram = -44,
    InvalidProgramExecutable = -45,
    InvalidKernelName = -46,
    InvalidKernel = -48,
    InvalidArgIndex = -49,
    InvalidArgValue = -50,
    InvalidArgSize = -51,
    InvalidKernelArgs = -52,
    InvalidWorkDimension = -53,
    InvalidWorkGroupSize = -54,
    InvalidWorkItemSize = -55,
    InvalidGlobalOffset = -56,
    InvalidEventWaitList = -57,
    InvalidEvent = -58,
    InvalidOperation = -59,
    InvalidBufferSize = -61,
    InvalidGlobalWorkSize = -63,
    InvalidProperty = -64,
}

/// Backend call that produced a native result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Operation {
    Enumerate,
    Retain,
    Release,
    GetInfo,
    CreateContext,
    CreateCommandQueue,
    CreateBuffer,
    CreateSubBuffer,
    CreateKernel,
    SetKernelArg,
    EnqueueReadBuffer,
    EnqueueWriteBuffer,
    EnqueueCopyBuffer,
    EnqueueReadBufferRect,
    EnqueueWriteBufferRect,
    EnqueueCopyBufferRect,
    EnqueueKernel,
    EnqueueMarker,
    Flush,
    Finish,
    WaitForEvents,
    SetEventCallback,
    SetDestructorCallback,
    /// Execution status of an asynchronous command, as reported through its event.
    Execution,
}

type Table = &'static [(ErrorCode, ErrorKind)];

use ErrorCode as C;
use ErrorKind as K;

const RESOURCES: Table = &[
    (C::OutOfResources, K::ResourceExhaustion),
    (C::OutOfHostMemory, K::ResourceExhaustion),
];

const HANDLES: Table = &[
    (C::InvalidPlatform, K::InvalidHandle),
    (C::InvalidDevice, K::InvalidHandle),
    (C::InvalidContext, K::InvalidHandle),
    (C::InvalidCommandQueue, K::InvalidHandle),
    (C::InvalidMemObject, K::InvalidHandle),
    (C::InvalidEvent, K::InvalidHandle),
    (C::InvalidKernel, K::InvalidHandle),
];

const ENUMERATE: Table = &[
    (C::InvalidPlatform, K::InvalidHandle),
    (C::InvalidDeviceType, K::InvalidValue),
    (C::InvalidValue, K::InvalidValue),
    (C::DeviceNotFound, K::Unavailable),
];

const GET_INFO: Table = &[
    (C::InvalidValue, K::InvalidValue),
    (C::ProfilingInfoNotAvailable, K::Unavailable),
];

const CREATE_CONTEXT: Table = &[
    (C::InvalidPlatform, K::InvalidHandle),
    (C::InvalidDevice, K::InvalidHandle),
    (C::InvalidValue, K::InvalidValue),
    (C::InvalidProperty, K::InvalidValue),
    (C::InvalidDeviceType, K::InvalidValue),
    (C::DeviceNotAvailable, K::Unavailable),
    (C::DeviceNotFound, K::Unavailable),
];

const CREATE_QUEUE: Table = &[
    (C::InvalidContext, K::InvalidHandle),
    (C::InvalidDevice, K::ContextMismatch),
    (C::InvalidValue, K::InvalidValue),
    (C::InvalidQueueProperties, K::InvalidValue),
];

const CREATE_BUFFER: Table = &[
    (C::InvalidContext, K::InvalidHandle),
    (C::InvalidValue, K::InvalidValue),
    (C::InvalidBufferSize, K::InvalidValue),
    (C::InvalidHostPtr, K::InvalidValue),
    (C::MemObjectAllocationFailure, K::AllocationFailure),
];

const CREATE_SUB_BUFFER: Table = &[
    (C::InvalidMemObject, K::InvalidHandle),
    (C::InvalidValue, K::InvalidValue),
    (C::InvalidBufferSize, K::InvalidValue),
    (C::MisalignedSubBufferOffset, K::InvalidValue),
    (C::MemObjectAllocationFailure, K::AllocationFailure),
];

const CREATE_KERNEL: Table = &[
    (C::InvalidContext, K::InvalidHandle),
    (C::InvalidDevice, K::ContextMismatch),
    (C::InvalidValue, K::InvalidValue),
    (C::InvalidProgram, K::InvalidValue),
    (C::InvalidProgramExecutable, K::InvalidValue),
    (C::InvalidKernelName, K::InvalidValue),
    (C::BuildProgramFailure, K::InvalidValue),
    (C::CompilerNotAvailable, K::Unavailable),
];

const SET_KERNEL_ARG: Table = &[
    (C::InvalidKernel, K::InvalidHandle),
    (C::InvalidMemObject, K::InvalidHandle),
    (C::InvalidArgIndex, K::InvalidValue),
    (C::InvalidArgValue, K::InvalidValue),
    (C::InvalidArgSize, K::InvalidValue),
];

const ENQUEUE: Table = &[
    (C::InvalidCommandQueue, K::InvalidHandle),
    (C::InvalidMemObject, K::InvalidHandle),
    (C::InvalidEventWaitList, K::InvalidHandle),
    (C::InvalidContext, K::ContextMismatch),
    (C::InvalidValue, K::InvalidValue),
    (C::InvalidOperation, K::InvalidValue),
    (C::ExecStatusErrorForEventsInWaitList, K::DependencyFailure),
    (C::MemObjectAllocationFailure, K::AllocationFailure),
];

const ENQUEUE_TRANSFER: Table = &[(C::MisalignedSubBufferOffset, K::InvalidValue)];

const ENQUEUE_COPY: Table = &[
    (C::MisalignedSubBufferOffset, K::InvalidValue),
    (C::MemCopyOverlap, K::InvalidValue),
];

const ENQUEUE_KERNEL: Table = &[
    (C::InvalidKernel, K::InvalidHandle),
    (C::InvalidKernelArgs, K::InvalidValue),
    (C::InvalidWorkDimension, K::InvalidValue),
    (C::InvalidWorkGroupSize, K::InvalidValue),
    (C::InvalidWorkItemSize, K::InvalidValue),
    (C::InvalidGlobalOffset, K::InvalidValue),
    (C::InvalidGlobalWorkSize, K::InvalidValue),
    (C::InvalidProgramExecutable, K::InvalidValue),
    (C::MisalignedSubBufferOffset, K::InvalidValue),
];

const QUEUE_SYNC: Table = &[(C::InvalidCommandQueue, K::InvalidHandle)];

const WAIT: Table = &[
    (C::InvalidEvent, K::InvalidHandle),
    (C::InvalidValue, K::InvalidValue),
    (C::InvalidContext, K::ContextMismatch),
    (C::ExecStatusErrorForEventsInWaitList, K::DependencyFailure),
];

const EVENT_CALLBACK: Table = &[
    (C::InvalidEvent, K::InvalidHandle),
    (C::InvalidValue, K::InvalidValue),
];

const DESTRUCTOR_CALLBACK: Table = &[
    (C::InvalidMemObject, K::InvalidHandle),
    (C::InvalidValue, K::InvalidValue),
];

const EXECUTION: Table = &[
    (C::ExecStatusErrorForEventsInWaitList, K::DependencyFailure),
    (C::MemObjectAllocationFailure, K::AllocationFailure),
    (C::InvalidValue, K::InvalidValue),
    (C::InvalidOperation, K::InvalidValue),
];

impl Operation {
    /// Association lists consulted, in order, to interpret a code produced by this operation.
    pub fn tables(self) -> &'static [Table] {
        match self {
            Self::Enumerate => &[ENUMERATE, RESOURCES],
            Self::Retain | Self::Release => &[HANDLES, RESOURCES],
            Self::GetInfo => &[HANDLES, GET_INFO, RESOURCES],
            Self::CreateContext => &[CREATE_CONTEXT, RESOURCES],
            Self::CreateCommandQueue => &[CREATE_QUEUE, RESOURCES],
            Self::CreateBuffer => &[CREATE_BUFFER, RESOURCES],
            Self::CreateSubBuffer => &[CREATE_SUB_BUFFER, RESOURCES],
            Self::CreateKernel => &[CREATE_KERNEL, RESOURCES],
            Self::SetKernelArg => &[SET_KERNEL_ARG, RESOURCES],
            Self::EnqueueReadBuffer
            | Self::EnqueueWriteBuffer
            | Self::EnqueueReadBufferRect
            | Self::EnqueueWriteBufferRect => &[ENQUEUE, ENQUEUE_TRANSFER, RESOURCES],
            Self::EnqueueCopyBuffer | Self::EnqueueCopyBufferRect => &[ENQUEUE, ENQUEUE_COPY, RESOURCES],
            Self::EnqueueKernel => &[ENQUEUE, ENQUEUE_KERNEL, RESOURCES],
            Self::EnqueueMarker => &[ENQUEUE, RESOURCES],
            Self::Flush | Self::Finish => &[QUEUE_SYNC, RESOURCES],
            Self::WaitForEvents => &[WAIT, RESOURCES],
            Self::SetEventCallback => &[EVENT_CALLBACK, RESOURCES],
            Self::SetDestructorCallback => &[DESTRUCTOR_CALLBACK, RESOURCES],
            Self::Execution => &[EXECUTION, RESOURCES],
        }
    }

    /// Maps a native result code produced by this operation to exactly one [`ErrorKind`].
    pub fn classify(self, code: i32) -> ErrorKind {
        let code = match ErrorCode::try_from(code) {
            Ok(code) => code,
            Err(_) => return ErrorKind::Unrecognized,
        };

        self.tables()
            .iter()
            .flat_map(|table| table.iter())
            .find(|(c, _)| *c == code)
            .map_or(ErrorKind::Unrecognized, |(_, kind)| *kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_code_depends_on_operation() {
        let code = i32::from(ErrorCode::InvalidContext);
        assert_eq!(Operation::CreateCommandQueue.classify(code), ErrorKind::InvalidHandle);
        assert_eq!(Operation::EnqueueReadBuffer.classify(code), ErrorKind::ContextMismatch);
        assert_eq!(Operation::WaitForEvents.classify(code), ErrorKind::ContextMismatch);
    }

    #[test]
    fn unknown_codes_are_kept() {
        let err = Error::from_code(-9999, Operation::EnqueueKernel);
        assert_eq!(err.kind(), ErrorKind::Unrecognized);
        assert_eq!(err.raw_code(), -9999);
        assert_eq!(err.code(), None);
    }

    #[test]
    fn known_code_outside_operation_is_unrecognized() {
        let code = i32::from(ErrorCode::MemCopyOverlap);
        assert_eq!(Operation::EnqueueCopyBuffer.classify(code), ErrorKind::InvalidValue);
        assert_eq!(Operation::Flush.classify(code), ErrorKind::Unrecognized);
    }

    #[test]
    fn every_table_entry_is_reachable() {
        for op in [Operation::Retain, Operation::EnqueueKernel, Operation::CreateBuffer] {
            for table in op.tables() {
                for (code, kind) in table.iter() {
                    assert_eq!(op.classify((*code).into()), *kind, "{op:?} {code:?}");
                }
            }
        }
    }

    #[test]
    fn display_mentions_description() {
        let err = Error::new(ErrorCode::InvalidValue, Operation::EnqueueReadBuffer, "out of bounds");
        let msg = err.to_string();
        assert!(msg.starts_with("InvalidValue (InvalidValue) during EnqueueReadBuffer: out of bounds"));
    }
}
