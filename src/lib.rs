#![allow(clippy::needless_return)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

macro_rules! flat_mod {
    ($($i:ident),+) => {
        $(
            mod $i;
            pub use $i::*;
        )+
    };
}

/// Evaluates a backend call, returning early with the interpreted [`Error`](crate::core::Error) if the
/// backend reported a native error code.
macro_rules! tri {
    ($op:expr, $e:expr) => {{
        match $e {
            Ok(x) => x,
            Err(code) => return Err($crate::core::Error::from_code(code, $op)),
        }
    }};
}

macro_rules! docfg {
    ($meta:meta, $($item:item)+) => {
        $(
            #[cfg_attr(docsrs, doc(cfg($meta)))]
            #[cfg($meta)]
            $item
        )+
    };
}

pub mod prelude {
    pub use crate::buffer::{BufferRect, MemAccess, MemFlags, RawBuffer, RectCopy};
    pub use crate::context::{Context, ContextProperties, RawContext, SimpleContext};
    pub use crate::core::*;
    pub use crate::event::{CommandType, Event, EventStatus, RawEvent, WaitList};
    pub use crate::host::{HostBackend, HostConfig, HostDeviceConfig, HostKernel, KernelArgs, WorkItem};
    pub use crate::memobj::RawMemObject;
}

/// Memory buffers and their typed transfer events
pub mod buffer;
/// Contexts, the allocation domain of queues, memory objects and kernels
pub mod context;
/// Native handles, the backend contract, errors, devices, queues and kernels
pub mod core;
/// Completion events and wait-lists
pub mod event;
/// In-process software backend
pub mod host;
/// Generic memory object
pub mod memobj;

docfg! {
    feature = "opencl",
    /// Native OpenCL backend
    pub mod opencl;
}
