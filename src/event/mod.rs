use num_enum::{IntoPrimitive, TryFromPrimitive};
use crate::core::*;

flat_mod!(status, raw, list, profiling);

docfg! {
    feature = "futures",
    mod wait;
}

#[cfg(feature = "futures")]
pub use wait::*;

/// An event that yields a value once its command completes.\
/// [`Event`] is designed to be able to safely return a value after the underlying [`RawEvent`] has completed
pub trait Event {
    type Output;

    /// Returns a reference to the underlying [`RawEvent`]
    fn as_raw (&self) -> &RawEvent;

    /// Returns the data associated with the event, with the assumption that it has completed successfully.
    fn consume (self) -> Self::Output;

    /// Blocks the current thread until the event has completed, returning `Ok(data)` if it completed correctly, and `Err(e)` otherwise.
    #[inline(always)]
    fn wait (self) -> Result<Self::Output> where Self: Sized {
        self.as_raw().wait_by_ref()?;
        Ok(self.consume())
    }

    /// Returns a future that waits for the event to complete without blocking.
    #[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
    #[cfg(feature = "futures")]
    #[inline(always)]
    fn wait_async (self) -> Result<EventWait<Self>> where Self: Sized + Unpin {
        EventWait::new(self)
    }

    /// Returns the event's type
    #[inline(always)]
    fn command_type (&self) -> Result<CommandType> {
        self.as_raw().command_type()
    }

    /// Returns the event's current status
    #[inline(always)]
    fn status (&self) -> Result<EventStatus> {
        self.as_raw().status()
    }
}

/// Type of command an event is associated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum CommandType {
    NdRangeKernel = 0x11F0,
    ReadBuffer = 0x11F3,
    WriteBuffer = 0x11F4,
    CopyBuffer = 0x11F5,
    Marker = 0x11FE,
    ReadBufferRect = 0x1201,
    WriteBufferRect = 0x1202,
    CopyBufferRect = 0x1203,
}
