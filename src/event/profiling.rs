use std::time::Duration;
use crate::core::*;
use super::RawEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProfilingInfo<T> {
    /// Device time counter in nanoseconds when the command identified by event is enqueued in a command-queue by the host.
    pub queued: T,
    /// Device time counter in nanoseconds when the command identified by event that has been enqueued is submitted by the host to the device associated with the command-queue.
    pub submit: T,
    /// Device time counter in nanoseconds when the command identified by event starts execution on the device.
    pub start: T,
    /// Device time counter in nanoseconds when the command identified by event has finished execution on the device.
    pub end: T,
}

impl ProfilingInfo<u64> {
    #[inline]
    pub fn new (event: &RawEvent) -> Result<Self> {
        let queued = event.info_as(InfoParam::ProfilingQueued)?;
        let submit = event.info_as(InfoParam::ProfilingSubmit)?;
        let start = event.info_as(InfoParam::ProfilingStart)?;
        let end = event.info_as(InfoParam::ProfilingEnd)?;
        Ok(Self { queued, submit, start, end })
    }

    /// Time elapsed between [`ProfilingInfo::start`] and [`ProfilingInfo::end`]
    #[inline(always)]
    pub fn duration (&self) -> Duration {
        Duration::from_nanos(self.end.saturating_sub(self.start))
    }
}
