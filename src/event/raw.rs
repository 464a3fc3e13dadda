use std::time::Duration;
use crate::{context::RawContext, core::{*, codes::*}};
use super::{CommandType, EventStatus, ProfilingInfo, WaitList};

raw_object! {
    /// Owned reference to an event, signalling the completion of one enqueued command.
    ///
    /// Events can't be created by the host directly; every enqueue operation returns a new one.
    pub struct RawEvent => Event
}

impl RawEvent {
    /// Blocks the current thread until the event is terminal, without consuming it.
    ///
    /// If the command terminated abnormally, its own error is returned, interpreted as an
    /// [`Operation::Execution`] failure. [`Event::wait`](super::Event::wait) does the same, taking the
    /// event by value.
    pub fn wait_by_ref (&self) -> Result<()> {
        match self.backend().wait_for_events(&[self.handle()]) {
            Ok(()) => Ok(()),
            Err(CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST) => match self.status()? {
                EventStatus::Error(code) => Err(Error::from_code(code, Operation::Execution)),
                _ => Err(Error::from_code(CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST, Operation::WaitForEvents))
            },
            Err(code) => Err(Error::from_code(code, Operation::WaitForEvents))
        }
    }

    /// Blocks the current thread until every event is terminal.
    /// The events must share a context, and the list can't be empty.
    pub fn wait_all<'a> (events: impl Into<WaitList<'a>>) -> Result<()> {
        const OP: Operation = Operation::WaitForEvents;
        let events: WaitList<'a> = events.into();

        let mut iter = events.iter();
        let first = match iter.next() {
            Some(x) => x,
            None => return Err(Error::new(ErrorCode::InvalidValue, OP, "empty wait-list"))
        };

        for event in iter {
            first.check_backend(event.backend(), ErrorCode::InvalidContext, OP)?;
        }

        tri!(OP, first.backend().wait_for_events(events.as_handles()));
        Ok(())
    }

    /// Returns the event's current status, without blocking.
    #[inline(always)]
    pub fn status (&self) -> Result<EventStatus> {
        let code = self.info_as::<i32>(InfoParam::EventCommandExecutionStatus)?;
        Ok(EventStatus::from_raw(code))
    }

    /// Returns the type of command the event is associated with.
    #[inline]
    pub fn command_type (&self) -> Result<CommandType> {
        let ty = self.info_as::<u32>(InfoParam::EventCommandType)?;
        CommandType::try_from(ty).map_err(|_| Error::new(ErrorCode::InvalidValue, Operation::GetInfo, format!("unknown command type {ty:#x}")))
    }

    /// Returns the command queue the event was enqueued on, or `None` if it has already been released.
    pub fn command_queue (&self) -> Result<Option<RawCommandQueue>> {
        let id = match self.info_as::<Option<Handle>>(InfoParam::EventCommandQueue)? {
            Some(x) => x,
            None => return Ok(None)
        };

        match RawCommandQueue::retained(id, self.backend().clone()) {
            Ok(queue) => Ok(Some(queue)),
            Err(e) if e.kind() == ErrorKind::InvalidHandle => Ok(None),
            Err(e) => Err(e)
        }
    }

    /// Return the context associated with event.
    #[inline]
    pub fn context (&self) -> Result<RawContext> {
        let id = self.info_as::<Handle>(InfoParam::Context)?;
        RawContext::retained(id, self.backend().clone())
    }

    /// Returns this event's profiling info in `u64` nanoseconds.
    /// Only available on complete events of queues created with profiling enabled.
    #[inline(always)]
    pub fn profiling (&self) -> Result<ProfilingInfo<u64>> {
        ProfilingInfo::<u64>::new(self)
    }

    /// Returns the time elapsed between the event's start and end.
    #[inline(always)]
    pub fn duration (&self) -> Result<Duration> {
        Ok(self.profiling()?.duration())
    }

    /// Registers a callback to be run once the event is terminal, with its final status.
    /// If the event is already terminal, the callback may run immediately, on the current thread.
    #[inline(always)]
    pub fn on_complete (&self, f: impl 'static + FnOnce(EventStatus) + Send) -> Result<()> {
        self.on_complete_boxed(Box::new(f))
    }

    pub fn on_complete_boxed (&self, f: Box<dyn FnOnce(EventStatus) + Send>) -> Result<()> {
        let callback: EventCallback = Box::new(move |_, status| f(EventStatus::from_raw(status)));
        tri!(Operation::SetEventCallback, self.backend().set_event_callback(self.handle(), Some(callback)));
        Ok(())
    }

    /// Returns `true` if the status of the event is [`EventStatus::Complete`] or an error, `false` otherwise.
    #[inline(always)]
    pub fn has_completed (&self) -> bool {
        self.status().as_ref().map_or(true, EventStatus::is_terminal)
    }
}

impl super::Event for RawEvent {
    type Output = ();

    #[inline(always)]
    fn as_raw (&self) -> &RawEvent {
        self
    }

    #[inline(always)]
    fn consume (self) -> Self::Output {}
}
