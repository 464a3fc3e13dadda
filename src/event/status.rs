use crate::core::{codes::*, Error, Operation};

/// Execution status of the command identified by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    /// Command has been enqueued in the command-queue
    Queued,
    /// Enqueued command has been submitted by the host to the device associated with the command-queue
    Submitted,
    /// Device is currently executing this command
    Running,
    /// The command has completed
    Complete,
    /// The command terminated abnormally, with the given (negative) native code
    Error (i32),
}

impl EventStatus {
    #[inline]
    pub const fn from_raw (code: i32) -> Self {
        match code {
            CL_COMPLETE => Self::Complete,
            CL_RUNNING => Self::Running,
            CL_SUBMITTED => Self::Submitted,
            x if x < 0 => Self::Error(x),
            _ => Self::Queued,
        }
    }

    #[inline]
    pub const fn as_raw (self) -> i32 {
        match self {
            Self::Queued => CL_QUEUED,
            Self::Submitted => CL_SUBMITTED,
            Self::Running => CL_RUNNING,
            Self::Complete => CL_COMPLETE,
            Self::Error(x) => x,
        }
    }

    /// Returns `true` if the status is [`EventStatus::Queued`].
    #[inline(always)]
    pub const fn is_queued (&self) -> bool {
        matches!(self, Self::Queued)
    }

    /// Returns `true` if the status is [`EventStatus::Submitted`], [`EventStatus::Running`], [`EventStatus::Complete`] or an error.
    #[inline(always)]
    pub const fn has_submitted (&self) -> bool {
        !self.is_queued()
    }

    /// Returns `true` if the status is [`EventStatus::Running`], [`EventStatus::Complete`] or an error.
    #[inline(always)]
    pub const fn has_started_running (&self) -> bool {
        !matches!(self, Self::Queued | Self::Submitted)
    }

    /// Returns `true` if the status is [`EventStatus::Complete`] or an error.
    #[inline(always)]
    pub const fn is_terminal (&self) -> bool {
        matches!(self, Self::Complete | Self::Error(_))
    }

    /// Returns the error the command terminated with, if any.
    #[inline]
    pub fn error (&self) -> Option<Error> {
        match self {
            Self::Error(code) => Some(Error::from_code(*code, Operation::Execution)),
            _ => None
        }
    }
}

impl From<i32> for EventStatus {
    #[inline(always)]
    fn from(value: i32) -> Self {
        Self::from_raw(value)
    }
}

impl From<EventStatus> for i32 {
    #[inline(always)]
    fn from(value: EventStatus) -> Self {
        value.as_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    #[test]
    fn negative_codes_are_errors() {
        let status = EventStatus::from_raw(CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST);
        assert!(status.is_terminal());
        assert_eq!(status.error().map(|e| e.kind()), Some(ErrorKind::DependencyFailure));
        assert_eq!(status.as_raw(), CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST);
    }

    #[test]
    fn progress_predicates() {
        assert!(EventStatus::Queued.is_queued());
        assert!(!EventStatus::Submitted.has_started_running());
        assert!(EventStatus::Running.has_started_running());
        assert!(!EventStatus::Running.is_terminal());
        assert!(EventStatus::Complete.is_terminal());
        assert_eq!(EventStatus::Complete.error().map(|e| e.kind()), None);
    }
}
