use crate::core::Handle;
use super::RawEvent;

/// Ordered list of events a command must wait for.
///
/// The list borrows its events, so they're guaranteed to stay alive at least until the enqueue call
/// that takes it returns. Duplicates are allowed, and an empty list means no dependency.
#[derive(Debug, Clone, Default)]
pub struct WaitList<'a> {
    events: Vec<&'a RawEvent>,
    handles: Vec<Handle>,
}

impl<'a> WaitList<'a> {
    /// An empty wait list
    pub const EMPTY : Self = Self { events: Vec::new(), handles: Vec::new() };

    #[inline(always)]
    pub const fn new () -> Self {
        Self::EMPTY
    }

    /// Adds a new event to the end of the list
    #[inline(always)]
    pub fn push (&mut self, event: &'a RawEvent) {
        self.events.push(event);
        self.handles.push(event.handle());
    }

    #[inline(always)]
    pub fn len (&self) -> usize {
        self.events.len()
    }

    #[inline(always)]
    pub fn is_empty (&self) -> bool {
        self.events.is_empty()
    }

    #[inline(always)]
    pub fn get (&self, idx: usize) -> Option<&'a RawEvent> {
        self.events.get(idx).copied()
    }

    #[inline(always)]
    pub fn iter (&self) -> impl '_ + ExactSizeIterator<Item = &'a RawEvent> {
        self.events.iter().copied()
    }

    /// Returns the list in native form, as a slice of handles in insertion order
    #[inline(always)]
    pub fn as_handles (&self) -> &[Handle] {
        &self.handles
    }
}

impl<'a> Extend<&'a RawEvent> for WaitList<'a> {
    #[inline]
    fn extend<I: IntoIterator<Item = &'a RawEvent>> (&mut self, iter: I) {
        for event in iter {
            self.push(event)
        }
    }
}

impl<'a> FromIterator<&'a RawEvent> for WaitList<'a> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = &'a RawEvent>> (iter: I) -> Self {
        let mut this = Self::new();
        this.extend(iter);
        this
    }
}

impl<'a> From<&'a RawEvent> for WaitList<'a> {
    #[inline(always)]
    fn from(event: &'a RawEvent) -> Self {
        Self::from_iter([event])
    }
}

impl<'a> From<Option<&'a RawEvent>> for WaitList<'a> {
    #[inline(always)]
    fn from(event: Option<&'a RawEvent>) -> Self {
        Self::from_iter(event)
    }
}

impl<'a> From<&'a [RawEvent]> for WaitList<'a> {
    #[inline(always)]
    fn from(events: &'a [RawEvent]) -> Self {
        Self::from_iter(events)
    }
}

impl<'a> From<&'a Vec<RawEvent>> for WaitList<'a> {
    #[inline(always)]
    fn from(events: &'a Vec<RawEvent>) -> Self {
        Self::from_iter(events)
    }
}

impl<'a, const N: usize> From<&'a [RawEvent; N]> for WaitList<'a> {
    #[inline(always)]
    fn from(events: &'a [RawEvent; N]) -> Self {
        Self::from_iter(events)
    }
}

impl<'a, const N: usize> From<[&'a RawEvent; N]> for WaitList<'a> {
    #[inline(always)]
    fn from(events: [&'a RawEvent; N]) -> Self {
        Self::from_iter(events)
    }
}

impl<'a> From<&'a [&'a RawEvent]> for WaitList<'a> {
    #[inline(always)]
    fn from(events: &'a [&'a RawEvent]) -> Self {
        Self::from_iter(events.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn markers (n: usize) -> Result<Vec<RawEvent>> {
        let backend: SharedBackend = HostBackend::new(HostConfig::default());
        let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ALL)?;
        let queue = RawCommandQueue::with_modes(&ctx, &ctx.devices()?[0], false, false)?;
        (0..n).map(|_| queue.enqueue_marker(None)).collect()
    }

    #[test]
    fn keeps_insertion_order_and_duplicates() -> Result<()> {
        let events = markers(2)?;
        let mut list = WaitList::new();
        assert!(list.is_empty());

        list.push(&events[1]);
        list.push(&events[0]);
        list.push(&events[1]);

        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0), Some(&events[1]));
        assert_eq!(list.get(3), None);
        assert_eq!(list.as_handles(), &[events[1].handle(), events[0].handle(), events[1].handle()]);
        assert!(list.iter().eq([&events[1], &events[0], &events[1]]));
        Ok(())
    }

    #[test]
    fn conversions() -> Result<()> {
        let events = markers(3)?;

        assert!(WaitList::from(None).is_empty());
        assert_eq!(WaitList::from(&events[0]).as_handles(), &[events[0].handle()]);
        assert_eq!(WaitList::from(&events).len(), 3);
        assert_eq!(WaitList::from(&events[1..]).len(), 2);

        let mut list = WaitList::from([&events[2]]);
        list.extend(&events[..2]);
        let handles = events.iter().map(|e| e.handle()).collect::<Vec<_>>();
        assert_eq!(list.as_handles(), &[handles[2], handles[0], handles[1]]);
        Ok(())
    }
}
