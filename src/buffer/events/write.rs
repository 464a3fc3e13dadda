use bytemuck::Pod;
use crate::{buffer::RawBuffer, core::*, event::{Event, RawEvent, WaitList}};

/// Non-blocking write from an owned vector, which is handed back once the write completes.
///
/// Dropping the event before it has been consumed blocks until the write is terminal.
#[derive(Debug)]
pub struct WriteBuffer<T: Pod> {
    event: RawEvent,
    src: Option<Vec<T>>,
}

impl<T: Pod> WriteBuffer<T> {
    /// Writes `src` starting at byte `offset` of `dst`.
    pub fn new<'a> (dst: &RawBuffer, queue: &RawCommandQueue, offset: usize, src: Vec<T>, wait: impl Into<WaitList<'a>>) -> Result<Self> {
        let size = core::mem::size_of_val(src.as_slice());

        // SAFETY: the heap allocation of `src` doesn't move, and it's kept alive until the event is terminal.
        let event = unsafe { queue.enqueue_write_buffer(dst, false, offset, size, src.as_ptr().cast(), wait)? };
        Ok(Self { event, src: Some(src) })
    }
}

impl<T: Pod> Event for WriteBuffer<T> {
    type Output = Vec<T>;

    #[inline(always)]
    fn as_raw (&self) -> &RawEvent {
        &self.event
    }

    #[inline(always)]
    fn consume (mut self) -> Self::Output {
        self.src.take().unwrap_or_default()
    }
}

impl<T: Pod> Drop for WriteBuffer<T> {
    fn drop(&mut self) {
        if self.src.is_some() {
            if let Err(e) = self.event.wait_by_ref() {
                tracing::debug!("dropped write terminated abnormally: {e}");
            }
        }
    }
}
