use bytemuck::Pod;
use crate::{buffer::RawBuffer, core::*, event::{Event, RawEvent, WaitList}};

/// Non-blocking read into an owned vector, which is handed back once the read completes.
///
/// Dropping the event before it has been consumed blocks until the read is terminal, since the
/// command still writes into the vector.
#[derive(Debug)]
pub struct ReadBuffer<T: Pod> {
    event: RawEvent,
    dst: Option<Vec<T>>,
}

impl<T: Pod> ReadBuffer<T> {
    /// Reads `len` elements starting at byte `offset` of `src`.
    pub fn new<'a> (src: &RawBuffer, queue: &RawCommandQueue, offset: usize, len: usize, wait: impl Into<WaitList<'a>>) -> Result<Self> {
        let mut dst = vec![T::zeroed(); len];
        let size = core::mem::size_of_val(dst.as_slice());

        // SAFETY: the heap allocation of `dst` doesn't move, and it's kept alive until the event is terminal.
        let event = unsafe { queue.enqueue_read_buffer(src, false, offset, size, dst.as_mut_ptr().cast(), wait)? };
        Ok(Self { event, dst: Some(dst) })
    }
}

impl<T: Pod> Event for ReadBuffer<T> {
    type Output = Vec<T>;

    #[inline(always)]
    fn as_raw (&self) -> &RawEvent {
        &self.event
    }

    #[inline(always)]
    fn consume (mut self) -> Self::Output {
        self.dst.take().unwrap_or_default()
    }
}

impl<T: Pod> Drop for ReadBuffer<T> {
    fn drop(&mut self) {
        if self.dst.is_some() {
            if let Err(e) = self.event.wait_by_ref() {
                tracing::debug!("dropped read terminated abnormally: {e}");
            }
        }
    }
}
