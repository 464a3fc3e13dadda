use crate::{buffer::{BufferRect, RawBuffer, RectCopy}, context::RawContext, event::{RawEvent, WaitList}};
use super::*;

raw_object! {
    /// Owned reference to a command queue, bound to one context and one device for its whole life.
    pub struct RawCommandQueue => CommandQueue
}

bitflags::bitflags! {
    /// Properties of a command queue, fixed at creation
    #[repr(transparent)]
    pub struct QueueProperties : u64 {
        /// Commands only honour their explicit wait-lists, instead of executing in enqueue order.
        const OUT_OF_ORDER_EXEC_MODE_ENABLE = 1 << 0;
        /// Commands record profiling timestamps on their events.
        const PROFILING_ENABLE = 1 << 1;
    }
}

impl QueueProperties {
    #[inline(always)]
    pub const fn new (out_of_order: bool, profiling: bool) -> Self {
        let mut bits = 0;
        if out_of_order { bits |= Self::OUT_OF_ORDER_EXEC_MODE_ENABLE.bits() }
        if profiling { bits |= Self::PROFILING_ENABLE.bits() }
        Self::from_bits_truncate(bits)
    }

    #[inline(always)]
    pub const fn out_of_order (self) -> bool {
        self.contains(Self::OUT_OF_ORDER_EXEC_MODE_ENABLE)
    }

    #[inline(always)]
    pub const fn profiling (self) -> bool {
        self.contains(Self::PROFILING_ENABLE)
    }
}

impl Default for QueueProperties {
    #[inline(always)]
    fn default() -> Self {
        Self::empty()
    }
}

/// Extents of a kernel launch over `N` dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NdRange<const N: usize> {
    pub offset: Option<[usize; N]>,
    pub global: [usize; N],
    pub local: Option<[usize; N]>,
}

impl<const N: usize> NdRange<N> {
    #[inline(always)]
    pub const fn new (global: [usize; N]) -> Self {
        Self { offset: None, global, local: None }
    }

    #[inline(always)]
    pub fn with_offset (self, offset: [usize; N]) -> Self {
        Self { offset: Some(offset), ..self }
    }

    #[inline(always)]
    pub fn with_local (self, local: [usize; N]) -> Self {
        Self { local: Some(local), ..self }
    }
}

impl<const N: usize> From<[usize; N]> for NdRange<N> {
    #[inline(always)]
    fn from(global: [usize; N]) -> Self {
        Self::new(global)
    }
}

impl RawCommandQueue {
    /// Creates a command queue on `device`, which must belong to `ctx`.
    pub fn new (ctx: &RawContext, device: &RawDevice, props: QueueProperties) -> Result<Self> {
        ctx.check_backend(device.backend(), ErrorCode::InvalidDevice, Operation::CreateCommandQueue)?;

        let backend = ctx.backend();
        let id = tri!(Operation::CreateCommandQueue, backend.create_command_queue(ctx.handle(), device.handle(), props));
        unsafe { Ok(Self::from_raw(id, backend.clone())) }
    }

    #[inline(always)]
    pub fn with_modes (ctx: &RawContext, device: &RawDevice, out_of_order: bool, profiling: bool) -> Result<Self> {
        Self::new(ctx, device, QueueProperties::new(out_of_order, profiling))
    }

    /// Return the context specified when the command-queue is created.
    #[inline]
    pub fn context (&self) -> Result<RawContext> {
        let id = self.info_as::<Handle>(InfoParam::Context)?;
        RawContext::retained(id, self.backend().clone())
    }

    /// Return the device specified when the command-queue is created.
    #[inline]
    pub fn device (&self) -> Result<RawDevice> {
        let id = self.info_as::<Handle>(InfoParam::QueueDevice)?;
        unsafe { Ok(RawDevice::from_raw(id, self.backend().clone())) }
    }

    /// Return the currently specified properties for the command-queue.
    #[inline]
    pub fn properties (&self) -> Result<QueueProperties> {
        let bits = self.info_as::<u64>(InfoParam::QueueProperties)?;
        Ok(QueueProperties::from_bits_truncate(bits))
    }

    /// Issues all previously queued commands to the device. Never blocks.
    #[inline(always)]
    pub fn flush (&self) -> Result<()> {
        tri!(Operation::Flush, self.backend().flush(self.handle()));
        Ok(())
    }

    /// Blocks until every previously enqueued command has completed, flushing the queue first.
    #[inline(always)]
    pub fn finish (&self) -> Result<()> {
        tri!(Operation::Finish, self.backend().finish(self.handle()));
        Ok(())
    }
}

impl RawCommandQueue {
    /// Enqueues a read of `size` bytes, starting at `offset`, from `buffer` into `dst`.
    ///
    /// # Safety
    /// `dst` must be valid for writes of `size` bytes until the returned event completes.
    pub unsafe fn enqueue_read_buffer<'a> (&self, buffer: &RawBuffer, blocking: bool, offset: usize, size: usize, dst: *mut u8, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        const OP: Operation = Operation::EnqueueReadBuffer;
        let wait = self.check_wait(wait.into(), OP)?;
        self.check_backend(buffer.backend(), ErrorCode::InvalidContext, OP)?;

        let id = tri!(OP, self.backend().enqueue_read_buffer(self.handle(), buffer.handle(), blocking, offset, size, dst, wait.as_handles()));
        Ok(self.event(id))
    }

    /// Enqueues a write of `size` bytes from `src` into `buffer`, starting at `offset`.
    ///
    /// # Safety
    /// `src` must be valid for reads of `size` bytes until the returned event completes.
    pub unsafe fn enqueue_write_buffer<'a> (&self, buffer: &RawBuffer, blocking: bool, offset: usize, size: usize, src: *const u8, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        const OP: Operation = Operation::EnqueueWriteBuffer;
        let wait = self.check_wait(wait.into(), OP)?;
        self.check_backend(buffer.backend(), ErrorCode::InvalidContext, OP)?;

        let id = tri!(OP, self.backend().enqueue_write_buffer(self.handle(), buffer.handle(), blocking, offset, size, src, wait.as_handles()));
        Ok(self.event(id))
    }

    /// Enqueues a copy of `size` bytes between two buffers, which may be the same one as long as the
    /// ranges don't overlap.
    pub fn enqueue_copy_buffer<'a> (&self, src: &RawBuffer, dst: &RawBuffer, src_offset: usize, dst_offset: usize, size: usize, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        const OP: Operation = Operation::EnqueueCopyBuffer;
        let wait = self.check_wait(wait.into(), OP)?;
        self.check_backend(src.backend(), ErrorCode::InvalidContext, OP)?;
        self.check_backend(dst.backend(), ErrorCode::InvalidContext, OP)?;

        let id = tri!(OP, self.backend().enqueue_copy_buffer(self.handle(), src.handle(), dst.handle(), src_offset, dst_offset, size, wait.as_handles()));
        Ok(self.event(id))
    }

    /// Enqueues a rectangular read from `buffer` into `dst`.
    ///
    /// # Safety
    /// `dst` must be valid for writes over the host side of `rect` until the returned event completes.
    pub unsafe fn enqueue_read_buffer_rect<'a> (&self, buffer: &RawBuffer, blocking: bool, rect: &BufferRect, dst: *mut u8, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        const OP: Operation = Operation::EnqueueReadBufferRect;
        let wait = self.check_wait(wait.into(), OP)?;
        self.check_backend(buffer.backend(), ErrorCode::InvalidContext, OP)?;

        let id = tri!(OP, self.backend().enqueue_read_buffer_rect(self.handle(), buffer.handle(), blocking, rect, dst, wait.as_handles()));
        Ok(self.event(id))
    }

    /// Enqueues a rectangular write from `src` into `buffer`.
    ///
    /// # Safety
    /// `src` must be valid for reads over the host side of `rect` until the returned event completes.
    pub unsafe fn enqueue_write_buffer_rect<'a> (&self, buffer: &RawBuffer, blocking: bool, rect: &BufferRect, src: *const u8, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        const OP: Operation = Operation::EnqueueWriteBufferRect;
        let wait = self.check_wait(wait.into(), OP)?;
        self.check_backend(buffer.backend(), ErrorCode::InvalidContext, OP)?;

        let id = tri!(OP, self.backend().enqueue_write_buffer_rect(self.handle(), buffer.handle(), blocking, rect, src, wait.as_handles()));
        Ok(self.event(id))
    }

    /// Enqueues a rectangular copy between two buffers.
    pub fn enqueue_copy_buffer_rect<'a> (&self, src: &RawBuffer, dst: &RawBuffer, rect: &RectCopy, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        const OP: Operation = Operation::EnqueueCopyBufferRect;
        let wait = self.check_wait(wait.into(), OP)?;
        self.check_backend(src.backend(), ErrorCode::InvalidContext, OP)?;
        self.check_backend(dst.backend(), ErrorCode::InvalidContext, OP)?;

        let id = tri!(OP, self.backend().enqueue_copy_buffer_rect(self.handle(), src.handle(), dst.handle(), rect, wait.as_handles()));
        Ok(self.event(id))
    }

    /// Enqueues a kernel launch. Every slice must have one entry per work dimension.
    pub fn enqueue_nd_range_kernel<'a> (&self, kernel: &RawKernel, offset: Option<&[usize]>, global: &[usize], local: Option<&[usize]>, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        const OP: Operation = Operation::EnqueueKernel;
        let wait = self.check_wait(wait.into(), OP)?;
        self.check_backend(kernel.backend(), ErrorCode::InvalidContext, OP)?;

        let work_dim = u32::try_from(global.len())
            .map_err(|_| Error::new(ErrorCode::InvalidWorkDimension, OP, "too many work dimensions"))?;

        #[cfg(feature = "strict")]
        {
            let consistent = offset.map_or(true, |x| x.len() == global.len()) && local.map_or(true, |x| x.len() == global.len());
            if !(1..=3).contains(&work_dim) || !consistent {
                return Err(Error::new(ErrorCode::InvalidWorkDimension, OP, format!("inconsistent work dimensions for {work_dim}-dimensional launch")));
            }
        }

        let id = tri!(OP, self.backend().enqueue_nd_range_kernel(self.handle(), kernel.handle(), work_dim, offset, global, local, wait.as_handles()));
        Ok(self.event(id))
    }

    /// Enqueues a kernel launch over `N` dimensions.
    #[inline]
    pub fn enqueue_kernel<'a, const N: usize> (&self, kernel: &RawKernel, range: &NdRange<N>, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        let offset = range.offset.as_ref().map(|x| x.as_slice());
        let local = range.local.as_ref().map(|x| x.as_slice());
        self.enqueue_nd_range_kernel(kernel, offset, &range.global, local, wait)
    }

    /// Enqueues a marker that completes once every event of `wait` completes, or, with an empty
    /// wait-list, once every command previously enqueued on this queue completes.
    pub fn enqueue_marker<'a> (&self, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        const OP: Operation = Operation::EnqueueMarker;
        let wait = self.check_wait(wait.into(), OP)?;
        let id = tri!(OP, self.backend().enqueue_marker(self.handle(), wait.as_handles()));
        Ok(self.event(id))
    }

    #[inline]
    fn check_wait<'a> (&self, wait: WaitList<'a>, op: Operation) -> Result<WaitList<'a>> {
        for event in wait.iter() {
            self.check_backend(event.backend(), ErrorCode::InvalidContext, op)?;
        }
        Ok(wait)
    }

    #[inline(always)]
    fn event (&self, id: Handle) -> RawEvent {
        unsafe { RawEvent::from_raw(id, self.backend().clone()) }
    }
}
