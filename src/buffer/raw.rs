use std::ops::{Deref, RangeBounds};
use bytemuck::Pod;
use crate::{context::RawContext, core::*, event::{RawEvent, WaitList}, memobj::{offset_cb, MemObjectType, RawMemObject}};
use super::{events::{ReadBuffer, WriteBuffer}, BufferRect, MemAccess, MemFlags};

/// Owned reference to a buffer memory object.
///
/// Offsets and sizes of the raw `enqueue_*` operations are in bytes. The typed helpers take element
/// offsets and ranges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawBuffer (RawMemObject);

impl RawBuffer {
    /// Creates a buffer of `size` bytes in `ctx`. If `host` is given, its contents initialize the
    /// buffer and its length must match `size`.
    pub fn new (ctx: &RawContext, size: usize, flags: MemFlags, host: Option<&[u8]>) -> Result<Self> {
        let backend = ctx.backend();
        let id = tri!(Operation::CreateBuffer, backend.create_buffer(ctx.handle(), flags, size, host));
        tracing::debug!(handle = id.as_usize(), size, "buffer created");
        unsafe { Ok(Self::from_raw(id, backend.clone())) }
    }

    /// Creates a buffer initialized with a copy of `v`.
    #[inline]
    pub fn from_slice<T: Pod> (ctx: &RawContext, v: &[T], access: MemAccess) -> Result<Self> {
        let bytes = bytemuck::cast_slice::<T, u8>(v);
        Self::new(ctx, bytes.len(), MemFlags::copy(access), Some(bytes))
    }

    /// Takes ownership of one reference to a buffer.
    ///
    /// # Safety
    /// The caller must own a reference to `handle`, a buffer issued by `backend`.
    #[inline(always)]
    pub unsafe fn from_raw (handle: Handle, backend: SharedBackend) -> Self {
        Self(RawMemObject::from_raw(handle, backend))
    }

    /// Checks that `mem` is a buffer.
    #[inline]
    pub fn from_memobject (mem: RawMemObject) -> Result<Self> {
        match mem.ty()? {
            MemObjectType::Buffer => Ok(Self(mem))
        }
    }

    #[inline(always)]
    pub fn into_memobject (self) -> RawMemObject {
        self.0
    }

    #[inline(always)]
    pub fn release (self) -> Result<()> {
        self.0.release()
    }

    /// Creates a buffer viewing the given byte range of this one. The sub-buffer keeps this buffer
    /// alive, and can't grant more access than it has.
    pub fn create_sub_buffer (&self, access: MemAccess, region: impl RangeBounds<usize>) -> Result<RawBuffer> {
        const OP: Operation = Operation::CreateSubBuffer;
        let (origin, size) = offset_cb(self.size()?, region, OP)?;

        let id = tri!(OP, self.backend().create_sub_buffer(self.handle(), access, origin, size));
        tracing::debug!(handle = id.as_usize(), parent = self.handle().as_usize(), origin, size, "sub-buffer created");
        unsafe { Ok(Self::from_raw(id, self.backend().clone())) }
    }
}

impl RawBuffer {
    /// Reads the elements in `range` without blocking. The returned event owns the destination.
    pub fn read<'a, T: Pod> (&self, queue: &RawCommandQueue, range: impl RangeBounds<usize>, wait: impl Into<WaitList<'a>>) -> Result<ReadBuffer<T>> {
        let (offset, len) = self.elem_range::<T>(range, Operation::EnqueueReadBuffer)?;
        ReadBuffer::new(self, queue, offset * core::mem::size_of::<T>(), len, wait)
    }

    /// Reads the elements in `range`, blocking until they are available.
    pub fn read_blocking<'a, T: Pod> (&self, queue: &RawCommandQueue, range: impl RangeBounds<usize>, wait: impl Into<WaitList<'a>>) -> Result<Vec<T>> {
        let (offset, len) = self.elem_range::<T>(range, Operation::EnqueueReadBuffer)?;
        let mut result = vec![T::zeroed(); len];
        self.read_into_blocking(queue, offset, &mut result, wait)?;
        Ok(result)
    }

    /// Fills `dst` with the elements starting at `offset`, blocking until they are available.
    pub fn read_into_blocking<'a, T: Pod> (&self, queue: &RawCommandQueue, offset: usize, dst: &mut [T], wait: impl Into<WaitList<'a>>) -> Result<()> {
        let dst = bytemuck::cast_slice_mut::<T, u8>(dst);
        let offset = Self::byte_offset::<T>(offset, Operation::EnqueueReadBuffer)?;
        // SAFETY: the call blocks, so `dst` outlives the command.
        let event = unsafe { queue.enqueue_read_buffer(self, true, offset, dst.len(), dst.as_mut_ptr(), wait)? };
        drop(event);
        Ok(())
    }

    /// Writes `v` starting at element `offset` without blocking. The returned event owns `v` until
    /// the write completes.
    #[inline]
    pub fn write<'a, T: Pod> (&self, queue: &RawCommandQueue, offset: usize, v: Vec<T>, wait: impl Into<WaitList<'a>>) -> Result<WriteBuffer<T>> {
        let offset = Self::byte_offset::<T>(offset, Operation::EnqueueWriteBuffer)?;
        WriteBuffer::new(self, queue, offset, v, wait)
    }

    /// Writes `v` starting at element `offset`, blocking until the write completes.
    pub fn write_blocking<'a, T: Pod> (&self, queue: &RawCommandQueue, offset: usize, v: &[T], wait: impl Into<WaitList<'a>>) -> Result<()> {
        let src = bytemuck::cast_slice::<T, u8>(v);
        let offset = Self::byte_offset::<T>(offset, Operation::EnqueueWriteBuffer)?;
        // SAFETY: the call blocks, so `src` outlives the command.
        let event = unsafe { queue.enqueue_write_buffer(self, true, offset, src.len(), src.as_ptr(), wait)? };
        drop(event);
        Ok(())
    }

    /// Copies the bytes of `src` in `range` into this buffer, starting at byte `offset`.
    pub fn copy_from<'a> (&self, queue: &RawCommandQueue, offset: usize, src: &RawBuffer, range: impl RangeBounds<usize>, wait: impl Into<WaitList<'a>>) -> Result<RawEvent> {
        let (src_offset, size) = offset_cb(src.size()?, range, Operation::EnqueueCopyBuffer)?;
        queue.enqueue_copy_buffer(src, self, src_offset, offset, size, wait)
    }

    /// Reads the rectangle described by `rect` into `dst`, blocking until it is available.
    /// Host-side offsets and pitches are in bytes of `dst`.
    pub fn read_rect_blocking<'a, T: Pod> (&self, queue: &RawCommandQueue, rect: &BufferRect, dst: &mut [T], wait: impl Into<WaitList<'a>>) -> Result<()> {
        const OP: Operation = Operation::EnqueueReadBufferRect;
        let dst = bytemuck::cast_slice_mut::<T, u8>(dst);
        Self::check_host_rect(rect, dst.len(), OP)?;

        // SAFETY: the host side of `rect` fits in `dst`, and the call blocks.
        let event = unsafe { queue.enqueue_read_buffer_rect(self, true, rect, dst.as_mut_ptr(), wait)? };
        drop(event);
        Ok(())
    }

    /// Writes the rectangle described by `rect` from `src`, blocking until the write completes.
    /// Host-side offsets and pitches are in bytes of `src`.
    pub fn write_rect_blocking<'a, T: Pod> (&self, queue: &RawCommandQueue, rect: &BufferRect, src: &[T], wait: impl Into<WaitList<'a>>) -> Result<()> {
        const OP: Operation = Operation::EnqueueWriteBufferRect;
        let src = bytemuck::cast_slice::<T, u8>(src);
        Self::check_host_rect(rect, src.len(), OP)?;

        // SAFETY: the host side of `rect` fits in `src`, and the call blocks.
        let event = unsafe { queue.enqueue_write_buffer_rect(self, true, rect, src.as_ptr(), wait)? };
        drop(event);
        Ok(())
    }

    #[inline]
    fn check_host_rect (rect: &BufferRect, len: usize, op: Operation) -> Result<()> {
        let host = rect.host_layout().map_err(|code| Error::from_code(code, op))?;
        if host.end() > len {
            return Err(Error::new(ErrorCode::InvalidValue, op, format!("rectangle reaches byte {} of a {len} byte host slice", host.end())))
        }
        Ok(())
    }

    #[inline]
    fn elem_range<T> (&self, range: impl RangeBounds<usize>, op: Operation) -> Result<(usize, usize)> {
        let elem = core::mem::size_of::<T>();
        if elem == 0 {
            return Err(Error::new(ErrorCode::InvalidValue, op, "zero-sized element type"))
        }
        offset_cb(self.size()? / elem, range, op)
    }

    #[inline]
    fn byte_offset<T> (offset: usize, op: Operation) -> Result<usize> {
        offset.checked_mul(core::mem::size_of::<T>())
            .ok_or_else(|| Error::new(ErrorCode::InvalidValue, op, "offset overflow"))
    }
}

impl Deref for RawBuffer {
    type Target = RawMemObject;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<RawMemObject> for RawBuffer {
    #[inline(always)]
    fn as_ref(&self) -> &RawMemObject {
        &self.0
    }
}

impl From<RawBuffer> for RawMemObject {
    #[inline(always)]
    fn from(buffer: RawBuffer) -> Self {
        buffer.0
    }
}
