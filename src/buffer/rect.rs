use crate::core::{codes::CL_INVALID_VALUE, NativeResult};

/// Geometry of a rectangular transfer between a buffer and host memory.
///
/// Origins and `region[0]` are in bytes, `region[1]` in rows and `region[2]` in slices. A pitch of
/// zero is derived from the region: the row pitch becomes `region[0]` and the slice pitch
/// `region[1] * row_pitch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferRect {
    pub buffer_origin: [usize; 3],
    pub host_origin: [usize; 3],
    pub region: [usize; 3],
    pub buffer_row_pitch: usize,
    pub buffer_slice_pitch: usize,
    pub host_row_pitch: usize,
    pub host_slice_pitch: usize,
}

impl BufferRect {
    #[inline(always)]
    pub const fn new (region: [usize; 3]) -> Self {
        Self {
            buffer_origin: [0; 3],
            host_origin: [0; 3],
            region,
            buffer_row_pitch: 0,
            buffer_slice_pitch: 0,
            host_row_pitch: 0,
            host_slice_pitch: 0
        }
    }

    #[inline(always)]
    pub const fn with_buffer_origin (self, buffer_origin: [usize; 3]) -> Self {
        Self { buffer_origin, ..self }
    }

    #[inline(always)]
    pub const fn with_host_origin (self, host_origin: [usize; 3]) -> Self {
        Self { host_origin, ..self }
    }

    #[inline(always)]
    pub const fn with_buffer_pitch (self, row: usize, slice: usize) -> Self {
        Self { buffer_row_pitch: row, buffer_slice_pitch: slice, ..self }
    }

    #[inline(always)]
    pub const fn with_host_pitch (self, row: usize, slice: usize) -> Self {
        Self { host_row_pitch: row, host_slice_pitch: slice, ..self }
    }

    /// Resolves the buffer side of the transfer
    #[inline(always)]
    pub fn buffer_layout (&self) -> NativeResult<RectLayout> {
        RectLayout::resolve(self.buffer_origin, self.region, self.buffer_row_pitch, self.buffer_slice_pitch)
    }

    /// Resolves the host side of the transfer
    #[inline(always)]
    pub fn host_layout (&self) -> NativeResult<RectLayout> {
        RectLayout::resolve(self.host_origin, self.region, self.host_row_pitch, self.host_slice_pitch)
    }
}

/// Geometry of a rectangular copy between two buffers, with the same conventions as [`BufferRect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RectCopy {
    pub src_origin: [usize; 3],
    pub dst_origin: [usize; 3],
    pub region: [usize; 3],
    pub src_row_pitch: usize,
    pub src_slice_pitch: usize,
    pub dst_row_pitch: usize,
    pub dst_slice_pitch: usize,
}

impl RectCopy {
    #[inline(always)]
    pub const fn new (region: [usize; 3]) -> Self {
        Self {
            src_origin: [0; 3],
            dst_origin: [0; 3],
            region,
            src_row_pitch: 0,
            src_slice_pitch: 0,
            dst_row_pitch: 0,
            dst_slice_pitch: 0
        }
    }

    #[inline(always)]
    pub const fn with_src_origin (self, src_origin: [usize; 3]) -> Self {
        Self { src_origin, ..self }
    }

    #[inline(always)]
    pub const fn with_dst_origin (self, dst_origin: [usize; 3]) -> Self {
        Self { dst_origin, ..self }
    }

    #[inline(always)]
    pub const fn with_src_pitch (self, row: usize, slice: usize) -> Self {
        Self { src_row_pitch: row, src_slice_pitch: slice, ..self }
    }

    #[inline(always)]
    pub const fn with_dst_pitch (self, row: usize, slice: usize) -> Self {
        Self { dst_row_pitch: row, dst_slice_pitch: slice, ..self }
    }

    #[inline(always)]
    pub fn src_layout (&self) -> NativeResult<RectLayout> {
        RectLayout::resolve(self.src_origin, self.region, self.src_row_pitch, self.src_slice_pitch)
    }

    #[inline(always)]
    pub fn dst_layout (&self) -> NativeResult<RectLayout> {
        RectLayout::resolve(self.dst_origin, self.region, self.dst_row_pitch, self.dst_slice_pitch)
    }
}

/// One side of a rectangular transfer, with its pitches resolved and its byte span computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RectLayout {
    region: [usize; 3],
    row_pitch: usize,
    slice_pitch: usize,
    offset: usize,
    end: usize,
}

impl RectLayout {
    /// Fails with `CL_INVALID_VALUE` on a zero region component, a pitch smaller than the region
    /// requires, or arithmetic overflow.
    pub fn resolve (origin: [usize; 3], region: [usize; 3], row_pitch: usize, slice_pitch: usize) -> NativeResult<Self> {
        if region.contains(&0) {
            return Err(CL_INVALID_VALUE)
        }

        let row_pitch = match row_pitch {
            0 => region[0],
            x if x < region[0] => return Err(CL_INVALID_VALUE),
            x => x
        };

        let min_slice = region[1].checked_mul(row_pitch).ok_or(CL_INVALID_VALUE)?;
        let slice_pitch = match slice_pitch {
            0 => min_slice,
            x if x < min_slice => return Err(CL_INVALID_VALUE),
            x => x
        };

        let offset = Self::linear(origin[0], origin[1], origin[2], row_pitch, slice_pitch).ok_or(CL_INVALID_VALUE)?;
        let end = Self::linear(region[0], region[1] - 1, region[2] - 1, row_pitch, slice_pitch)
            .and_then(|x| x.checked_add(offset))
            .ok_or(CL_INVALID_VALUE)?;

        Ok(Self { region, row_pitch, slice_pitch, offset, end })
    }

    #[inline]
    fn linear (x: usize, y: usize, z: usize, row_pitch: usize, slice_pitch: usize) -> Option<usize> {
        z.checked_mul(slice_pitch)?
            .checked_add(y.checked_mul(row_pitch)?)?
            .checked_add(x)
    }

    #[inline(always)]
    pub fn region (&self) -> [usize; 3] {
        self.region
    }

    #[inline(always)]
    pub fn row_pitch (&self) -> usize {
        self.row_pitch
    }

    #[inline(always)]
    pub fn slice_pitch (&self) -> usize {
        self.slice_pitch
    }

    /// Offset of the first byte of the rectangle: `origin[2] * slice_pitch + origin[1] * row_pitch + origin[0]`
    #[inline(always)]
    pub fn offset (&self) -> usize {
        self.offset
    }

    /// One past the last byte touched by the rectangle
    #[inline(always)]
    pub fn end (&self) -> usize {
        self.end
    }

    /// Length of every row, in bytes
    #[inline(always)]
    pub fn row_len (&self) -> usize {
        self.region[0]
    }

    /// Offsets of the start of every row, slice by slice
    pub fn rows (&self) -> impl '_ + Iterator<Item = usize> {
        (0..self.region[2]).flat_map(move |z| {
            (0..self.region[1]).map(move |y| self.offset + z * self.slice_pitch + y * self.row_pitch)
        })
    }
}

/// Returns `true` if any row of `a`, placed at `a_base`, overlaps any row of `b`, placed at `b_base`.
pub(crate) fn rows_overlap (a_base: usize, a: &RectLayout, b_base: usize, b: &RectLayout) -> bool {
    let mut rows = a.rows().map(|x| (a_base + x, a_base + x + a.row_len(), 0))
        .chain(b.rows().map(|x| (b_base + x, b_base + x + b.row_len(), 1)))
        .collect::<Vec<_>>();

    rows.sort_unstable();

    // furthest end seen so far, for each side
    let mut reach = [0usize; 2];
    for (start, end, side) in rows {
        if start < reach[1 - side] {
            return true
        }
        reach[side] = reach[side].max(end);
    }

    false
}
