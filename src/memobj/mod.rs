use std::ops::{Bound, RangeBounds};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use crate::core::*;

flat_mod!(raw);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum MemObjectType {
    Buffer = 0x10F0,
}

/// Resolves a byte range of a memory object of `size` bytes into `(offset, len)`.
/// Ranges reaching past the end fail with `CL_INVALID_VALUE`, interpreted for `op`.
pub(crate) fn offset_cb (size: usize, range: impl RangeBounds<usize>, op: Operation) -> Result<(usize, usize)> {
    let start = match range.start_bound() {
        Bound::Excluded(x) => x.checked_add(1),
        Bound::Included(x) => Some(*x),
        Bound::Unbounded => Some(0)
    };

    let end = match range.end_bound() {
        Bound::Excluded(x) => Some(*x),
        Bound::Included(x) => x.checked_add(1),
        Bound::Unbounded => Some(size)
    };

    match (start, end) {
        (Some(start), Some(end)) if start <= end && end <= size => Ok((start, end - start)),
        _ => Err(Error::new(ErrorCode::InvalidValue, op, format!("range out of bounds for {size} bytes")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_resolve_to_offset_and_len() -> Result<()> {
        let op = Operation::EnqueueReadBuffer;
        assert_eq!(offset_cb(16, .., op)?, (0, 16));
        assert_eq!(offset_cb(16, 4..8, op)?, (4, 4));
        assert_eq!(offset_cb(16, 4..=8, op)?, (4, 5));
        assert_eq!(offset_cb(16, 12.., op)?, (12, 4));
        Ok(())
    }

    #[test]
    fn ranges_past_the_end_are_invalid() {
        let op = Operation::EnqueueReadBuffer;
        let err = offset_cb(16, 8..17, op).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert!(offset_cb(16, ..=usize::MAX, op).is_err());
    }
}
