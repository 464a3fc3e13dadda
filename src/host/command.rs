use std::sync::Arc;
use crate::{buffer::RectLayout, core::NativeResult};
use super::{kernel::KernelLaunch, registry::{bytes, bytes_mut, Storage}};

/// Host memory handed to a command. The enqueueing caller guarantees it stays valid until the
/// command's event is terminal.
#[derive(Debug, Clone, Copy)]
pub(super) struct SendPtr (pub *mut u8);

unsafe impl Send for SendPtr {}

/// Position inside a storage, already offset by the sub-buffer origin
#[derive(Debug, Clone)]
pub(super) struct Span {
    pub storage: Arc<Storage>,
    pub offset: usize,
}

/// Work of one enqueued command, with every object it touches resolved
pub(super) enum Command {
    Read { src: Span, len: usize, dst: SendPtr },
    Write { dst: Span, len: usize, src: SendPtr },
    Copy { src: Span, dst: Span, len: usize },
    ReadRect { src: Span, buffer: RectLayout, host: RectLayout, dst: SendPtr },
    WriteRect { dst: Span, buffer: RectLayout, host: RectLayout, src: SendPtr },
    CopyRect { src: Span, dst: Span, src_layout: RectLayout, dst_layout: RectLayout },
    Kernel (KernelLaunch),
    Marker,
}

impl Command {
    pub fn execute (self) -> NativeResult<()> {
        match self {
            Self::Read { src, len, dst } => {
                let words = src.storage.read();
                let bytes = &bytes(&words)[src.offset..src.offset + len];
                unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), dst.0, len) }
            },

            Self::Write { dst, len, src } => {
                let mut words = dst.storage.write();
                let bytes = &mut bytes_mut(&mut words)[dst.offset..dst.offset + len];
                unsafe { core::ptr::copy_nonoverlapping(src.0 as *const u8, bytes.as_mut_ptr(), len) }
            },

            Self::Copy { src, dst, len } => copy_rows(&src, &dst, core::iter::once((0, 0)), len),

            Self::ReadRect { src, buffer, host, dst } => {
                let words = src.storage.read();
                let bytes = bytes(&words);
                let len = buffer.row_len();

                for (b, h) in buffer.rows().zip(host.rows()) {
                    let row = &bytes[src.offset + b..src.offset + b + len];
                    unsafe { core::ptr::copy_nonoverlapping(row.as_ptr(), dst.0.add(h), len) }
                }
            },

            Self::WriteRect { dst, buffer, host, src } => {
                let mut words = dst.storage.write();
                let bytes = bytes_mut(&mut words);
                let len = buffer.row_len();

                for (b, h) in buffer.rows().zip(host.rows()) {
                    let row = &mut bytes[dst.offset + b..dst.offset + b + len];
                    unsafe { core::ptr::copy_nonoverlapping(src.0.add(h) as *const u8, row.as_mut_ptr(), len) }
                }
            },

            Self::CopyRect { src, dst, src_layout, dst_layout } => {
                copy_rows(&src, &dst, src_layout.rows().zip(dst_layout.rows()), src_layout.row_len())
            },

            Self::Kernel(launch) => launch.execute(),
            Self::Marker => {}
        }

        Ok(())
    }
}

/// Copies `len` bytes for every `(src, dst)` pair of row offsets. Distinct storages are locked in
/// id order.
fn copy_rows (src: &Span, dst: &Span, rows: impl Iterator<Item = (usize, usize)>, len: usize) {
    if Arc::ptr_eq(&src.storage, &dst.storage) {
        let mut words = dst.storage.write();
        let bytes = bytes_mut(&mut words);
        for (s, d) in rows {
            bytes.copy_within(src.offset + s..src.offset + s + len, dst.offset + d);
        }
        return
    }

    let (src_words, mut dst_words) = if src.storage.id < dst.storage.id {
        let s = src.storage.read();
        (s, dst.storage.write())
    } else {
        let d = dst.storage.write();
        (src.storage.read(), d)
    };

    let from = bytes(&src_words);
    let to = bytes_mut(&mut dst_words);
    for (s, d) in rows {
        to[dst.offset + d..dst.offset + d + len].copy_from_slice(&from[src.offset + s..src.offset + s + len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span (storage: &Arc<Storage>, offset: usize) -> Span {
        Span { storage: storage.clone(), offset }
    }

    #[test]
    fn copy_within_one_storage() {
        let storage = Arc::new(Storage::with_contents(1, &[1, 2, 3, 4, 0, 0, 0, 0]).unwrap());
        let cmd = Command::Copy { src: span(&storage, 0), dst: span(&storage, 4), len: 4 };
        cmd.execute().unwrap();
        assert_eq!(&bytes(&storage.read())[..8], &[1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn rect_read_scatters_rows() {
        let storage = Arc::new(Storage::with_contents(1, &[1, 2, 3, 4, 5, 6]).unwrap());
        let buffer = RectLayout::resolve([1, 0, 0], [2, 2, 1], 3, 0).unwrap();
        let host = RectLayout::resolve([0, 0, 0], [2, 2, 1], 4, 0).unwrap();

        let mut dst = [0u8; 6];
        let cmd = Command::ReadRect { src: span(&storage, 0), buffer, host, dst: SendPtr(dst.as_mut_ptr()) };
        cmd.execute().unwrap();
        assert_eq!(dst, [2, 3, 0, 0, 5, 6]);
    }
}
