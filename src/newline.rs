//! Line-break scanning over raw UTF-8 bytes.
//!
//! `\r`, `\n` and `\r\n` all terminate a line; a `\r\n` pair counts as one
//! break of length 2. Both bytes are ASCII and never occur inside a
//! multi-byte UTF-8 sequence, so byte-level scanning is exact.

use memchr::memchr2;

pub(crate) const CARRIAGE_RETURN: u8 = b'\r';
pub(crate) const LINE_FEED: u8 = b'\n';

/// A line break located in a byte slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LineBreak {
    /// Byte offset of the break's first byte.
    pub offset: usize,
    /// 1 for a lone `\r` or `\n`, 2 for `\r\n`.
    pub len: usize,
}

impl LineBreak {
    /// Byte offset just past the break.
    pub fn end(self) -> usize {
        self.offset + self.len
    }
}

/// First line break at or after `from`, if any.
pub(crate) fn next_line_break(bytes: &[u8], from: usize) -> Option<LineBreak> {
    let offset = memchr2(CARRIAGE_RETURN, LINE_FEED, &bytes[from..])? + from;
    let len = if bytes[offset] == CARRIAGE_RETURN && bytes.get(offset + 1) == Some(&LINE_FEED) {
        2
    } else {
        1
    };
    Some(LineBreak { offset, len })
}

/// All line breaks in `bytes`, in order.
pub(crate) fn line_breaks(bytes: &[u8]) -> impl Iterator<Item = LineBreak> + '_ {
    let mut from = 0;
    std::iter::from_fn(move || {
        let brk = next_line_break(bytes, from)?;
        from = brk.end();
        Some(brk)
    })
}
