//! The line index: translates raw buffer edits into line-node operations.
//!
//! The index never stores text. It mirrors the line structure of a character
//! buffer owned elsewhere, reading individual bytes back through
//! [`TextSource`] to classify delimiters. Edits are reconciled *after* the
//! raw buffer has been mutated: `insert`/`delete` describe what just
//! happened, and the index updates its tree to match.

use std::ops::Range;

use crate::newline::{line_breaks, next_line_break, CARRIAGE_RETURN, LINE_FEED};
use crate::tree::{LineId, LineTree};

/// Access to the character storage the index describes, plus structural
/// change notifications.
///
/// `byte_at` must reflect the storage *after* the edit currently being
/// reconciled. The notification hooks default to no-ops; implement them to
/// keep per-line caches (layout, highlighting, diagnostics) in sync without
/// rebuilding on every keystroke. They fire synchronously, once per
/// structural change, in the order changes occur; pure length changes do
/// not notify. The `LineId` passed to `line_removed` is already stale and
/// is only useful as a cache key.
pub trait TextSource {
    /// Byte at an absolute buffer offset. Only called with in-bounds
    /// offsets.
    fn byte_at(&self, offset: usize) -> u8;

    /// A line was inserted into the index.
    fn line_inserted(&mut self, line: LineId) {
        let _ = line;
    }

    /// A line was removed from the index.
    fn line_removed(&mut self, line: LineId) {
        let _ = line;
    }
}

/// Snapshot of one line's geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line {
    /// Byte offset of the line's first byte.
    pub start: usize,
    /// 0-based line number.
    pub row: usize,
    /// Full length including the delimiter.
    pub total_length: usize,
    /// Length of the trailing delimiter: 0, 1 or 2.
    pub delimiter_length: usize,
}

impl Line {
    /// Length of the line's content, excluding the delimiter.
    pub fn content_length(&self) -> usize {
        self.total_length - self.delimiter_length
    }

    /// Byte offset just past the line, delimiter included.
    pub fn end(&self) -> usize {
        self.start + self.total_length
    }
}

/// A resolved buffer offset: the line containing it and the position within.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinePosition {
    pub line: LineId,
    /// Byte offset of the containing line's first byte.
    pub line_start: usize,
    /// 0-based line number.
    pub row: usize,
    /// Offset within the line.
    pub column: usize,
    /// Full length of the containing line, delimiter included.
    pub total_length: usize,
    pub delimiter_length: usize,
}

/// Order-statistics index over the lines of a mutable text buffer.
///
/// Lines exactly partition the buffer at all times: the sum of line lengths
/// equals the buffer length, and a final (possibly empty) line with no
/// delimiter is always present. A fresh index describes an empty buffer:
/// one line of length zero.
pub struct LineIndex {
    tree: LineTree,
}

impl LineIndex {
    pub fn new() -> Self {
        let mut tree = LineTree::new();
        tree.insert_first(0);
        Self { tree }
    }

    /// Returns the index to the empty-buffer state: a single line of length
    /// zero. Outstanding handles become stale. Does not notify.
    pub fn reset(&mut self) {
        self.tree.clear();
        self.tree.insert_first(0);
    }

    /// Replaces the whole index with the line structure of `text`, for
    /// loading a document in one pass instead of per-edit reconciliation.
    /// Outstanding handles become stale. Does not notify.
    pub fn rebuild(&mut self, text: &str) {
        let bytes = text.as_bytes();
        self.tree.clear();
        let mut prev = None;
        let mut start = 0;
        for brk in line_breaks(bytes) {
            let slot = match prev {
                None => self.tree.insert_first(brk.end() - start),
                Some(p) => self.tree.insert_after(p, brk.end() - start),
            };
            self.tree.set_delimiter_length(slot, brk.len as u8);
            start = brk.end();
            prev = Some(slot);
        }
        let tail = bytes.len() - start;
        let last = match prev {
            None => self.tree.insert_first(tail),
            Some(p) => self.tree.insert_after(p, tail),
        };
        self.tree.set_delimiter_length(last, 0);
    }

    // === Queries ===

    /// Number of lines. Always at least 1.
    pub fn line_count(&self) -> usize {
        self.tree.len()
    }

    /// Total buffer length described by the index: the sum of all line
    /// lengths.
    pub fn byte_count(&self) -> usize {
        self.tree.total_length()
    }

    /// The line whose half-open span contains `offset`, or the last line for
    /// `offset == byte_count()`. `None` when out of bounds.
    pub fn line_containing(&self, offset: usize) -> Option<LineId> {
        if offset > self.byte_count() {
            return None;
        }
        let (slot, _) = self.tree.node_containing(offset);
        Some(self.tree.id_of(slot))
    }

    /// The line at a 0-based line number, or `None` when out of bounds.
    pub fn line_at_row(&self, row: usize) -> Option<LineId> {
        self.tree.node_at_row(row).map(|slot| self.tree.id_of(slot))
    }

    pub fn first_line(&self) -> LineId {
        self.tree.id_of(self.tree.first())
    }

    pub fn last_line(&self) -> LineId {
        self.tree.id_of(self.tree.last())
    }

    /// Resolves `offset` to its containing line, line number and column in a
    /// single descent. `None` when out of bounds.
    pub fn line_position(&self, offset: usize) -> Option<LinePosition> {
        let pos = self.tree.position_at(offset)?;
        Some(LinePosition {
            line: self.tree.id_of(pos.slot),
            line_start: pos.line_start,
            row: pos.row,
            column: pos.column,
            total_length: self.tree.total_length_of(pos.slot),
            delimiter_length: self.tree.delimiter_length_of(pos.slot) as usize,
        })
    }

    /// Current geometry of a line. Panics if the handle is stale.
    pub fn line(&self, id: LineId) -> Line {
        let slot = self.tree.resolve(id);
        Line {
            start: self.tree.location(slot),
            row: self.tree.row(slot),
            total_length: self.tree.total_length_of(slot),
            delimiter_length: self.tree.delimiter_length_of(slot) as usize,
        }
    }

    // === Edits ===

    /// Reconciles the index after `text` was inserted at byte offset `pos`.
    /// The [`TextSource`] must already reflect the inserted text.
    pub fn insert<S: TextSource>(&mut self, source: &mut S, text: &str, pos: usize) {
        let bytes = text.as_bytes();
        if bytes.is_empty() {
            return;
        }
        let mut line = self.tree.node_containing(pos).0;
        let mut line_start = self.tree.location(line);
        debug_assert!(pos <= line_start + self.tree.total_length_of(line));
        if pos > line_start + self.content_length_of(line) {
            // The insertion point bisects a \r\n pair. Shrink the line to end
            // at the \r and give the severed \n a line of its own; the scan
            // below and delimiter reclassification take it from there.
            let total = self.tree.total_length_of(line);
            self.set_length(source, line, total - 1);
            line = self.insert_line(source, 1, line);
            line = self.set_length(source, line, 1);
        }
        match next_line_break(bytes, 0) {
            None => {
                // Everything stays on one line.
                let total = self.tree.total_length_of(line);
                self.set_length(source, line, total + bytes.len());
            }
            Some(first) => {
                let mut brk = first;
                let mut last_break_end = 0;
                loop {
                    // Absolute offset just past this break once inserted.
                    let break_end = pos + brk.end();
                    line_start = self.tree.location(line);
                    let remainder =
                        line_start + self.tree.total_length_of(line) - (pos + last_break_end);
                    line = self.set_length(source, line, break_end - line_start);
                    let new_line = self.insert_line(source, remainder, line);
                    line = self.set_length(source, new_line, remainder);
                    last_break_end = brk.end();
                    match next_line_break(bytes, last_break_end) {
                        Some(next) => brk = next,
                        None => break,
                    }
                }
                if last_break_end != bytes.len() {
                    // Trailing text with no break extends the last line.
                    let total = self.tree.total_length_of(line);
                    self.set_length(source, line, total + bytes.len() - last_break_end);
                }
            }
        }
    }

    /// Reconciles the index after `range` was deleted from the buffer. The
    /// [`TextSource`] must already reflect the deletion. No-op on an empty
    /// range.
    pub fn delete<S: TextSource>(&mut self, source: &mut S, range: Range<usize>) {
        assert!(range.start <= range.end, "inverted range");
        let pos = range.start;
        let mut len = range.end - range.start;
        loop {
            if len == 0 {
                return;
            }
            let start_line = self.tree.node_containing(pos).0;
            let start = self.tree.location(start_line);
            let total = self.tree.total_length_of(start_line);
            if pos > start + self.content_length_of(start_line) {
                // The deletion begins between the bytes of a \r\n pair:
                // drop the line's severed half and retry with the rest.
                self.set_length(source, start_line, total - 1);
                len -= 1;
                continue;
            }
            if pos + len < start + total {
                // The range stays within the start line.
                self.set_length(source, start_line, total - len);
            } else {
                // The start line's delimiter was consumed; lines merge.
                let removed_in_start = start + total - pos;
                debug_assert!(removed_in_start > 0);
                let end_line = self.tree.node_containing(pos + len).0;
                if end_line == start_line {
                    // The range runs to the end of the buffer.
                    self.set_length(source, start_line, total - len);
                } else {
                    let end_start = self.tree.location(end_line);
                    let end_total = self.tree.total_length_of(end_line);
                    let left_in_end = end_start + end_total - (pos + len);
                    // Remove every line after the start line through the end
                    // line, stepping to the successor before each removal.
                    let mut doomed = self.tree.next(start_line);
                    loop {
                        let is_end = doomed == end_line;
                        let next = if is_end { doomed } else { self.tree.next(doomed) };
                        self.remove_line(source, doomed);
                        if is_end {
                            break;
                        }
                        doomed = next;
                    }
                    let merged = total - removed_in_start + left_in_end;
                    self.set_length(source, start_line, merged);
                }
            }
            return;
        }
    }

    // === Internals ===

    fn content_length_of(&self, slot: u32) -> usize {
        self.tree.total_length_of(slot) - self.tree.delimiter_length_of(slot) as usize
    }

    fn insert_line<S: TextSource>(&mut self, source: &mut S, length: usize, after: u32) -> u32 {
        let slot = self.tree.insert_after(after, length);
        source.line_inserted(self.tree.id_of(slot));
        slot
    }

    fn remove_line<S: TextSource>(&mut self, source: &mut S, slot: u32) {
        let id = self.tree.id_of(slot);
        self.tree.remove(slot);
        source.line_removed(id);
    }

    /// Assigns a line's total length and re-derives its delimiter from the
    /// bytes now at its tail. Returns the authoritative line: when the new
    /// tail is a lone `\n` directly preceded by a `\r` in the previous line,
    /// the two halves belong to one `\r\n` delimiter and this line folds
    /// into the previous one. The fold can cascade, so it runs as a loop;
    /// each pass removes a line, which bounds it by the number of merged
    /// lines.
    fn set_length<S: TextSource>(&mut self, source: &mut S, slot: u32, length: usize) -> u32 {
        let mut line = slot;
        let mut new_length = length;
        loop {
            if new_length != self.tree.total_length_of(line) {
                self.tree.set_total_length(line, new_length);
                self.tree.update_after_changing_children(line);
            }
            if new_length == 0 {
                self.tree.set_delimiter_length(line, 0);
                return line;
            }
            let start = self.tree.location(line);
            let last = source.byte_at(start + new_length - 1);
            if last == CARRIAGE_RETURN {
                self.tree.set_delimiter_length(line, 1);
                return line;
            }
            if last != LINE_FEED {
                self.tree.set_delimiter_length(line, 0);
                return line;
            }
            if new_length >= 2 && source.byte_at(start + new_length - 2) == CARRIAGE_RETURN {
                self.tree.set_delimiter_length(line, 2);
                return line;
            }
            if new_length == 1 && start > 0 && source.byte_at(start - 1) == CARRIAGE_RETURN {
                // This line feed completes the previous line's \r\n.
                let previous = self.tree.previous(line);
                debug_assert!(!self.tree.is_nil(previous));
                let previous_length = self.tree.total_length_of(previous);
                self.remove_line(source, line);
                line = previous;
                new_length = previous_length + 1;
                continue;
            }
            self.tree.set_delimiter_length(line, 1);
            return line;
        }
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}
