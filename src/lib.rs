//! Order-statistics line index for text editors.
//!
//! Tracks which line every byte of a mutable text buffer belongs to, and
//! where every line starts, in O(log n) per query and per edit. Lines live
//! in a red-black tree augmented with subtree length and node count; edits
//! are translated into node length changes, insertions and removals,
//! including the splits and merges caused by edits landing in the middle of
//! a `\r\n` delimiter.
//!
//! The index stores no text. It reads bytes back from the owning buffer
//! through [`TextSource`], always *after* the raw edit has been applied:
//!
//! ```
//! use line_tree::{LineIndex, TextSource};
//!
//! struct Buffer(Vec<u8>);
//!
//! impl TextSource for Buffer {
//!     fn byte_at(&self, offset: usize) -> u8 {
//!         self.0[offset]
//!     }
//! }
//!
//! let mut buffer = Buffer(Vec::new());
//! let mut index = LineIndex::new();
//!
//! buffer.0.extend_from_slice(b"fn main() {\n}\n");
//! index.insert(&mut buffer, "fn main() {\n}\n", 0);
//!
//! assert_eq!(index.line_count(), 3);
//! let position = index.line_position(12).unwrap();
//! assert_eq!((position.row, position.column), (1, 0));
//! ```

mod index;
mod newline;
mod tree;

pub use index::{Line, LineIndex, LinePosition, TextSource};
pub use tree::LineId;
