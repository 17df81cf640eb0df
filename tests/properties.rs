//! Randomized edit scripts checked against a reference tokenizer.
//!
//! The model is a plain `Vec<u8>`; every edit is applied to the model first
//! and then reconciled into the index. After each step the index must agree
//! with an independent split of the model into CRLF/CR/LF-terminated lines.

use proptest::prelude::*;

use line_tree::{LineIndex, TextSource};

struct Buffer {
    bytes: Vec<u8>,
}

impl TextSource for Buffer {
    fn byte_at(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }
}

/// Splits `bytes` into (total_length, delimiter_length) lines the slow,
/// obvious way. The final line is always present, possibly empty.
fn reference_lines(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push((i + 1 - start, 1));
                i += 1;
                start = i;
            }
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    lines.push((i + 2 - start, 2));
                    i += 2;
                } else {
                    lines.push((i + 1 - start, 1));
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }
    lines.push((bytes.len() - start, 0));
    lines
}

fn indexed_lines(index: &LineIndex) -> Vec<(usize, usize)> {
    (0..index.line_count())
        .map(|row| {
            let line = index.line(index.line_at_row(row).unwrap());
            (line.total_length, line.delimiter_length)
        })
        .collect()
}

/// Full agreement between index and model: line structure, aggregate sums
/// and both offset projections.
fn check_consistency(index: &LineIndex, model: &[u8]) {
    assert_eq!(index.byte_count(), model.len());
    assert_eq!(indexed_lines(index), reference_lines(model));
    assert_eq!(index.first_line(), index.line_at_row(0).unwrap());
    assert_eq!(
        index.last_line(),
        index.line_at_row(index.line_count() - 1).unwrap()
    );

    let mut start = 0;
    for row in 0..index.line_count() {
        let id = index.line_at_row(row).unwrap();
        let line = index.line(id);
        assert_eq!(line.row, row);
        assert_eq!(line.start, start);
        assert!(line.delimiter_length <= line.total_length);
        if row + 1 < index.line_count() {
            assert!(line.delimiter_length >= 1);
        }
        start = line.end();
    }

    for offset in 0..=model.len() {
        let position = index.line_position(offset).unwrap();
        assert_eq!(position.line_start + position.column, offset);
        assert_eq!(index.line_containing(offset), Some(position.line));
        let line = index.line(position.line);
        assert_eq!(line.start, position.line_start);
        assert_eq!(line.row, position.row);
        // Half-open containment, except the end of the buffer which belongs
        // to the last line.
        if offset < model.len() {
            assert!(offset >= line.start && offset < line.end());
        }
    }
    assert!(index.line_position(model.len() + 1).is_none());
}

#[derive(Clone, Debug)]
enum Op {
    Insert { at: usize, text: String },
    Delete { at: usize, len: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Delimiter-heavy alphabet so \r\n splits and merges happen constantly.
    let text = proptest::collection::vec(
        prop_oneof![
            Just('\r'),
            Just('\n'),
            Just('a'),
            Just('b'),
            Just('é'),
        ],
        0..12,
    )
    .prop_map(|chars| chars.into_iter().collect::<String>());
    prop_oneof![
        (any::<prop::sample::Index>(), text)
            .prop_map(|(at, text)| Op::Insert { at: at.index(usize::MAX), text }),
        (any::<prop::sample::Index>(), any::<prop::sample::Index>())
            .prop_map(|(at, len)| Op::Delete {
                at: at.index(usize::MAX),
                len: len.index(usize::MAX),
            }),
    ]
}

fn is_continuation(byte: u8) -> bool {
    (byte & 0b1100_0000) == 0b1000_0000
}

fn apply(index: &mut LineIndex, buffer: &mut Buffer, op: &Op) {
    match op {
        Op::Insert { at, text } => {
            // Clamp to a char boundary of the model so the buffer stays
            // plausible text; delimiter handling is what is under test, not
            // unicode segmentation.
            let mut pos = at % (buffer.bytes.len() + 1);
            while pos < buffer.bytes.len() && is_continuation(buffer.bytes[pos]) {
                pos -= 1;
            }
            buffer.bytes.splice(pos..pos, text.bytes());
            index.insert(buffer, text, pos);
        }
        Op::Delete { at, len } => {
            let mut start = at % (buffer.bytes.len() + 1);
            while start < buffer.bytes.len() && is_continuation(buffer.bytes[start]) {
                start -= 1;
            }
            let mut end = start + len % (buffer.bytes.len() - start + 1);
            while end < buffer.bytes.len() && is_continuation(buffer.bytes[end]) {
                end += 1;
            }
            buffer.bytes.drain(start..end);
            index.delete(buffer, start..end);
        }
    }
}

proptest! {
    #[test]
    fn random_edit_scripts_agree_with_the_reference(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut index = LineIndex::new();
        let mut buffer = Buffer { bytes: Vec::new() };
        for op in &ops {
            apply(&mut index, &mut buffer, op);
            check_consistency(&index, &buffer.bytes);
        }
    }

    #[test]
    fn rebuild_agrees_with_the_reference(text in "[ab\\r\\né]{0,64}") {
        let mut index = LineIndex::new();
        index.rebuild(&text);
        check_consistency(&index, text.as_bytes());
    }

    #[test]
    fn single_insert_into_loaded_document(
        text in "[ab\\r\\n]{0,32}",
        insert in "[ab\\r\\n]{0,8}",
        at in any::<prop::sample::Index>(),
    ) {
        let mut index = LineIndex::new();
        index.rebuild(&text);
        let mut buffer = Buffer { bytes: text.into_bytes() };
        let pos = at.index(buffer.bytes.len() + 1);
        buffer.bytes.splice(pos..pos, insert.bytes());
        index.insert(&mut buffer, &insert, pos);
        check_consistency(&index, &buffer.bytes);
    }

    #[test]
    fn pathological_cr_runs_then_lf_runs(crs in 0usize..6, lfs in 0usize..6, cut in any::<prop::sample::Index>()) {
        // A buffer of all \r then all \n exercises the delimiter-merge
        // cascade; delete one byte from an arbitrary position afterwards.
        let text: String = "\r".repeat(crs) + &"\n".repeat(lfs);
        let mut index = LineIndex::new();
        let mut buffer = Buffer { bytes: Vec::new() };
        buffer.bytes.extend_from_slice(text.as_bytes());
        index.insert(&mut buffer, &text, 0);
        check_consistency(&index, &buffer.bytes);

        if !buffer.bytes.is_empty() {
            let at = cut.index(buffer.bytes.len());
            buffer.bytes.remove(at);
            index.delete(&mut buffer, at..at + 1);
            check_consistency(&index, &buffer.bytes);
        }
    }
}
