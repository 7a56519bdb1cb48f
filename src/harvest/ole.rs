//! Printable-string carving for legacy OLE parts (`*.bin`).
//!
//! Embedded OLE objects keep link sources and printer settings as plain
//! strings inside an otherwise binary blob. The carver walks the bytes rune
//! by rune and yields runs of printable characters, much like `strings(1)`.

use std::iter::Fuse;

use crate::harvest::identity::extract_file_paths;

/// Shortest run worth reporting.
pub const MIN_RUN: usize = 6;

/// A run is cut and flushed once it reaches this many runes.
pub const MAX_RUN: usize = 256;

/// Runes below this value never break a run, printable or not.
const PRINTABLE_THRESHOLD: u32 = 0xFF;

/// Lazily carved string runs. Consumed once.
pub struct StringCarver<I: Iterator<Item = char>> {
    chars: Fuse<I>,
    run: String,
    run_len: usize,
    drained: bool,
}

impl<I: Iterator<Item = char>> StringCarver<I> {
    pub fn new(chars: I) -> Self {
        Self {
            chars: chars.fuse(),
            run: String::with_capacity(MAX_RUN),
            run_len: 0,
            drained: false,
        }
    }

    fn flush(&mut self) -> Option<String> {
        let len = std::mem::take(&mut self.run_len);
        let run = std::mem::take(&mut self.run);
        (len >= MIN_RUN).then_some(run)
    }
}

impl<I: Iterator<Item = char>> Iterator for StringCarver<I> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some(c) = self.chars.next() {
            if c as u32 >= PRINTABLE_THRESHOLD && !is_printable(c) {
                if let Some(run) = self.flush() {
                    return Some(run);
                }
                continue;
            }

            let full = if self.run_len >= MAX_RUN {
                self.flush()
            } else {
                None
            };
            self.run.push(c);
            self.run_len += 1;
            if full.is_some() {
                return full;
            }
        }

        if self.drained {
            return None;
        }
        self.drained = true;
        self.flush()
    }
}

/// Carves printable runs out of `bytes`.
///
/// Invalid UTF-8 decodes to one U+FFFD per offending byte, which counts as
/// printable.
pub fn carve_strings(bytes: &[u8]) -> StringCarver<impl Iterator<Item = char> + '_> {
    let chars = bytes.utf8_chunks().flat_map(|chunk| {
        chunk.valid().chars().chain(
            std::iter::repeat(char::REPLACEMENT_CHARACTER).take(chunk.invalid().len()),
        )
    });
    StringCarver::new(chars)
}

/// Local and UNC file paths referenced by an OLE part.
pub fn ole_file_paths(bytes: &[u8]) -> Vec<String> {
    carve_strings(bytes)
        .flat_map(|run| extract_file_paths(&run))
        .collect()
}

fn is_printable(c: char) -> bool {
    !c.is_control()
        && !c.is_whitespace()
        && !matches!(
            c,
            '\u{200B}'..='\u{200F}'
                | '\u{202A}'..='\u{202E}'
                | '\u{2060}'..='\u{206F}'
                | '\u{E000}'..='\u{F8FF}'
                | '\u{FEFF}'
                | '\u{FFF9}'..='\u{FFFB}'
                | '\u{FFFE}'..='\u{FFFF}'
        )
}

// ============================================================================
// Tests
// ============================================================================
