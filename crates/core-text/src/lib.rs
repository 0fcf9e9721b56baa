//! Text primitives: permissive UTF-8, graphemes, case mapping, display
//! width, the growable byte/string container and the line arena.
//!
//! Everything here is free of editor state; the higher crates build
//! buffers, windows and commands on top of these types.

pub mod arena;
pub mod case;
pub mod grapheme;
pub mod strbuf;
pub mod utf8;
pub mod width;

pub use arena::{Line, LineArena, LineId};
pub use grapheme::{Grapheme, ZwClass, zerowidth_type};
pub use strbuf::{Discipline, StrBuf};
pub use utf8::{Codepoint, NOCHAR, decode, encode, next_offset, prev_offset};

/// Convert a raw codepoint into a printable `char`, substituting the
/// replacement character for values outside the scalar range.
pub fn to_char(cp: Codepoint) -> char {
    char::from_u32(cp).unwrap_or('\u{FFFD}')
}
