//! ttt-protocol
//!
//! Wire-level encoding/decoding for the lobby protocol.
//!
//! The transport is newline-terminated UTF-8 text frames with
//! colon-delimited fields; the first field is the verb. This crate turns
//! raw socket bytes into logical `ttt_core` messages and back:
//!
//! - [`framing`]    : per-connection reassembly of fragmented reads
//! - [`line_codec`] : one validating parse step + response formatting

pub mod framing;
pub mod line_codec;

pub use framing::LineBuffer;
pub use line_codec::{format_line, parse_line, ParseError};
