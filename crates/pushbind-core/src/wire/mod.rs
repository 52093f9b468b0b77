//! Wire format of the bind stream.
//!
//! Two layers, both reverse-engineered:
//! - Frames: an ASCII decimal character count on its own line, then exactly
//!   that many characters ([`FrameReader`]).
//! - Messages: nested bracketed arrays of strings, integers, and blanks
//!   ([`WireValue`], [`decode_message`]).
//!
//! All parsers are panic-free: malformed input is reported as
//! `ChannelError` instead of panicking or indexing raw buffers.

pub mod decoder;
pub mod frame;
pub mod value;

pub use decoder::decode_message;
pub use frame::FrameReader;
pub use value::{EntryKind, WireValue};
