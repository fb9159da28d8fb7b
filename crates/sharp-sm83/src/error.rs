//! Errors surfaced by instruction execution.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// A step that could not complete.
///
/// Both kinds abort the current instruction. PC has already advanced
/// past the fetched byte, so a caller may keep stepping from the
/// partial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    /// The fetched byte is one of the hardware-reserved opcodes with
    /// no defined behavior (0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC,
    /// 0xED, 0xF4, 0xFC, 0xFD).
    IllegalOpcode(u8),

    /// Decoder gap, carrying the opcode (extended to two bytes for
    /// CB-prefixed instructions). A complete build never constructs
    /// this; it exists so partial builds fail loudly.
    Unimplemented(u16),
}

impl Display for StepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalOpcode(opcode) => write!(f, "illegal opcode ${opcode:02X}"),
            Self::Unimplemented(opcode) => write!(f, "opcode not implemented: ${opcode:04X}"),
        }
    }
}

impl Error for StepError {}
