//! Core error types.
//!
//! Guest-visible memory and BIOS-call failures never surface as errors
//! (unmapped reads are zero, unknown calls are no-ops). The one typed error
//! lives between the BIOS image source and the mode selector, which
//! downgrades it to an HLE fallback and a log note.

use thiserror::Error;

/// BIOS image loading errors.
#[derive(Error, Debug)]
pub enum BiosError {
    #[error("I/O error reading BIOS image: {0}")]
    Io(#[from] std::io::Error),

    #[error("BIOS image truncated: expected {expected} bytes, read {actual}")]
    ShortRead { expected: usize, actual: usize },
}
