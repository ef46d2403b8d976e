//! Error types for arithmetic decoding.
//!
//! This module provides the [`DecodeError`] type which covers everything that
//! can go wrong while pulling symbols out of an arithmetic-coded stream.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Domain | [`ZeroTotalFrequency`], [`ProbeOutOfRange`], [`CumulativeFrequencyOutOfRange`], [`ModelDesync`] | Corrupt stream or model out of sync with the encoder |
//! | Exhaustion | [`StreamExhausted`] | Not enough bits left for a probe |
//! | Cursor | [`InvalidSeek`] | Rewind to a position outside the data |
//! | Values | [`ValueOutOfRange`] | Decoded value does not fit the requested width |
//! | Terminal | [`StreamFailed`] | The decoder already hit a fatal error |
//!
//! Decoding is strictly sequential: once a domain or exhaustion error is
//! returned the stream is dead and every later call yields [`StreamFailed`].
//!
//! ## Example
//!
//! ```rust
//! use u3d_arith::{ArithmeticDecoder, Context, DecodeError};
//!
//! let mut decoder = ArithmeticDecoder::new(&[0x00]);
//! match decoder.decode_symbol(Context::BYTE) {
//!     Err(e) if e.is_exhausted() => {}
//!     other => panic!("unexpected: {:?}", other),
//! }
//! assert!(matches!(decoder.read_u8(), Err(DecodeError::StreamFailed)));
//! ```
//!
//! [`ZeroTotalFrequency`]: DecodeError::ZeroTotalFrequency
//! [`ProbeOutOfRange`]: DecodeError::ProbeOutOfRange
//! [`CumulativeFrequencyOutOfRange`]: DecodeError::CumulativeFrequencyOutOfRange
//! [`ModelDesync`]: DecodeError::ModelDesync
//! [`StreamExhausted`]: DecodeError::StreamExhausted
//! [`InvalidSeek`]: DecodeError::InvalidSeek
//! [`ValueOutOfRange`]: DecodeError::ValueOutOfRange
//! [`StreamFailed`]: DecodeError::StreamFailed

use std::fmt;

use crate::arith::Context;

/// Error type for decoding operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The cursor cannot supply the bits a read or probe requires.
    StreamExhausted {
        /// Absolute bit position of the first requested bit.
        position: u64,
        /// Number of bits requested.
        requested: u32,
        /// Total number of bits in the stream.
        available: u64,
    },

    /// The model reports an empty table for the context.
    ZeroTotalFrequency {
        /// Context that was queried.
        context: Context,
    },

    /// The 16-bit probe fell outside the active `[low, high]` interval.
    ProbeOutOfRange {
        /// The probed code window.
        code: u32,
        /// Current lower bound.
        low: u16,
        /// Current upper bound.
        high: u16,
    },

    /// The probe mapped to a cumulative frequency outside `[0, total)`.
    ///
    /// The mapping keeps `cf < total` for every probe inside `[low, high]`,
    /// so this is an internal consistency check rather than a stream error
    /// callers should expect.
    CumulativeFrequencyOutOfRange {
        /// Context that was queried.
        context: Context,
        /// Mapped cumulative frequency.
        cumulative: u32,
        /// Total frequency of the context.
        total: u32,
    },

    /// The model returned a symbol whose range does not contain the mapped
    /// cumulative frequency, or whose range is empty.
    ModelDesync {
        /// Context that was queried.
        context: Context,
        /// Symbol returned by the model.
        symbol: u32,
        /// Mapped cumulative frequency.
        cumulative: u32,
    },

    /// A seek targeted a position past the end of the data.
    InvalidSeek {
        /// Requested absolute bit position.
        position: u64,
        /// Stream length in bits.
        length: u64,
    },

    /// A compressed read produced a value wider than the requested type.
    ValueOutOfRange {
        /// Decoded value.
        value: u32,
        /// Largest value the requested type holds.
        max: u32,
    },

    /// The decoder hit a fatal error earlier and can no longer be used.
    StreamFailed,
}

impl DecodeError {
    /// Whether this error signals a corrupt stream or a desynchronized model.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Self::ZeroTotalFrequency { .. }
                | Self::ProbeOutOfRange { .. }
                | Self::CumulativeFrequencyOutOfRange { .. }
                | Self::ModelDesync { .. }
        )
    }

    /// Whether this error signals that the stream ran out of bits.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::StreamExhausted { .. })
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamExhausted {
                position,
                requested,
                available,
            } => write!(
                f,
                "Stream exhausted: {} bits requested at bit {} (stream has {} bits)",
                requested, position, available
            ),
            Self::ZeroTotalFrequency { context } => {
                write!(f, "Zero total frequency in context {}", context)
            }
            Self::ProbeOutOfRange { code, low, high } => write!(
                f,
                "Probe 0x{:04x} outside interval [0x{:04x}, 0x{:04x}]",
                code, low, high
            ),
            Self::CumulativeFrequencyOutOfRange {
                context,
                cumulative,
                total,
            } => write!(
                f,
                "Cumulative frequency {} out of range (total {}) in context {}",
                cumulative, total, context
            ),
            Self::ModelDesync {
                context,
                symbol,
                cumulative,
            } => write!(
                f,
                "Model desync in context {}: symbol {} does not cover cumulative frequency {}",
                context, symbol, cumulative
            ),
            Self::InvalidSeek { position, length } => {
                write!(f, "Invalid seek: bit {} (stream length: {} bits)", position, length)
            }
            Self::ValueOutOfRange { value, max } => {
                write!(f, "Decoded value {} exceeds maximum {}", value, max)
            }
            Self::StreamFailed => write!(f, "Stream already failed"),
        }
    }
}

impl std::error::Error for DecodeError {}

pub type Result<T> = std::result::Result<T, DecodeError>;
