//! Arithmetic decoding primitives.
//!
//! This module provides the order-0 adaptive arithmetic decoder used by U3D
//! scene streams, together with the cursor it reads from and the frequency
//! model it consults.
//!
//! ## Components
//!
//! | Type | Role |
//! |------|------|
//! | [`BitCursor`] | Big-endian, MSB-first bit source with peek/commit |
//! | [`Context`] | Selects a frequency table |
//! | [`FrequencyModel`] | Cumulative-frequency contract the decoder queries |
//! | [`ContextManager`] | Adaptive histograms plus static byte/uniform tables |
//! | [`ArithmeticDecoder`] | Range narrowing, renormalization, value readers |
//!
//! ## Architecture
//!
//! ```text
//!   caller ── decode_symbol(ctx) ──┐
//!                                  ↓
//! ┌─────────────┐  peek 16   ┌──────────────┐  total / cf / add  ┌──────────────┐
//! │ BitCursor   │ ─────────→ │ Decoder      │ ←────────────────→ │ ContextManager│
//! │             │ ←───────── │ [low, high]  │                    │              │
//! └─────────────┘  commit n  └──────────────┘                    └──────────────┘
//!                                  ↓
//!                               symbol
//! ```
//!
//! ## Numeric Precision
//!
//! `low` and `high` are exact 16-bit values. After renormalization the
//! interval always spans more than `0x4000` codes, and the model keeps every
//! total at or below [`MAX_TOTAL_FREQUENCY`], so no symbol ever maps to an
//! empty slice.

mod bit_cursor;
mod context;
mod decoder;
mod model;

#[cfg(test)]
mod tests;

pub use bit_cursor::BitCursor;
pub use context::{Context, ContextKind, MAX_RANGE, MAX_UNIFORM_SIZE, STATIC_FULL};
pub use decoder::{ArithmeticDecoder, DecoderState};
pub use model::{
    ContextManager, FrequencyModel, ModelConfig, DEFAULT_MAX_SYMBOL, DEFAULT_RESCALE_THRESHOLD,
    ESCAPE_SYMBOL, MAX_TOTAL_FREQUENCY,
};
