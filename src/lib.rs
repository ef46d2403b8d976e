//! Adaptive arithmetic decoder for U3D scene streams.
//!
//! U3D compresses mesh, point-set and animation data with an order-0
//! arithmetic coder working at 16-bit precision. Every value is read through
//! a context that selects an adaptive frequency histogram, a uniform static
//! table, or the raw byte table.
//!
//! ## Features
//! - Bit-exact 16-bit range narrowing with underflow deferral
//! - Adaptive per-context histograms with escape coding and rescaling
//! - Peek-then-commit bit cursor over borrowed data
//! - Structured logging through `tracing`
//!
//! ## Example
//!
//! ```rust
//! use u3d_arith::{ArithmeticDecoder, Context};
//!
//! // With a fresh interval, the byte context passes raw bytes through.
//! let data = [0x2a, 0x00, 0x00, 0x00];
//! let mut decoder = ArithmeticDecoder::new(&data);
//! assert_eq!(decoder.read_u8().unwrap(), 0x2a);
//! assert_eq!(decoder.data_bit_offset(), 8);
//!
//! let ctx = Context::dynamic(1).unwrap();
//! assert!(ctx.is_dynamic());
//! ```

pub mod arith;
pub mod error;

pub use arith::{
    ArithmeticDecoder, BitCursor, Context, ContextKind, ContextManager, DecoderState,
    FrequencyModel, ModelConfig,
};
pub use error::{DecodeError, Result};
