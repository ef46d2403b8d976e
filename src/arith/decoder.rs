//! 16-bit adaptive arithmetic decoder.
//!
//! Each call probes a 16-bit code window, maps it through the model to a
//! symbol, narrows `[low, high]` to that symbol's slice and renormalizes.
//! Bits are only committed once renormalization has resolved them; bits that
//! straddle the midpoint are deferred in `underflow` and committed together
//! with the next resolved bit.

use super::bit_cursor::BitCursor;
use super::context::{Context, ContextKind};
use super::model::{ContextManager, FrequencyModel, ModelConfig, ESCAPE_SYMBOL};
use crate::error::{DecodeError, Result};

/// Leading agreeing bits of two 4-bit nibbles, indexed by their XOR.
const LEADING_AGREEMENT: [u32; 16] = [4, 3, 2, 2, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0];

/// Masks clearing the `n` top bits of a 16-bit value.
const RESOLVED_MASK: [u16; 5] = [0xFFFF, 0x7FFF, 0x3FFF, 0x1FFF, 0x0FFF];

const TOP_BIT: u16 = 0x8000;
const SECOND_BIT: u16 = 0x4000;

/// Range state of one decode stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderState {
    low: u16,
    high: u16,
    /// Bits deferred across straddling renormalizations
    underflow: u32,
}

impl DecoderState {
    pub const fn new() -> Self {
        Self {
            low: 0,
            high: 0xFFFF,
            underflow: 0,
        }
    }

    pub fn low(&self) -> u16 {
        self.low
    }

    pub fn high(&self) -> u16 {
        self.high
    }

    pub fn underflow(&self) -> u32 {
        self.underflow
    }

    fn range(&self) -> u64 {
        u64::from(self.high - self.low) + 1
    }

    /// Map a probe onto `[0, total)`. `None` if the probe lies outside
    /// `[low, high]`.
    pub(crate) fn code_cumulative_frequency(&self, code: u32, total: u32) -> Option<u32> {
        if code < u32::from(self.low) || code > u32::from(self.high) {
            return None;
        }
        let offset = u64::from(code - u32::from(self.low)) + 1;
        let cf = (u64::from(total) * offset - 1) / self.range();
        Some(cf as u32)
    }

    /// Narrow to the slice `[cum, cum + freq)` of `total`. Leaves the state
    /// untouched and returns `false` if the slice is empty.
    pub(crate) fn narrow(&mut self, cum: u32, freq: u32, total: u32) -> bool {
        let range = self.range();
        let low = u64::from(self.low);
        let total = u64::from(total);
        let end = u64::from(cum) + u64::from(freq);

        let Some(new_high) = (low + range * end / total).checked_sub(1) else {
            return false;
        };
        let new_low = low + range * u64::from(cum) / total;
        if new_low > new_high || new_high > 0xFFFF {
            return false;
        }

        self.low = new_low as u16;
        self.high = new_high as u16;
        true
    }

    /// Shift out resolved bits and defer straddling ones. Returns the number
    /// of bits the cursor must commit.
    pub(crate) fn renormalize(&mut self) -> u32 {
        let mut low = self.low;
        let mut high = self.high;

        let nibbles = ((low >> 12) ^ (high >> 12)) & 0xF;
        let mut bits = LEADING_AGREEMENT[usize::from(nibbles)];
        let mask = RESOLVED_MASK[bits as usize];
        low = (low & mask) << bits;
        high = ((high & mask) << bits) | ((1u16 << bits) - 1);

        while (low ^ high) & TOP_BIT == 0 {
            low = (low & 0x7FFF) << 1;
            high = ((high & 0x7FFF) << 1) | 1;
            bits += 1;
        }

        let saved_low = low & TOP_BIT;
        let saved_high = high & TOP_BIT;

        if bits > 0 {
            bits += self.underflow;
            self.underflow = 0;
        }

        while low & SECOND_BIT != 0 && high & SECOND_BIT == 0 {
            low = (low & 0x3FFF) << 1;
            high = ((high & 0x3FFF) << 1) | 1;
            self.underflow += 1;
        }

        self.low = low | saved_low;
        self.high = high | saved_high;
        bits
    }
}

impl Default for DecoderState {
    fn default() -> Self {
        Self::new()
    }
}

/// Arithmetic decoder over a borrowed stream.
///
/// The decoder owns its cursor, range state and model. A fatal error ends
/// the stream: every later call returns [`DecodeError::StreamFailed`].
///
/// # Example
///
/// ```rust
/// use u3d_arith::{ArithmeticDecoder, Context};
///
/// let data = [0x12, 0x34, 0x56, 0x78, 0x00, 0x00];
/// let mut decoder = ArithmeticDecoder::new(&data);
/// assert_eq!(decoder.read_u16().unwrap(), 0x3412);
///
/// // A fresh dynamic context only holds the escape, so the value follows raw
/// // and is learned.
/// let ctx = Context::dynamic(1).unwrap();
/// assert_eq!(decoder.read_compressed_u8(ctx).unwrap(), 0x56);
/// assert!(decoder.model().contains(ctx, 0x57));
/// assert_eq!(decoder.cursor().position(), 24);
/// ```
#[derive(Debug)]
pub struct ArithmeticDecoder<'a, M = ContextManager> {
    cursor: BitCursor<'a>,
    model: M,
    state: DecoderState,
    symbols_decoded: u64,
    failed: bool,
}

impl<'a> ArithmeticDecoder<'a, ContextManager> {
    /// Create a decoder at the start of `data` with a fresh default model.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, ModelConfig::default())
    }

    pub fn with_config(data: &'a [u8], config: ModelConfig) -> Self {
        Self::with_model(BitCursor::new(data), ContextManager::with_config(config))
    }
}

impl<'a, M: FrequencyModel> ArithmeticDecoder<'a, M> {
    /// Create a decoder from a positioned cursor and any model.
    pub fn with_model(cursor: BitCursor<'a>, model: M) -> Self {
        Self {
            cursor,
            model,
            state: DecoderState::new(),
            symbols_decoded: 0,
            failed: false,
        }
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    pub fn cursor(&self) -> &BitCursor<'a> {
        &self.cursor
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Bits committed within the current 32-bit word.
    pub fn data_bit_offset(&self) -> u32 {
        self.cursor.bit_offset()
    }

    pub fn symbols_decoded(&self) -> u64 {
        self.symbols_decoded
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn into_parts(self) -> (BitCursor<'a>, M, DecoderState) {
        (self.cursor, self.model, self.state)
    }

    /// Decode one symbol from `context`.
    pub fn decode_symbol(&mut self, context: Context) -> Result<u32> {
        if self.failed {
            return Err(DecodeError::StreamFailed);
        }
        match self.step(context) {
            Ok(symbol) => {
                self.symbols_decoded += 1;
                Ok(symbol)
            }
            Err(e) => {
                tracing::warn!(
                    %context,
                    position = self.cursor.position(),
                    symbols = self.symbols_decoded,
                    error = %e,
                    "arithmetic stream failed"
                );
                self.failed = true;
                Err(e)
            }
        }
    }

    /// Peek the 16-bit code window: the next uncommitted bit, then 15 bits
    /// that follow the deferred underflow bits.
    fn probe(&self) -> Result<u32> {
        let first = self.cursor.peek_bits(0, 1)?;
        let rest = self
            .cursor
            .peek_bits(1 + u64::from(self.state.underflow), 15)?;
        Ok((first << 15) | rest)
    }

    fn step(&mut self, context: Context) -> Result<u32> {
        let code = self.probe()?;

        let total = self.model.total_frequency(context);
        if total == 0 {
            return Err(DecodeError::ZeroTotalFrequency { context });
        }

        let cumulative = self
            .state
            .code_cumulative_frequency(code, total)
            .ok_or(DecodeError::ProbeOutOfRange {
                code,
                low: self.state.low,
                high: self.state.high,
            })?;
        // Holds for any probe inside [low, high].
        if cumulative >= total {
            return Err(DecodeError::CumulativeFrequencyOutOfRange {
                context,
                cumulative,
                total,
            });
        }

        let symbol = self.model.symbol_for_cumulative_frequency(context, cumulative);
        let cum = self.model.cumulative_frequency(context, symbol);
        let freq = self.model.frequency(context, symbol);
        let desync = DecodeError::ModelDesync {
            context,
            symbol,
            cumulative,
        };
        let covers = cum <= cumulative && u64::from(cumulative) < u64::from(cum) + u64::from(freq);
        if freq == 0 || !covers || !self.state.narrow(cum, freq, total) {
            return Err(desync);
        }

        self.model.add_symbol(context, symbol);

        let bits = self.state.renormalize();
        self.cursor.commit(bits);

        tracing::trace!(
            %context,
            symbol,
            low = self.state.low,
            high = self.state.high,
            underflow = self.state.underflow,
            bits,
            "decoded symbol"
        );
        Ok(symbol)
    }

    /// Read a raw byte through the uniform byte context.
    pub fn read_u8(&mut self) -> Result<u8> {
        let symbol = self.decode_symbol(Context::BYTE)?;
        narrow_value(symbol.wrapping_sub(1), u8::MAX.into()).map(|v| v as u8)
    }

    /// Read a raw little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        let low = self.read_u8()?;
        let high = self.read_u8()?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Read a raw `u32`, low half first.
    pub fn read_u32(&mut self) -> Result<u32> {
        let low = self.read_u16()?;
        let high = self.read_u16()?;
        Ok(u32::from(low) | (u32::from(high) << 16))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_u32().map(|v| v as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_u32().map(f32::from_bits)
    }

    /// Read a value coded in `context`.
    ///
    /// Dynamic contexts decode symbol `v + 1` for value `v`; the escape symbol
    /// is followed by the raw value, which is then added to the histogram.
    /// Uniform contexts decode `v + 1` directly. Any other context reads the
    /// raw value.
    pub fn read_compressed_u32(&mut self, context: Context) -> Result<u32> {
        self.read_compressed(context, Self::read_u32)
    }

    pub fn read_compressed_u16(&mut self, context: Context) -> Result<u16> {
        let value = self.read_compressed(context, |d| d.read_u16().map(u32::from))?;
        narrow_value(value, u16::MAX.into()).map(|v| v as u16)
    }

    pub fn read_compressed_u8(&mut self, context: Context) -> Result<u8> {
        let value = self.read_compressed(context, |d| d.read_u8().map(u32::from))?;
        narrow_value(value, u8::MAX.into()).map(|v| v as u8)
    }

    fn read_compressed(
        &mut self,
        context: Context,
        raw: impl FnOnce(&mut Self) -> Result<u32>,
    ) -> Result<u32> {
        match context.kind() {
            ContextKind::Dynamic(_) => {
                let symbol = self.decode_symbol(context)?;
                if symbol != ESCAPE_SYMBOL {
                    return Ok(symbol - 1);
                }
                let value = raw(self)?;
                tracing::debug!(%context, value, "escaped value");
                if let Some(symbol) = value.checked_add(1) {
                    self.model.add_symbol(context, symbol);
                }
                Ok(value)
            }
            ContextKind::Uniform(_) => {
                let symbol = self.decode_symbol(context)?;
                Ok(symbol.saturating_sub(1))
            }
            ContextKind::Byte | ContextKind::Unsupported => raw(self),
        }
    }
}

fn narrow_value(value: u32, max: u32) -> Result<u32> {
    if value > max {
        return Err(DecodeError::ValueOutOfRange { value, max });
    }
    Ok(value)
}
