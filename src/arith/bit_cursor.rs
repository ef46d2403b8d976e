//! Bit cursor for arithmetic-coded streams.
//!
//! Reads bits MSB first from a big-endian byte slice. The position is kept
//! as a 32-bit word index plus a bit offset inside that word, so the offset
//! always stays in `[0, 32)`.

use crate::error::{DecodeError, Result};

/// Bits per bookkeeping word.
const WORD_BITS: u32 = 32;

/// Bit-addressable read cursor over borrowed data.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    /// Index of the current 32-bit word
    word_position: u64,
    /// Bits consumed within the current word
    bit_offset: u32,
}

impl<'a> BitCursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            word_position: 0,
            bit_offset: 0,
        }
    }

    /// Absolute bit position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.word_position * u64::from(WORD_BITS) + u64::from(self.bit_offset)
    }

    /// Stream length in bits.
    #[inline]
    pub fn len_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    /// Bits left between the position and the end of data.
    pub fn remaining_bits(&self) -> u64 {
        self.len_bits().saturating_sub(self.position())
    }

    /// Check if at end of data.
    pub fn is_eof(&self) -> bool {
        self.remaining_bits() == 0
    }

    pub fn word_position(&self) -> u64 {
        self.word_position
    }

    /// Bits consumed within the current word, always below 32.
    pub fn bit_offset(&self) -> u32 {
        self.bit_offset
    }

    /// Peek `count` bits (at most 32) starting `offset` bits past the
    /// position, MSB first. Does not move the cursor.
    pub fn peek_bits(&self, offset: u64, count: u32) -> Result<u32> {
        debug_assert!(count <= 32);
        if count == 0 {
            return Ok(0);
        }

        let start = self.position() + offset;
        let end = start + u64::from(count);
        if end > self.len_bits() {
            return Err(DecodeError::StreamExhausted {
                position: start,
                requested: count,
                available: self.len_bits(),
            });
        }

        // A 32-bit window starting mid-byte spans at most 5 bytes.
        let first = (start / 8) as usize;
        let last = end.div_ceil(8) as usize;
        let acc = self.data[first..last]
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));
        let trailing = last as u64 * 8 - end;
        let mask = (1u64 << count) - 1;
        Ok(((acc >> trailing) & mask) as u32)
    }

    /// Advance by `count` bits, flushing whole words out of the offset.
    pub fn commit(&mut self, count: u32) {
        let mut offset = u64::from(self.bit_offset) + u64::from(count);
        while offset >= u64::from(WORD_BITS) {
            offset -= u64::from(WORD_BITS);
            self.advance_word();
        }
        self.bit_offset = offset as u32;
    }

    /// Move the word cursor forward by one 32-bit unit.
    #[inline]
    pub fn advance_word(&mut self) {
        self.word_position += 1;
    }

    /// Read `count` bits (at most 32) and advance.
    pub fn read_bits(&mut self, count: u32) -> Result<u32> {
        let value = self.peek_bits(0, count)?;
        self.commit(count);
        Ok(value)
    }

    /// Read a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<u32> {
        self.read_bits(1)
    }

    /// Read 15 bits, MSB first.
    #[inline]
    pub fn read_15_bits(&mut self) -> Result<u32> {
        self.read_bits(15)
    }

    /// Rewind or advance to an absolute bit position within the data.
    pub fn seek_to(&mut self, position: u64) -> Result<()> {
        if position > self.len_bits() {
            return Err(DecodeError::InvalidSeek {
                position,
                length: self.len_bits(),
            });
        }
        self.word_position = position / u64::from(WORD_BITS);
        self.bit_offset = (position % u64::from(WORD_BITS)) as u32;
        Ok(())
    }
}
