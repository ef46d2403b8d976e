//! Stream-level decoder tests.
//!
//! Streams are produced by a mirror-image encoder that narrows with the same
//! integer rules and emits deferred bits the way U3D writers do.

use super::*;
use proptest::prelude::*;

/// MSB-first bit sink.
#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bits: u64,
}

impl BitWriter {
    fn push(&mut self, bit: u32) {
        if self.bits % 8 == 0 {
            self.bytes.push(0);
        }
        if bit != 0 {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.bits % 8);
        }
        self.bits += 1;
    }
}

/// Reference encoder mirroring the decoder's range rules.
struct Encoder {
    low: u32,
    high: u32,
    underflow: u32,
    out: BitWriter,
    model: ContextManager,
}

impl Encoder {
    fn new(config: ModelConfig) -> Self {
        Self {
            low: 0,
            high: 0xFFFF,
            underflow: 0,
            out: BitWriter::default(),
            model: ContextManager::with_config(config),
        }
    }

    fn emit(&mut self, bit: u32) {
        self.out.push(bit);
        for _ in 0..self.underflow {
            self.out.push(bit ^ 1);
        }
        self.underflow = 0;
    }

    fn encode(&mut self, context: Context, symbol: u32) {
        let total = u64::from(self.model.total_frequency(context));
        let cum = u64::from(self.model.cumulative_frequency(context, symbol));
        let freq = u64::from(self.model.frequency(context, symbol));
        assert!(freq > 0, "symbol {} not codable in {}", symbol, context);

        let range = u64::from(self.high - self.low) + 1;
        self.high = self.low + (range * (cum + freq) / total) as u32 - 1;
        self.low += (range * cum / total) as u32;
        self.model.add_symbol(context, symbol);

        loop {
            if (self.low ^ self.high) & 0x8000 == 0 {
                self.emit(self.low >> 15);
                self.low = (self.low & 0x7FFF) << 1;
                self.high = ((self.high & 0x7FFF) << 1) | 1;
            } else if self.low & 0x4000 != 0 && self.high & 0x4000 == 0 {
                self.underflow += 1;
                self.low = (self.low & 0x3FFF) << 1;
                self.high = ((self.high & 0x3FFF) << 1) | 0x8001;
            } else {
                break;
            }
        }
    }

    fn write_u8(&mut self, value: u8) {
        self.encode(Context::BYTE, u32::from(value) + 1);
    }

    fn write_u16(&mut self, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_u8(low);
        self.write_u8(high);
    }

    fn write_u32(&mut self, value: u32) {
        self.write_u16(value as u16);
        self.write_u16((value >> 16) as u16);
    }

    fn write_compressed_u32(&mut self, context: Context, value: u32) {
        match context.kind() {
            ContextKind::Dynamic(_) => {
                let symbol = value.checked_add(1);
                match symbol {
                    Some(s) if self.model.frequency(context, s) > 0 => self.encode(context, s),
                    _ => {
                        self.encode(context, ESCAPE_SYMBOL);
                        self.write_u32(value);
                        if let Some(s) = symbol {
                            self.model.add_symbol(context, s);
                        }
                    }
                }
            }
            ContextKind::Uniform(_) => self.encode(context, value + 1),
            ContextKind::Byte | ContextKind::Unsupported => self.write_u32(value),
        }
    }

    /// Flush the interval and pad so the last probe stays inside the data.
    fn finish(mut self) -> Vec<u8> {
        self.underflow += 1;
        self.emit((self.low >> 14) & 1);
        for _ in 0..32 {
            self.out.push(0);
        }
        self.out.bytes
    }
}

/// Deterministic xorshift for reproducible workloads.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 32) as u32
    }

    /// Skewed value: mostly small, occasionally large.
    fn skewed(&mut self) -> u32 {
        match self.next() % 16 {
            0 => self.next(),
            1..=3 => self.next() % 300,
            _ => self.next() % 6,
        }
    }
}

fn assert_invariants<M: FrequencyModel>(decoder: &ArithmeticDecoder<'_, M>) {
    assert!(decoder.state().low() <= decoder.state().high());
    assert!(decoder.data_bit_offset() < 32);
}

#[test]
fn test_known_vector_with_consecutive_underflow() {
    let ctx = Context::uniform(3).unwrap();

    let mut encoder = Encoder::new(ModelConfig::default());
    for symbol in [2, 2, 1] {
        encoder.encode(ctx, symbol);
    }
    assert_eq!(encoder.finish(), [0x74, 0x00, 0x00, 0x00, 0x00]);

    let data = [0x74, 0x00, 0x00, 0x00];
    let mut decoder = ArithmeticDecoder::new(&data);

    assert_eq!(decoder.decode_symbol(ctx).unwrap(), 2);
    assert_eq!(decoder.state().underflow(), 1);
    assert_eq!(decoder.cursor().position(), 0);

    assert_eq!(decoder.decode_symbol(ctx).unwrap(), 2);
    assert_eq!(decoder.state().underflow(), 3);
    assert_eq!(
        (decoder.state().low(), decoder.state().high()),
        (0x0E34, 0xF1BF)
    );
    assert_eq!(decoder.cursor().position(), 0);

    // Resolving bit plus the three deferred ones.
    assert_eq!(decoder.decode_symbol(ctx).unwrap(), 1);
    assert_eq!(decoder.state().underflow(), 0);
    assert_eq!(
        (decoder.state().low(), decoder.state().high()),
        (0x1C68, 0xB419)
    );
    assert_eq!(decoder.data_bit_offset(), 4);
}

#[test]
fn test_adversarial_midpoint_straddles() {
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    let contexts = [Context::uniform(3).unwrap(), Context::uniform(5).unwrap()];
    let mut expected = Vec::new();
    let mut encoder = Encoder::new(ModelConfig::default());

    for round in 0..400 {
        let ctx = contexts[round % 2];
        let middle = if round % 2 == 0 { 2 } else { 3 };
        // Runs of middle symbols keep the interval straddling 0x8000.
        for _ in 0..(rng.next() % 6) {
            encoder.encode(ctx, middle);
            expected.push((ctx, middle));
        }
        let size = if round % 2 == 0 { 3 } else { 5 };
        let tail = 1 + rng.next() % size;
        encoder.encode(ctx, tail);
        expected.push((ctx, tail));
    }
    let data = encoder.finish();

    let mut decoder = ArithmeticDecoder::new(&data);
    let mut max_underflow = 0;
    for &(ctx, symbol) in &expected {
        assert_eq!(decoder.decode_symbol(ctx).unwrap(), symbol);
        assert_invariants(&decoder);
        max_underflow = max_underflow.max(decoder.state().underflow());
    }
    assert!(max_underflow >= 3);
}

#[test]
fn test_long_mixed_round_trip() {
    let mut rng = XorShift(42);
    let dynamic: Vec<Context> = (1..=4).map(|i| Context::dynamic(i).unwrap()).collect();
    let uniform = Context::uniform(1000).unwrap();

    #[derive(Debug)]
    enum Op {
        Compressed(Context, u32),
        Byte(u8),
        Half(u16),
        Float(f32),
    }

    let mut ops = Vec::new();
    let mut encoder = Encoder::new(ModelConfig::default());
    for i in 0..20_000u32 {
        let op = match rng.next() % 20 {
            0 => Op::Byte(rng.next() as u8),
            1 => Op::Half(rng.next() as u16),
            2 => Op::Float(i as f32 * 0.25),
            3 => Op::Compressed(uniform, rng.next() % 1000),
            _ => Op::Compressed(dynamic[(rng.next() % 4) as usize], rng.skewed()),
        };
        match op {
            Op::Compressed(ctx, v) => encoder.write_compressed_u32(ctx, v),
            Op::Byte(v) => encoder.write_u8(v),
            Op::Half(v) => encoder.write_u16(v),
            Op::Float(v) => encoder.write_u32(v.to_bits()),
        }
        ops.push(op);
    }
    let data = encoder.finish();

    let mut decoder = ArithmeticDecoder::new(&data);
    for op in &ops {
        match *op {
            Op::Compressed(ctx, v) => assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), v),
            Op::Byte(v) => assert_eq!(decoder.read_u8().unwrap(), v),
            Op::Half(v) => assert_eq!(decoder.read_u16().unwrap(), v),
            Op::Float(v) => assert_eq!(decoder.read_f32().unwrap(), v),
        }
        assert_invariants(&decoder);
    }
    assert!(decoder.symbols_decoded() >= 20_000);
}

#[test]
fn test_rescale_drift_round_trip() {
    let config = ModelConfig {
        rescale_threshold: Some(512),
        ..ModelConfig::default()
    };
    let ctx = Context::dynamic(7).unwrap();
    let mut rng = XorShift(7);
    let values: Vec<u32> = (0..12_000).map(|_| rng.next() % 40).collect();

    let mut encoder = Encoder::new(config);
    for &v in &values {
        encoder.write_compressed_u32(ctx, v);
    }
    let data = encoder.finish();

    let mut decoder = ArithmeticDecoder::with_config(&data, config);
    for &v in &values {
        assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), v);
        assert!(decoder.model().total_frequency(ctx) <= 512);
    }
}

#[test]
fn test_adaptive_growth_through_decoder() {
    let config = ModelConfig {
        rescale_threshold: None,
        ..ModelConfig::default()
    };
    let ctx = Context::dynamic(2).unwrap();
    let mut encoder = Encoder::new(config);
    for _ in 0..10_000 {
        encoder.write_compressed_u32(ctx, 5);
    }
    let data = encoder.finish();

    let mut decoder = ArithmeticDecoder::with_config(&data, config);
    let mut last = 0;
    for _ in 0..10_000 {
        assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), 5);
        let model = decoder.model();
        let freq = model.frequency(ctx, 6);
        assert!(freq >= last);
        last = freq;

        let sum: u32 = (0..=6).map(|s| model.frequency(ctx, s)).sum();
        assert_eq!(sum, model.total_frequency(ctx));
        assert_eq!(model.cumulative_frequency(ctx, 6), model.frequency(ctx, 0));
    }
    // First occurrence escapes, then adds itself; every later one decodes it.
    assert_eq!(last, 10_000);
}

#[test]
fn test_compressed_widths() {
    let ctx = Context::dynamic(3).unwrap();
    let mut encoder = Encoder::new(ModelConfig::default());
    encoder.write_compressed_u32(ctx, 300);
    encoder.write_compressed_u32(ctx, 300);
    encoder.write_compressed_u32(ctx, 70_000);
    let data = encoder.finish();

    let mut decoder = ArithmeticDecoder::new(&data);
    assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), 300);
    assert_eq!(
        decoder.read_compressed_u8(ctx),
        Err(crate::DecodeError::ValueOutOfRange { value: 300, max: 255 })
    );

    let mut decoder = ArithmeticDecoder::new(&data);
    assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), 300);
    assert_eq!(decoder.read_compressed_u16(ctx).unwrap(), 300);
    // Too large to track: escaped and never added.
    assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), 70_000);
    assert!(!decoder.model().contains(ctx, 70_001));
}

#[test]
fn test_huge_escaped_value_is_not_tracked() {
    let config = ModelConfig {
        max_symbol: u32::MAX,
        ..ModelConfig::default()
    };
    let ctx = Context::dynamic(4).unwrap();
    let mut encoder = Encoder::new(config);
    encoder.write_compressed_u32(ctx, 3_000_000_000);
    encoder.write_compressed_u32(ctx, 3_000_000_000);
    encoder.write_compressed_u32(ctx, 7);
    let data = encoder.finish();

    let mut decoder = ArithmeticDecoder::with_config(&data, config);
    assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), 3_000_000_000);
    assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), 3_000_000_000);
    assert_eq!(decoder.model().total_frequency(ctx), 1);
    assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), 7);
    assert!(decoder.model().contains(ctx, 8));
}

#[test]
fn test_into_parts() {
    let ctx = Context::dynamic(5).unwrap();
    let mut encoder = Encoder::new(ModelConfig::default());
    for v in [4, 4, 9, 4] {
        encoder.write_compressed_u32(ctx, v);
    }
    let data = encoder.finish();

    let mut decoder = ArithmeticDecoder::new(&data);
    assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), 4);
    assert_eq!(decoder.read_compressed_u32(ctx).unwrap(), 4);
    let offset = decoder.data_bit_offset();
    let before = *decoder.state();

    let (cursor, model, state) = decoder.into_parts();
    assert_eq!(cursor.bit_offset(), offset);
    assert_eq!(model.frequency(ctx, 5), 2);
    assert_eq!(state, before);
}

#[test]
fn test_truncated_stream_is_exhausted_not_zero_filled() {
    let ctx = Context::dynamic(1).unwrap();
    let mut encoder = Encoder::new(ModelConfig::default());
    for v in 0..200 {
        encoder.write_compressed_u32(ctx, v % 9);
    }
    let data = encoder.finish();
    let truncated = &data[..data.len() / 2];

    let mut decoder = ArithmeticDecoder::new(truncated);
    let err = loop {
        if let Err(e) = decoder.read_compressed_u32(ctx) {
            break e;
        }
    };
    assert!(err.is_exhausted());
    assert_eq!(
        decoder.read_compressed_u32(ctx),
        Err(crate::DecodeError::StreamFailed)
    );
}

proptest! {
    #[test]
    fn prop_round_trip(
        input in prop::collection::vec((1..5u32, 0..64u32), 1..400),
    ) {
        let mut encoder = Encoder::new(ModelConfig::default());
        for &(ctx, v) in &input {
            encoder.write_compressed_u32(Context::new(ctx), v);
        }
        let data = encoder.finish();

        let mut decoder = ArithmeticDecoder::new(&data);
        for &(ctx, v) in &input {
            prop_assert_eq!(decoder.read_compressed_u32(Context::new(ctx)).unwrap(), v);
            prop_assert!(decoder.state().low() <= decoder.state().high());
            prop_assert!(decoder.data_bit_offset() < 32);
        }
    }

    #[test]
    fn prop_arbitrary_bytes_only_exhaust(
        data in prop::collection::vec(any::<u8>(), 0..256),
        contexts in prop::collection::vec(0..6u32, 1..32),
    ) {
        let mut decoder = ArithmeticDecoder::new(&data);
        let err = 'outer: loop {
            for &c in &contexts {
                let ctx = match c {
                    0 => Context::BYTE,
                    5 => Context::uniform(7).unwrap(),
                    n => Context::new(n),
                };
                if let Err(e) = decoder.read_compressed_u32(ctx) {
                    break 'outer e;
                }
                prop_assert!(decoder.state().low() <= decoder.state().high());
            }
        };
        prop_assert!(err.is_exhausted(), "unexpected error: {}", err);
    }
}
