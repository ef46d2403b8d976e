#![no_main]
use libfuzzer_sys::fuzz_target;
use u3d_arith::{ArithmeticDecoder, Context, ModelConfig};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Byte 0: rescale threshold (0 disables rescaling)
    let rescale_threshold = match data[0] {
        0 => None,
        n => Some(u32::from(n) * 64),
    };
    // Byte 1: number of dynamic contexts in rotation (1-8)
    let context_count = 1 + u32::from(data[1] % 8);

    let config = ModelConfig {
        rescale_threshold,
        ..ModelConfig::default()
    };
    let mut decoder = ArithmeticDecoder::with_config(&data[2..], config);
    let contexts: Vec<Context> = (1..=context_count).filter_map(Context::dynamic).collect();

    // A consistent model never desynchronizes; only exhaustion may end the stream.
    'stream: loop {
        for &ctx in &contexts {
            if let Err(e) = decoder.read_compressed_u32(ctx) {
                assert!(e.is_exhausted(), "{}", e);
                break 'stream;
            }
            assert!(decoder.state().low() <= decoder.state().high());
            assert!(decoder.data_bit_offset() < 32);
        }
    }
});
