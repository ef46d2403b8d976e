#![no_main]
use libfuzzer_sys::fuzz_target;
use u3d_arith::{ArithmeticDecoder, Context};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    // First 2 bytes: raw context id (may be unsupported)
    let ctx = Context::new(u32::from(u16::from_le_bytes([data[0], data[1]])));
    // Byte 2: reads to attempt
    let reads = data[2];

    let mut decoder = ArithmeticDecoder::new(&data[3..]);
    for _ in 0..reads {
        if decoder.decode_symbol(ctx).is_err() {
            assert!(decoder.is_failed());
            break;
        }
    }
});
