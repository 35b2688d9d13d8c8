//! Fuzz target for canonical minutiae text parsing.

#![no_main]

use fpsynth::minutiae::io_txt::fuzz_parse_minutiae_str;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_minutiae_str(content);
});
