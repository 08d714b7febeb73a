//! `Hash::digest`/`to_hex`/`from_hex` must round-trip for any input,
//! and `from_hex` must reject anything that isn't 64 hex characters
//! without panicking.
#![no_main]

use libfuzzer_sys::fuzz_target;
use vertex_types::Hash;

fuzz_target!(|data: &[u8]| {
    let hash = Hash::digest(data);
    let hex = hash.to_hex();
    assert_eq!(hex.len(), 64);
    assert_eq!(Hash::from_hex(&hex).unwrap(), hash);

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Hash::from_hex(text);
    }
});
