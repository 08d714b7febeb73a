//! Decodes arbitrary bytes as a gossip-wire `Envelope<u64>`. The
//! transport never trusts a peer's bytes before this decode succeeds,
//! so malformed input must fail cleanly rather than panic.
#![no_main]

use libfuzzer_sys::fuzz_target;
use vertex_gossip::Envelope;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = serde_json::from_str::<Envelope<u64>>(text);
});
