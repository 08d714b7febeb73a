//! Decodes arbitrary bytes as a `Message<u64>`, the envelope every
//! actor mailbox receives before dispatch.
#![no_main]

use libfuzzer_sys::fuzz_target;
use vertex_types::Message;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = serde_json::from_str::<Message<u64>>(text);
});
