//! Fuzz target for Frame::decode
//!
//! # Strategy
//!
//! - Arbitrary bytes, decoded as UTF-8 text where possible
//! - Covers header escape sequences, CRLF endings, missing NUL terminators
//!
//! # Invariants
//!
//! - decode never panics; malformed input returns an error
//! - decode(encode(frame)) reproduces the frame exactly

#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_proto::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };

    if let Ok(frame) = Frame::decode(text) {
        let encoded = frame.encode();
        let redecoded = Frame::decode(&encoded).expect("encoded frame failed to decode");
        assert_eq!(redecoded, frame, "decode/encode round trip diverged");
    }
});
