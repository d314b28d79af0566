//! Fuzz target for canonicalization.
//!
//! Any document the adapter accepts must canonicalize deterministically
//! (or fail cleanly), and sensitive plaintext must never reach the stream.

#![no_main]

use fp_fingerprint::{Canonicalizer, MaskingEncoder};
use fp_flow::NoDecryption;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(tree) = fp_flow::parse(data) else {
        return;
    };

    let encoder = MaskingEncoder::from_raw_key([0u8; 32]);
    let canonicalizer = Canonicalizer::new(&encoder, &NoDecryption);

    let first = canonicalizer.canonicalize(&tree);
    let second = canonicalizer.canonicalize(&tree);
    match (first, second) {
        (Ok(a), Ok(b)) => assert_eq!(a, b),
        (Err(_), Err(_)) => {}
        _ => panic!("canonicalization determinism violated"),
    }
});
