//! Fuzz target for the flow document adapter.
//!
//! Tests that `parse` handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The adapter should never panic, only return a ParseError
    let _ = fp_flow::parse(data);
});
