#![no_main]

use chanstore::{decode_hashes, encode_hashes};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(hashes) = decode_hashes(data) {
        let encoded = encode_hashes(&hashes).expect("decoded hashes always fit");
        assert_eq!(encoded, data);
    }
});
