#![no_main]
use libfuzzer_sys::fuzz_target;
use pemview_utils::asn1::{DecodeOptions, Decoder};

fuzz_target!(|data: &[u8]| {
    for options in [DecodeOptions::strict(), DecodeOptions::tolerant()] {
        let mut decoder = Decoder::new(data, options);
        while !decoder.is_empty() {
            match decoder.read_node() {
                Ok(node) => {
                    let _ = node.dump();
                    let _ = node.to_der();
                }
                Err(_) => break,
            }
        }
    }
});
