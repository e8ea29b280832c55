#![no_main]

use graphprobe_graph::decode_commit_body;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data);
    if let Ok(results) = decode_commit_body(&body, 1) {
        assert_eq!(results.len(), 1);
    }
});
