#![no_main]

use graphprobe_mcp::{SseEvent, SseParser};
use libfuzzer_sys::fuzz_target;

fn parse_all(chunks: &[&[u8]]) -> Vec<SseEvent> {
    let mut parser = SseParser::new();
    let mut events = chunks
        .iter()
        .flat_map(|chunk| parser.feed(chunk))
        .collect::<Vec<_>>();
    events.extend(parser.finish());
    events
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let split = usize::from(data[0]) % data.len();
    let body = &data[1..];
    let split = split.min(body.len());
    let whole = parse_all(&[body]);
    let chunked = parse_all(&[&body[..split], &body[split..]]);
    assert_eq!(whole, chunked);
});
