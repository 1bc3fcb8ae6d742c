#![no_main]
//! Split-invariance fuzzing: tokenizing any byte payload must produce the
//! same token stream (or the same rejection) no matter how the payload is
//! partitioned into spans.

use jsonspan::{JsonReader, ReaderOptions, ReaderState, TokenType};
use libfuzzer_sys::fuzz_target;

const HEADER: usize = 2; // split-seed bytes

type Stream = Result<Vec<(TokenType, Vec<u8>)>, String>;

fn tokens(payload: &[u8], chunk: usize) -> Stream {
    let mut state = ReaderState::new(ReaderOptions::default());
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut end = chunk.min(payload.len());
    loop {
        let is_final = end == payload.len();
        let mut reader = JsonReader::new(&payload[start..end], is_final, state);
        loop {
            match reader.read() {
                Ok(true) => tokens.push((reader.token_type(), reader.value_span().to_vec())),
                Ok(false) => break,
                Err(e) => return Err(e.to_string()),
            }
        }
        start += reader.bytes_consumed();
        state = reader.into_state();
        if is_final {
            return Ok(tokens);
        }
        end = (end + chunk).min(payload.len());
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER {
        return;
    }
    let chunk = 1 + usize::from(u16::from_le_bytes([data[0], data[1]]) % 17);
    let payload = &data[HEADER..];

    let whole = tokens(payload, payload.len().max(1));
    let split = tokens(payload, chunk);
    assert_eq!(whole, split, "chunk size {chunk}");
});
