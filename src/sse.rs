//! Server-Sent Events framing shared by every streaming surface
//!
//! The LLM provider, the MCP HTTP transport and the chat client all read
//! `data:` payloads out of chunked bodies; the chat backend writes them.

/// Marker payload that terminates a UI message stream
pub const DONE_MARKER: &str = "[DONE]";

/// Frame one payload as an SSE event
pub fn encode_data(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len() + 8);
    for line in payload.split('\n') {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Incremental SSE decoder
///
/// Buffers incoming bytes and yields the `data:` payload of every complete
/// event. Multiple `data:` lines in one event are joined with `\n`; comment,
/// `event:`, `id:` and `retry:` lines are ignored. Handles events split
/// across chunks, several events in one chunk, CRLF line endings, and a
/// final event without a trailing blank line (via [`SseDecoder::finish`]).
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push incoming bytes and return the payloads of completed events
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            // Decode per line so multi-byte characters split across chunks survive
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(payload) = self.feed_line(line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush the buffered tail when the body ends
    pub fn finish(&mut self) -> Vec<String> {
        let mut payloads = Vec::new();
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let tail = String::from_utf8_lossy(&raw).into_owned();
            for line in tail.lines() {
                if let Some(payload) = self.feed_line(line) {
                    payloads.push(payload);
                }
            }
        }
        if let Some(payload) = self.dispatch() {
            payloads.push(payload);
        }
        payloads
    }

    fn feed_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_event() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: {\"hello\":\"world\"}\n\n");
        assert_eq!(payloads, vec!["{\"hello\":\"world\"}"]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"text\":\"hel").is_empty());
        assert!(decoder.push(b"lo\"}\n").is_empty());
        assert_eq!(decoder.push(b"\n"), vec!["{\"text\":\"hello\"}"]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: température\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec!["température"]);
    }

    #[test]
    fn test_final_event_without_trailing_newline() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(b"data: {\"a\":1}\n\n"), vec!["{\"a\":1}"]);
        assert!(decoder.push(b"data: {\"b\":2}").is_empty());
        assert_eq!(decoder.finish(), vec!["{\"b\":2}"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_crlf_and_metadata_lines() {
        let mut decoder = SseDecoder::new();
        let payloads =
            decoder.push(b": keep-alive\r\nevent: message\r\nid: 7\r\ndata: {\"x\":1}\r\n\r\n");
        assert_eq!(payloads, vec!["{\"x\":1}"]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: line one\ndata: line two\n\n");
        assert_eq!(payloads, vec!["line one\nline two"]);
    }

    #[test]
    fn test_encode_round_trips_through_decoder() {
        let mut decoder = SseDecoder::new();
        let framed = format!("{}{}", encode_data("{\"a\":\"b\\nc\"}"), encode_data(DONE_MARKER));
        assert_eq!(
            decoder.push(framed.as_bytes()),
            vec!["{\"a\":\"b\\nc\"}", DONE_MARKER]
        );
    }
}
