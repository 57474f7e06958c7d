//! Line-oriented SSE decoding over an arbitrary byte stream.
//!
//! Bytes may arrive split anywhere, including inside a multi-byte UTF-8
//! sequence or a line. The decoder keeps both remainders between calls and
//! yields the payload of every complete `data:` line.

use memchr::memchr_iter;

/// Incremental UTF-8 decoder that holds back an incomplete trailing sequence.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    remainder: Vec<u8>,
}

impl Utf8Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, appending text to `out`. Invalid sequences become
    /// U+FFFD; a truncated sequence at the end waits for the next call.
    pub fn decode_into(&mut self, bytes: &[u8], out: &mut String) {
        let owned;
        let mut input: &[u8] = if self.remainder.is_empty() {
            bytes
        } else {
            self.remainder.extend_from_slice(bytes);
            owned = std::mem::take(&mut self.remainder);
            &owned
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, after) = input.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &after[bad..];
                        }
                        None => {
                            self.remainder.extend_from_slice(after);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush at end of input; a dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.remainder.is_empty() {
            self.remainder.clear();
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
}

/// Splits decoded text on line boundaries and extracts `data:` payloads.
///
/// Lines are trimmed; blank lines, comments and non-`data:` fields are
/// skipped. The payload is everything after `data:`, trimmed.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    utf8: Utf8Decoder,
    buffer: String,
}

impl SseLineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return the payloads of any completed `data:` lines.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        self.feed_into(bytes, &mut out);
        out
    }

    /// Feed raw bytes and append completed payloads to a caller-provided buffer.
    pub fn feed_into(&mut self, bytes: &[u8], out: &mut Vec<String>) {
        self.utf8.decode_into(bytes, &mut self.buffer);

        let mut consumed = 0usize;
        for line_end in memchr_iter(b'\n', self.buffer.as_bytes()) {
            if let Some(payload) = data_payload(&self.buffer[consumed..line_end]) {
                out.push(payload.to_string());
            }
            consumed = line_end + 1;
        }
        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
    }

    /// Flush a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        self.utf8.finish(&mut self.buffer);
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line).map(str::to_string)
    }
}

fn data_payload(line: &str) -> Option<&str> {
    let payload = line.trim().strip_prefix("data:")?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_data_lines() {
        let mut decoder = SseLineDecoder::new();
        let payloads = decoder.feed(b": keepalive\nevent: x\ndata: {\"a\":1}\n\ndata:[DONE]\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "[DONE]".to_string()]);
    }

    #[test]
    fn test_handles_crlf_and_split_lines() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.feed(b"data: he").is_empty());
        assert_eq!(decoder.feed(b"llo\r\ndata: wor"), vec!["hello".to_string()]);
        assert_eq!(decoder.feed(b"ld\r\n"), vec!["world".to_string()]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let text = "data: ◁think▶\n".as_bytes();
        let split = 8; // inside the three-byte `◁`
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.feed(&text[..split]).is_empty());
        assert_eq!(decoder.feed(&text[split..]), vec!["◁think▶".to_string()]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.feed(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut out = String::new();
        let mut utf8 = Utf8Decoder::new();
        utf8.decode_into(b"a\xffb", &mut out);
        assert_eq!(out, "a\u{fffd}b");
    }
}
