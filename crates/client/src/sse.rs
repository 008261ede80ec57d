//! Incremental parser for text/event-stream framing.
//!
//! HTTP chunks do not line up with event boundaries, so the parser buffers
//! input and emits a frame whenever a blank line completes one. Comment
//! lines (leading `:`) and fields other than `event:`/`data:` are ignored.

/// One parsed event-stream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: String,
    pub data: String,
}

#[derive(Debug, Default)]
pub(crate) struct FrameParser {
    buffer: String,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of bytes and returns every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut frames = Vec::new();
        while let Some((block_end, sep_len)) = self.next_boundary() {
            let block: String = self.buffer.drain(..block_end + sep_len).collect();
            let block = &block[..block_end];
            if let Some(frame) = parse_block(block) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Position and length of the earliest blank-line separator, if a full
    /// frame is buffered. Handles both `\n\n` and `\r\n\r\n`.
    fn next_boundary(&self) -> Option<(usize, usize)> {
        let lf = self.buffer.find("\n\n").map(|pos| (pos, 2));
        let crlf = self.buffer.find("\r\n\r\n").map(|pos| (pos, 4));
        match (lf, crlf) {
            (Some(a), Some(b)) => Some(if a.0 < b.0 { a } else { b }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

fn parse_block(block: &str) -> Option<SseFrame> {
    let mut event = "message".to_string();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("event:") {
            event = value.strip_prefix(' ').unwrap_or(value).to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        }
        // id: and retry: are irrelevant to the bridge protocol.
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_a_named_event_frame() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"event: call\ndata: {\"x\":1}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "call".into(),
                data: "{\"x\":1}".into()
            }]
        );
    }

    #[test]
    fn test_frames_split_across_chunks() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"event: ca").is_empty());
        assert!(parser.feed(b"ll\ndata: {\"x\"").is_empty());
        let frames = parser.feed(b":1}\n\nevent: call\ndata: 2\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "{\"x\":1}");
        assert_eq!(frames[1].data, "2");
    }

    #[test]
    fn test_comment_only_blocks_yield_nothing() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b": connected\n\n").is_empty());
        assert!(parser.feed(b": keep-alive\n\n").is_empty());
    }

    #[test]
    fn test_default_event_name_is_message() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"data: hola\n\n");
        assert_eq!(frames[0].event, "message");
    }

    #[test]
    fn test_multiple_data_lines_are_joined() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"event: call\ndata: a\ndata: b\n\n");
        assert_eq!(frames[0].data, "a\nb");
    }

    #[test]
    fn test_crlf_framing_is_accepted() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"event: call\r\ndata: 1\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "1");
    }
}
