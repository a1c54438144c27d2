//! Incremental parser for Server-Sent Events responses.
//!
//! Events are separated by a blank line; each consists of optional `event:`
//! and one or more `data:` lines. Chunks may split anywhere, including the
//! middle of a UTF-8 sequence's text, so the parser buffers until a full
//! event boundary is seen.

/// One complete event pulled off the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Default)]
pub struct EventStream {
    buffer: String,
}

impl EventStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw response bytes; returns every event completed by this chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some((block, rest)) = split_once_blank_line(&self.buffer) {
            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
            self.buffer = rest;
        }
        events
    }
}

/// Split off the first event block, tolerating both `\n\n` and `\r\n\r\n`
/// boundaries.
fn split_once_blank_line(buffer: &str) -> Option<(String, String)> {
    let lf = buffer.find("\n\n").map(|i| (i, 2));
    let crlf = buffer.find("\r\n\r\n").map(|i| (i, 4));
    let (pos, sep_len) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if b.0 < a.0 {
                b
            } else {
                a
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((
        buffer[..pos].to_string(),
        buffer[pos + sep_len..].to_string(),
    ))
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event_type: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with(':') {
            // comment / keep-alive
            continue;
        }
        if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        }
        // id: and retry: fields are ignored
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event: event_type,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_events_one_chunk() {
        let mut stream = EventStream::new();
        let events = stream.push(b"data: hello\n\ndata: world\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "world");
    }

    #[test]
    fn test_event_type_field() {
        let mut stream = EventStream::new();
        let events = stream.push(b"event: delta\ndata: {\"x\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("delta"));
        assert_eq!(events[0].data, "{\"x\":1}");
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut stream = EventStream::new();
        assert!(stream.push(b"data: hel").is_empty());
        let events = stream.push(b"lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_crlf_boundaries() {
        let mut stream = EventStream::new();
        let events = stream.push(b"data: a\r\n\r\ndata: b\r\n\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "a");
        assert_eq!(events[1].data, "b");
    }

    #[test]
    fn test_comments_and_blank_events_skipped() {
        let mut stream = EventStream::new();
        let events = stream.push(b": keep-alive\n\ndata: real\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut stream = EventStream::new();
        let events = stream.push(b"data: line1\ndata: line2\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "line1\nline2");
    }
}
