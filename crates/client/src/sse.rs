//! Incremental decoder for `text/event-stream` bodies.
//!
//! Chunks arrive at arbitrary byte boundaries, so the decoder buffers until
//! it sees a full line and only emits an event on the blank line that
//! terminates it.

use core::mem;

/// One dispatched server-sent event.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SseEvent {
    /// Value of the `event:` field, `None` for the default `message` type.
    pub event: Option<String>,
    /// All `data:` lines of the event joined with `\n`.
    pub data: String,
    /// Last event id seen on the stream, carried across events.
    pub id: Option<String>,
}

impl SseEvent {
    #[must_use]
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
            id: None,
        }
    }

    /// Whether this is a plain data message rather than a control event.
    #[must_use]
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }

    /// Whether the server announced it is closing the stream.
    #[must_use]
    pub fn is_close(&self) -> bool {
        self.event.as_deref() == Some("close")
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one body chunk and returns every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let _newline = line.pop();
            if line.last() == Some(&b'\r') {
                let _cr = line.pop();
            }

            let line = String::from_utf8_lossy(&line);

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_owned()),
            "event" => self.event = Some(value.to_owned()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            _ => {}
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();

        if self.data.is_empty() {
            return None;
        }

        Some(SseEvent {
            event,
            data: mem::take(&mut self.data).join("\n"),
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"productId\":\"p1\",\"newStock\":2}\n\n");

        assert_eq!(
            events,
            vec![SseEvent::message(r#"{"productId":"p1","newStock":2}"#)]
        );
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: hel").is_empty());
        assert!(decoder.feed(b"lo\r\n").is_empty());

        let events = decoder.feed(b"\r\n");
        assert_eq!(events, vec![SseEvent::message("hello")]);
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\ndata: a\ndata: b\n\n: ping\n\n");

        assert_eq!(events, vec![SseEvent::message("a\nb")]);
    }

    #[test]
    fn test_named_events_and_ids() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 7\nevent: close\ndata: bye\n\ndata: next\n\n");

        assert_eq!(events.len(), 2);
        assert!(events[0].is_close());
        assert!(!events[0].is_message());
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert!(events[1].is_message());
        assert_eq!(events[1].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_event_without_data_is_dropped() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: ping\n\ndata:x\n\n");

        assert_eq!(events, vec![SseEvent::message("x")]);
    }
}
