//! Turns raw frames into typed [`DecodedEvent`]s.
//!
//! A frame carries an `event:` line naming its kind and one or more `data:`
//! lines. Known kinds are `partial`, `final` and `error`; anything else is
//! skipped so the server can add event kinds without breaking clients.

use itertools::Itertools;
use tracing::warn;

use crate::client::DecodeError;
use crate::model::{DecodedEvent, DocumentField, ErrorEvent, FinalDocuments, PartialPayload};
use crate::sse::Frame;

/// Message of the error synthesized when the `final` payload cannot be read.
pub const MALFORMED_FINAL: &str = "malformed final payload";

/// Message used for an `error` frame with an empty payload.
pub const UNSPECIFIED_SERVER_ERROR: &str = "server reported an error";

/// Event kinds understood by the classifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventKind {
    Partial,
    Final,
    Error,
}

impl EventKind {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "partial" => Some(EventKind::Partial),
            "final" => Some(EventKind::Final),
            "error" => Some(EventKind::Error),
            _ => None,
        }
    }
}

/// Fields pulled out of a frame before payload interpretation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RawEvent<'a> {
    pub event: Option<&'a str>,
    pub data: Option<String>,
}

/// Split a frame into its `event` name and joined `data` payload.
pub fn parse_fields(frame: &Frame) -> RawEvent<'_> {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in frame.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match name {
            "event" => event = Some(value.trim()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    RawEvent {
        event,
        data: (!data_lines.is_empty()).then(|| data_lines.into_iter().join("\n")),
    }
}

/// Classify one frame.
///
/// `Ok` with an empty vector means the frame is skipped (unknown kind, no
/// `event:` line, or a partial with no chunks). A `partial` frame yields one
/// event per chunk field present, cover letter first. `Err` is only ever a
/// non-fatal decode failure of a partial frame; a broken `final` frame is
/// reported as a terminal [`ErrorEvent`] instead, since nothing that follows
/// could repair it.
pub fn classify(frame: &Frame) -> Result<Vec<DecodedEvent>, DecodeError> {
    let raw = parse_fields(frame);
    let kind = match raw.event.and_then(EventKind::parse) {
        Some(kind) => kind,
        None => return Ok(Vec::new()),
    };
    let payload = raw.data.as_deref().map(str::trim);

    match kind {
        EventKind::Partial => {
            let payload = payload.ok_or(DecodeError::MissingData)?;
            let parsed: PartialPayload =
                serde_json::from_str(payload).map_err(DecodeError::MalformedPartial)?;
            Ok([
                (DocumentField::CoverLetter, parsed.cover_letter_chunk),
                (DocumentField::Resume, parsed.resume_chunk),
            ]
            .into_iter()
            .filter_map(|(field, text)| {
                text.filter(|t| !t.is_empty())
                    .map(|text| DecodedEvent::Partial { field, text })
            })
            .collect())
        }
        EventKind::Final => {
            let parsed = payload
                .ok_or_else(|| "missing data line".to_string())
                .and_then(|p| serde_json::from_str::<FinalDocuments>(p).map_err(|e| e.to_string()));
            match parsed {
                Ok(documents) => Ok(vec![DecodedEvent::Final(documents)]),
                Err(reason) => {
                    warn!(reason = %reason, "final frame could not be parsed");
                    Ok(vec![DecodedEvent::Error(ErrorEvent::protocol(MALFORMED_FINAL))])
                }
            }
        }
        EventKind::Error => {
            let message = payload
                .filter(|p| !p.is_empty())
                .unwrap_or(UNSPECIFIED_SERVER_ERROR);
            Ok(vec![DecodedEvent::Error(ErrorEvent::server(message))])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorOrigin;

    fn frame(text: &str) -> Frame {
        Frame::new(text)
    }

    #[test]
    fn test_parse_fields() {
        let crlf = frame("event: partial\r\ndata:{\"a\":1}");
        let raw = parse_fields(&crlf);
        assert_eq!(raw.event, Some("partial"));
        assert_eq!(raw.data.as_deref(), Some("{\"a\":1}"));

        let multi = frame(": keep-alive\nevent: error\ndata: line one\ndata: line two\nid: 7");
        let raw = parse_fields(&multi);
        assert_eq!(raw.event, Some("error"));
        assert_eq!(raw.data.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn test_partial_with_both_fields() {
        let events = classify(&frame(
            "event: partial\ndata: {\"cover_letter_chunk\":\"Dear \",\"resume_chunk\":\"Skills\"}",
        ))
        .unwrap();
        assert_eq!(
            events,
            vec![
                DecodedEvent::Partial {
                    field: DocumentField::CoverLetter,
                    text: "Dear ".to_string()
                },
                DecodedEvent::Partial {
                    field: DocumentField::Resume,
                    text: "Skills".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_partial_without_chunks_is_skipped() {
        assert!(classify(&frame("event: partial\ndata: {\"progress\": 0.5}")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_partial_is_decode_error() {
        let result = classify(&frame("event: partial\ndata: {bad json"));
        assert!(matches!(result, Err(DecodeError::MalformedPartial(_))));

        let result = classify(&frame("event: partial"));
        assert!(matches!(result, Err(DecodeError::MissingData)));
    }

    #[test]
    fn test_final() {
        let events = classify(&frame(
            "event: final\ndata: {\"document_url\":\"https://docs.example/abc\",\"cover_letter_text\":\"c\",\"resume_text\":\"r\"}",
        ))
        .unwrap();
        assert_eq!(
            events,
            vec![DecodedEvent::Final(FinalDocuments {
                document_url: "https://docs.example/abc".to_string(),
                cover_letter_text: "c".to_string(),
                resume_text: "r".to_string(),
            })]
        );
    }

    #[test]
    fn test_malformed_final_is_terminal_error() {
        for text in ["event: final\ndata: {\"document_url\":", "event: final\ndata: {}", "event: final"] {
            let events = classify(&frame(text)).unwrap();
            assert_eq!(
                events,
                vec![DecodedEvent::Error(ErrorEvent::protocol(MALFORMED_FINAL))],
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_error_is_raw_text() {
        let events = classify(&frame("event: error\ndata: Rate limit exceeded")).unwrap();
        assert_eq!(events, vec![DecodedEvent::Error(ErrorEvent::server("Rate limit exceeded"))]);

        let events = classify(&frame("event: error\ndata: {\"not\": \"parsed\"}")).unwrap();
        match &events[0] {
            DecodedEvent::Error(e) => {
                assert_eq!(e.message, "{\"not\": \"parsed\"}");
                assert_eq!(e.origin, ErrorOrigin::Server);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_error_payload() {
        let events = classify(&frame("event: error\ndata: ")).unwrap();
        assert_eq!(events, vec![DecodedEvent::Error(ErrorEvent::server(UNSPECIFIED_SERVER_ERROR))]);
    }

    #[test]
    fn test_unknown_and_missing_kinds_skip() {
        assert!(classify(&frame("event: heartbeat\ndata: {}")).unwrap().is_empty());
        assert!(classify(&frame("data: {\"cover_letter_chunk\":\"x\"}")).unwrap().is_empty());
    }
}
