use crate::error::ClientError;
use crate::traits::PodEventStream;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use strew_core::{Pod, WatchEvent};
use tracing::{debug, warn};

/// Incremental decoder for a line-framed watch body
///
/// The API server publishes one event per line, either as an SSE
/// `data: <json>` field or as a bare JSON object. Chunks arriving off
/// the wire may split lines at arbitrary byte boundaries, so the
/// decoder buffers until a full line is available.
#[derive(Default)]
pub struct WatchFrameDecoder {
    buffer: String,
}

impl WatchFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of body bytes, returning any events completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<WatchEvent<Pod>> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(line.trim_end_matches(['\r', '\n'])) {
                events.push(event);
            }
        }
        events
    }
}

/// Decode a single line into a watch event
///
/// Blank lines, SSE comments (keep-alives), and non-data SSE fields
/// carry no event. Undecodable payloads are logged and skipped so a
/// single corrupt frame does not tear down the watch.
fn decode_line(line: &str) -> Option<WatchEvent<Pod>> {
    if line.is_empty() {
        return None;
    }
    if line.starts_with(':') {
        return None;
    }
    let payload = if let Some(rest) = line.strip_prefix("data:") {
        rest.trim_start()
    } else if line.starts_with('{') {
        line
    } else {
        debug!("Ignoring non-data watch frame field: {}", line);
        return None;
    };
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping undecodable watch frame: {}", e);
            None
        }
    }
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: WatchFrameDecoder,
    pending: VecDeque<WatchEvent<Pod>>,
    timeout: Duration,
    done: bool,
}

/// Adapt a raw response body into a stream of decoded watch events
///
/// The stream ends when the server closes the body or when `timeout`
/// passes without a chunk arriving. A transport error is surfaced as a
/// final `Err` item before the stream ends.
pub fn decode_watch_stream<S>(body: S, timeout: Duration) -> PodEventStream
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let state = StreamState {
        body: body.boxed(),
        decoder: WatchFrameDecoder::new(),
        pending: VecDeque::new(),
        timeout,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }
            match tokio::time::timeout(state.timeout, state.body.next()).await {
                Err(_) => {
                    debug!(
                        "Watch window expired after {:?} of inactivity",
                        state.timeout
                    );
                    state.done = true;
                }
                Ok(Some(Ok(chunk))) => {
                    state.pending.extend(state.decoder.feed(&chunk));
                }
                Ok(Some(Err(e))) => {
                    state.done = true;
                    return Some((
                        Err(ClientError::unavailable(format!("watch stream error: {}", e))),
                        state,
                    ));
                }
                Ok(None) => {
                    debug!("Watch stream closed by server");
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strew_core::WatchEventType;

    fn event_json(event_type: &str, pod_name: &str) -> String {
        format!(
            r#"{{"type":"{}","object":{{"metadata":{{"name":"{}","namespace":"default"}}}}}}"#,
            event_type, pod_name
        )
    }

    fn pod_name(event: &WatchEvent<Pod>) -> String {
        event
            .object
            .as_ref()
            .and_then(|p| p.metadata.name.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_decoder_reassembles_split_lines() {
        let mut decoder = WatchFrameDecoder::new();
        let line = format!("data: {}\n", event_json("ADDED", "web-1"));
        let (first, second) = line.as_bytes().split_at(10);

        assert!(decoder.feed(first).is_empty());
        let events = decoder.feed(second);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, WatchEventType::Added);
        assert_eq!(pod_name(&events[0]), "web-1");
    }

    #[test]
    fn test_decoder_accepts_bare_json_lines() {
        let mut decoder = WatchFrameDecoder::new();
        let events = decoder.feed(format!("{}\n", event_json("MODIFIED", "web-2")).as_bytes());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, WatchEventType::Modified);
    }

    #[test]
    fn test_decoder_skips_comments_and_blank_lines() {
        let mut decoder = WatchFrameDecoder::new();
        let body = format!(
            ": keep-alive\n\ndata: {}\n\n: keep-alive\n",
            event_json("ADDED", "web-3")
        );
        let events = decoder.feed(body.as_bytes());
        assert_eq!(events.len(), 1);
        assert_eq!(pod_name(&events[0]), "web-3");
    }

    #[test]
    fn test_decoder_skips_malformed_frames() {
        let mut decoder = WatchFrameDecoder::new();
        let body = format!(
            "data: {{not json}}\ndata: {}\n",
            event_json("DELETED", "web-4")
        );
        let events = decoder.feed(body.as_bytes());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, WatchEventType::Deleted);
    }

    #[test]
    fn test_decoder_handles_crlf_line_endings() {
        let mut decoder = WatchFrameDecoder::new();
        let events = decoder.feed(format!("data: {}\r\n", event_json("ADDED", "web-5")).as_bytes());
        assert_eq!(events.len(), 1);
        assert_eq!(pod_name(&events[0]), "web-5");
    }

    #[tokio::test]
    async fn test_stream_yields_events_then_ends_on_close() {
        let chunks = vec![
            Ok::<Bytes, reqwest::Error>(Bytes::from(format!(
                "data: {}\n",
                event_json("ADDED", "web-1")
            ))),
            Ok(Bytes::from(format!("data: {}\n", event_json("ADDED", "web-2")))),
        ];
        let mut stream = decode_watch_stream(stream::iter(chunks), Duration::from_secs(300));

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(pod_name(&first), "web-1");
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(pod_name(&second), "web-2");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ends_after_inactivity_timeout() {
        let body = stream::pending::<reqwest::Result<Bytes>>();
        let mut stream = decode_watch_stream(body, Duration::from_secs(300));
        assert!(stream.next().await.is_none());
    }
}
