use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, stream};
use serde_json::Value;
use tracing::warn;

const EVENT_DELIMITER: &[u8] = b"\n\n";
const DATA_PREFIX: &str = "data:";

struct RewriteState<S> {
    upstream: S,
    buffer: BytesMut,
    /// Pending metadata; taken when the first event is written out, which
    /// switches the stream into passthrough.
    metadata: Option<Vec<Value>>,
    done: bool,
}

/// Wrap an upstream SSE byte stream so that the first complete event gets a
/// `metadata` field injected into its JSON payload. Upstream chunk
/// boundaries are not trusted: bytes are buffered until the first event
/// delimiter appears, then everything after it is forwarded untouched.
///
/// Once a byte has been emitted the response status is committed, so later
/// upstream errors cannot be reported out of band; the stream simply ends.
pub fn rewrite_first_event<S, E>(
    upstream: S,
    metadata: Vec<Value>,
) -> impl Stream<Item = Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let state = RewriteState {
        upstream,
        buffer: BytesMut::new(),
        metadata: Some(metadata),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        loop {
            if state.metadata.is_none() {
                // Passthrough: forward upstream items as they come.
                return match state.upstream.next().await {
                    Some(item) => Some((item, state)),
                    None => None,
                };
            }

            match state.upstream.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    if let Some(end) = find_delimiter(&state.buffer) {
                        let metadata = state.metadata.take().unwrap_or_default();
                        let buffered = state.buffer.split().freeze();
                        return Some((Ok(inject_metadata(buffered, end, metadata)), state));
                    }
                    // No complete event yet; keep buffering.
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    // Upstream ended before a full event; flush verbatim.
                    state.done = true;
                    if state.buffer.is_empty() {
                        return None;
                    }
                    return Some((Ok(state.buffer.split().freeze()), state));
                }
            }
        }
    })
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.windows(EVENT_DELIMITER.len()).position(|w| w == EVENT_DELIMITER)
}

/// Splice the metadata into the first buffered event and re-frame it,
/// keeping every byte after the first delimiter exactly as received.
fn inject_metadata(buffered: Bytes, event_end: usize, metadata: Vec<Value>) -> Bytes {
    let event = &buffered[..event_end];
    let rest = &buffered[event_end + EVENT_DELIMITER.len()..];

    let rewritten = std::str::from_utf8(event)
        .ok()
        .and_then(|text| rewrite_event(text, metadata));

    match rewritten {
        Some(event) => {
            let mut out =
                BytesMut::with_capacity(event.len() + EVENT_DELIMITER.len() + rest.len());
            out.extend_from_slice(event.as_bytes());
            out.extend_from_slice(EVENT_DELIMITER);
            out.extend_from_slice(rest);
            out.freeze()
        }
        None => {
            warn!("first stream event is not a data-framed JSON object, forwarding unmodified");
            buffered
        }
    }
}

fn rewrite_event(text: &str, metadata: Vec<Value>) -> Option<String> {
    let payload = text.strip_prefix(DATA_PREFIX)?.trim_start();
    let mut value: Value = serde_json::from_str(payload).ok()?;
    let map = value.as_object_mut()?;
    map.insert("metadata".to_string(), Value::Array(metadata));
    Some(format!("data: {}", value))
}
