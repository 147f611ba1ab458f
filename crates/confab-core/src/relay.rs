//! Relays a provider event stream onto a client-facing frame sink.
//!
//! The relay turns the normalized [`StreamEvent`] sequence into the frame
//! grammar clients consume: one `message_start`, a `streaming` frame per
//! text delta, one `message_stop` carrying a completion notice and token
//! counts. Reasoning deltas are filtered out of the outbound frames and the
//! accumulated text alike; usage events advance internal accounting without
//! being echoed.
//!
//! Delivery is best-effort. If the sink reports non-delivery the relay stops
//! pulling provider events promptly and returns the text accumulated so far
//! as an aborted outcome, because a partial answer may still be persisted.
//! A stream error propagates to the caller instead, who decides whether to
//! fail over or report it.

use futures_util::{Stream, StreamExt};

use confab_types::frame::StreamFrame;
use confab_types::llm::{LlmError, StreamEvent, TokenUsage};

/// Destination for outbound frames of one connection.
///
/// `send` is synchronous and returns whether the frame was handed off;
/// non-delivery is a signal, never an error.
pub trait FrameSink {
    fn send(&self, frame: StreamFrame) -> bool;
}

/// What a completed relay produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    /// Full answer text, the concatenation of every text delta consumed.
    pub text: String,
    /// Provider message id, if the stream got far enough to assign one.
    pub message_id: Option<String>,
    /// Token usage, if the provider reported it.
    pub usage: Option<TokenUsage>,
    /// True when the sink refused delivery and the relay stopped early.
    pub aborted: bool,
}

/// Drive one provider stream to completion against a sink.
pub async fn relay<St, Sk>(stream: St, sink: &Sk) -> Result<RelayOutcome, LlmError>
where
    St: Stream<Item = Result<StreamEvent, LlmError>>,
    Sk: FrameSink + ?Sized,
{
    let mut stream = std::pin::pin!(stream);

    let mut message_id: Option<String> = None;
    let mut started = false;
    let mut text = String::new();
    let mut usage: Option<TokenUsage> = None;
    let mut aborted = false;

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::MessageStart { message_id: id } => {
                message_id = Some(id);
                if !started {
                    started = true;
                    let id = message_id.clone().unwrap_or_default();
                    if !sink.send(StreamFrame::message_start(id)) {
                        aborted = true;
                        break;
                    }
                }
            }
            StreamEvent::TextDelta { text: delta } => {
                // Providers that never declare a start still get a well
                // formed frame sequence.
                if !started {
                    started = true;
                    message_id = Some(uuid::Uuid::new_v4().to_string());
                    let id = message_id.clone().unwrap_or_default();
                    if !sink.send(StreamFrame::message_start(id)) {
                        aborted = true;
                        break;
                    }
                }
                text.push_str(&delta);
                let id = message_id.clone().unwrap_or_default();
                if !sink.send(StreamFrame::streaming(id, delta)) {
                    aborted = true;
                    break;
                }
            }
            StreamEvent::Thinking { .. } => {}
            StreamEvent::Usage(reported) => {
                usage = Some(reported);
            }
            StreamEvent::MessageStop => break,
        }
    }

    if !aborted {
        let id = message_id.clone().unwrap_or_default();
        if !sink.send(StreamFrame::message_stop(id, terminal_payload(usage))) {
            aborted = true;
        }
    }

    Ok(RelayOutcome {
        text,
        message_id,
        usage,
        aborted,
    })
}

fn terminal_payload(usage: Option<TokenUsage>) -> String {
    let mut payload = String::from("Message stream completed.");
    if let Some(usage) = usage {
        payload.push_str(&format!(
            "\n\nInput tokens: {}\nOutput tokens: {}",
            usage.input_tokens, usage.output_tokens
        ));
    }
    payload
}
