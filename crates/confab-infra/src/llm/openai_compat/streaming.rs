//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] chunks to the
//! provider-agnostic [`StreamEvent`] enum defined in `confab-types`.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use async_openai::types::chat::ChatCompletionResponseStream;

use confab_types::llm::{LlmError, StreamEvent, TokenUsage};

/// Map an async-openai [`ChatCompletionResponseStream`] to a stream of [`StreamEvent`]s.
///
/// The returned stream emits events in this order:
/// 1. `MessageStart` -- carrying the completion id of the first chunk
/// 2. `TextDelta` -- for each non-empty content chunk
/// 3. `Usage` -- token counts (requires `stream_options.include_usage = true`
///    on the request; the final chunk carries them with an empty choices array)
/// 4. `MessageStop` -- at the end of the stream
pub fn map_openai_stream(
    stream: ChatCompletionResponseStream,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        let mut stream = stream;
        let mut started = false;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;

            if !started && !chunk.id.is_empty() {
                started = true;
                yield StreamEvent::MessageStart {
                    message_id: chunk.id.clone(),
                };
            }

            if let Some(usage) = chunk.usage.as_ref() {
                yield StreamEvent::Usage(TokenUsage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                });
            }

            for choice in &chunk.choices {
                if let Some(text) = choice.delta.content.clone() {
                    if !text.is_empty() {
                        yield StreamEvent::TextDelta { text };
                    }
                }
            }
        }

        yield StreamEvent::MessageStop;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::OpenAIError;
    use async_openai::types::chat::CreateChatCompletionStreamResponse;

    fn chunk(json: &str) -> CreateChatCompletionStreamResponse {
        serde_json::from_str(json).unwrap()
    }

    fn as_response_stream(
        items: Vec<Result<CreateChatCompletionStreamResponse, OpenAIError>>,
    ) -> ChatCompletionResponseStream {
        Box::pin(futures_util::stream::iter(items))
    }

    async fn collect(stream: ChatCompletionResponseStream) -> Vec<Result<StreamEvent, LlmError>> {
        map_openai_stream(stream).collect().await
    }

    #[tokio::test]
    async fn chunks_map_to_start_deltas_usage_and_stop() {
        let items = vec![
            Ok(chunk(
                r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1,"model":"grok-3-mini-fast-beta","choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"},"finish_reason":null}]}"#,
            )),
            Ok(chunk(
                r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1,"model":"grok-3-mini-fast-beta","choices":[{"index":0,"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
            )),
            Ok(chunk(
                r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1,"model":"grok-3-mini-fast-beta","choices":[],"usage":{"prompt_tokens":9,"completion_tokens":12,"total_tokens":21}}"#,
            )),
        ];

        let events: Vec<_> = collect(as_response_stream(items))
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(events.len(), 5);
        assert!(
            matches!(&events[0], StreamEvent::MessageStart { message_id } if message_id == "chatcmpl-1")
        );
        assert!(matches!(&events[1], StreamEvent::TextDelta { text } if text == "Hel"));
        assert!(matches!(&events[2], StreamEvent::TextDelta { text } if text == "lo"));
        assert!(matches!(
            events[3],
            StreamEvent::Usage(TokenUsage {
                input_tokens: 9,
                output_tokens: 12,
            })
        ));
        assert!(matches!(events[4], StreamEvent::MessageStop));
    }

    #[tokio::test]
    async fn empty_content_deltas_are_dropped() {
        let items = vec![Ok(chunk(
            r#"{"id":"chatcmpl-2","object":"chat.completion.chunk","created":1,"model":"grok-3-mini-fast-beta","choices":[{"index":0,"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#,
        ))];

        let events: Vec<_> = collect(as_response_stream(items))
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        // Start and stop only; the empty delta vanishes.
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StreamEvent::MessageStart { .. }));
        assert!(matches!(events[1], StreamEvent::MessageStop));
    }

    #[tokio::test]
    async fn chunk_errors_surface_as_stream_errors() {
        let items = vec![
            Ok(chunk(
                r#"{"id":"chatcmpl-3","object":"chat.completion.chunk","created":1,"model":"grok-3-mini-fast-beta","choices":[{"index":0,"delta":{"content":"partial"},"finish_reason":null}]}"#,
            )),
            Err(OpenAIError::InvalidArgument("connection dropped".to_string())),
        ];

        let events = collect(as_response_stream(items)).await;
        assert_eq!(events.len(), 3);
        assert!(events[0].is_ok());
        assert!(events[1].is_ok());
        assert!(matches!(&events[2], Err(LlmError::Stream(_))));
    }
}
