//! WebSocket chat endpoint.
//!
//! `/ws/{user_id}` upgrades an HTTP connection to a WebSocket. Once
//! connected, the handler:
//!
//! - **Registers the connection:** the outbound side goes through the
//!   [`ConnectionRegistry`], so a reconnect replaces the previous channel
//!   and frames follow the newest socket.
//! - **Resolves the session:** get-or-create against the store, so a bare
//!   socket works without a prior `start_session` call.
//! - **Processes messages serially:** each text frame runs the full
//!   pipeline (history, budget gate, streamed generation with failover,
//!   locked append) before the next frame is read.
//!
//! Failures of one message are reported as an `error` frame and the
//! connection stays up; a store failure closes it, since nothing further
//! can be persisted.
//!
//! [`ConnectionRegistry`]: confab_core::registry::ConnectionRegistry

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::Instrument;

use confab_core::registry::UserChannel;
use confab_types::chat::Turn;
use confab_types::error::GatewayError;
use confab_types::frame::StreamFrame;
use confab_types::llm::CompletionRequest;

use crate::state::AppState;

/// Display name recorded when the socket mints the session itself.
const WS_DISPLAY_NAME: &str = "WebSocket User";

/// Final error frame payload when the connection is beyond saving.
const CONNECTION_ERROR_MESSAGE: &str = "Connection error. Please refresh and try again.";

/// Upgrade an HTTP request to a WebSocket chat connection.
///
/// This is mounted at `/ws/{user_id}` in the router.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, user_id, state))
}

/// Core WebSocket connection handler.
///
/// The socket is split: a writer task drains the registry channel onto the
/// sink, while this task owns the receive loop. Anything holding the
/// registry can then stream frames to this user while a generation is in
/// flight here.
async fn handle_ws_connection(socket: WebSocket, user_id: String, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<StreamFrame>();
    state.registry.connect(&user_id, frame_tx.clone());

    let writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            match serde_json::to_string(&frame) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        // Client disconnected
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!("Failed to serialize frame: {err}");
                }
            }
        }
    });

    let session = match state
        .sessions
        .get_or_create(&user_id, WS_DISPLAY_NAME)
        .await
    {
        Ok(session) => session,
        Err(err) => {
            tracing::error!(user_id = %user_id, error = %err, "failed to resolve session on connect");
            let _ = frame_tx.send(StreamFrame::error(None, CONNECTION_ERROR_MESSAGE));
            state.registry.disconnect_channel(&user_id, &frame_tx);
            drop(frame_tx);
            let _ = writer.await;
            return;
        }
    };
    tracing::info!(
        user_id = %user_id,
        session_key = %session.session_key,
        "websocket session open"
    );

    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let span = tracing::info_span!("chat_message", user_id = %user_id);
                let result = run_pipeline(&state, &user_id, &session.session_key, text.as_str())
                    .instrument(span)
                    .await;

                match result {
                    Ok(()) => {}
                    Err(err @ GatewayError::Store(_)) => {
                        tracing::error!(
                            user_id = %user_id,
                            error = %err,
                            "session store failed mid-connection, closing"
                        );
                        let _ = frame_tx.send(StreamFrame::error(None, CONNECTION_ERROR_MESSAGE));
                        break;
                    }
                    Err(err) => {
                        // Per-message failure: report it on the stream and
                        // keep the connection for the next message.
                        tracing::warn!(user_id = %user_id, error = %err, "message pipeline failed");
                        let _ = frame_tx.send(StreamFrame::error(None, err.to_string()));
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(err) => {
                tracing::debug!("WebSocket receive error: {err}");
                break;
            }
            // Ignore binary, ping, pong protocol frames (handled by axum/tungstenite)
            Ok(_) => {}
        }
    }

    state.registry.disconnect_channel(&user_id, &frame_tx);
    drop(frame_tx);
    let _ = writer.await;
    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}

/// One message through the full pipeline: history in, budget gate, streamed
/// generation with failover, locked append of the turn pair.
///
/// The pair is appended even when the client vanished mid-stream; a partial
/// answer is still conversation state the user will want on reconnect.
async fn run_pipeline(
    state: &AppState,
    user_id: &str,
    session_key: &str,
    text: &str,
) -> Result<(), GatewayError> {
    let mut messages = state.sessions.read_history(session_key).await?;
    messages.push(Turn::user(text));
    let request = CompletionRequest {
        messages,
        system: None,
    };

    state.budget.check(&request)?;

    let sink = UserChannel::new(Arc::clone(&state.registry), user_id);
    let outcome = state.orchestrator.generate(request, &sink).await?;

    if let Some(usage) = outcome.usage {
        confab_observe::genai_attrs::record_usage(
            &tracing::Span::current(),
            usage.input_tokens,
            usage.output_tokens,
        );
    }
    if outcome.aborted {
        tracing::debug!(user_id, "client left mid-stream, persisting the partial answer");
    }

    state
        .lock
        .append_with_lock(session_key, &Turn::user(text), &Turn::assistant(outcome.text))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::pin::Pin;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use futures_util::{Stream, stream};

    use confab_core::budget::TokenBudget;
    use confab_core::llm::failover::FailoverOrchestrator;
    use confab_core::llm::provider::LlmProvider;
    use confab_core::registry::ConnectionRegistry;
    use confab_core::session::lock::SessionLock;
    use confab_core::session::service::SessionService;
    use confab_infra::store::{MemorySessionStore, SessionStoreBackend};
    use confab_types::config::GatewayConfig;
    use confab_types::frame::FrameType;
    use confab_types::llm::{LlmError, StreamEvent, TokenUsage};

    struct ScriptedProvider {
        events: Vec<StreamEvent>,
        calls: Arc<AtomicU32>,
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn stream(
            &self,
            _request: CompletionRequest,
        ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let events: Vec<_> = self.events.iter().cloned().map(Ok).collect();
            Box::pin(stream::iter(events))
        }
    }

    fn scripted_state(events: Vec<StreamEvent>, budget: usize) -> (AppState, Arc<AtomicU32>) {
        let config = GatewayConfig::default();
        let calls = Arc::new(AtomicU32::new(0));

        let store = SessionStoreBackend::Memory(MemorySessionStore::new());
        let sessions = SessionService::new(store.clone(), Duration::from_secs(3_600));
        let lock = SessionLock::new(store, sessions.clone(), config.lock.clone(), false);
        let orchestrator = FailoverOrchestrator::new(
            Box::new(ScriptedProvider {
                events: events.clone(),
                calls: Arc::clone(&calls),
            }),
            Box::new(ScriptedProvider {
                events,
                calls: Arc::clone(&calls),
            }),
        );

        let state = AppState {
            config: Arc::new(config),
            sessions,
            lock,
            registry: Arc::new(ConnectionRegistry::new()),
            orchestrator: Arc::new(orchestrator),
            budget: TokenBudget::new(budget),
        };
        (state, calls)
    }

    fn answer_script() -> Vec<StreamEvent> {
        vec![
            StreamEvent::MessageStart {
                message_id: "msg_01".to_string(),
            },
            StreamEvent::TextDelta {
                text: "Hello".to_string(),
            },
            StreamEvent::TextDelta {
                text: " there".to_string(),
            },
            StreamEvent::Usage(TokenUsage {
                input_tokens: 10,
                output_tokens: 4,
            }),
            StreamEvent::MessageStop,
        ]
    }

    #[tokio::test]
    async fn pipeline_streams_frames_and_persists_the_turn_pair() {
        let (state, _) = scripted_state(answer_script(), 150_000);
        let session = state
            .sessions
            .get_or_create("u1", WS_DISPLAY_NAME)
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        state.registry.connect("u1", tx);

        run_pipeline(&state, "u1", &session.session_key, "hi")
            .await
            .unwrap();

        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        assert_eq!(frames[0].frame_type, FrameType::MessageStart);
        assert_eq!(frames[0].message_id.as_deref(), Some("msg_01"));
        assert_eq!(frames[1].frame_type, FrameType::Streaming);
        assert_eq!(frames.last().unwrap().frame_type, FrameType::MessageStop);
        assert!(frames.last().unwrap().data.contains("Input tokens: 10"));

        let history = state
            .sessions
            .read_history(&session.session_key)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1].content, "Hello there");
    }

    #[tokio::test]
    async fn over_budget_message_never_reaches_a_provider() {
        let (state, calls) = scripted_state(answer_script(), 2);
        let session = state
            .sessions
            .get_or_create("u1", WS_DISPLAY_NAME)
            .await
            .unwrap();

        let oversized = "x".repeat(40);
        let err = run_pipeline(&state, "u1", &session.session_key, &oversized)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::BudgetExceeded { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let history = state
            .sessions
            .read_history(&session.session_key)
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn aborted_delivery_still_persists_the_turn_pair() {
        // No channel registered: every frame is refused, the relay aborts,
        // and whatever text accumulated still lands in history.
        let (state, _) = scripted_state(answer_script(), 150_000);
        let session = state
            .sessions
            .get_or_create("u1", WS_DISPLAY_NAME)
            .await
            .unwrap();

        run_pipeline(&state, "u1", &session.session_key, "hi")
            .await
            .unwrap();

        let history = state
            .sessions
            .read_history(&session.session_key)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hi");
    }
}
