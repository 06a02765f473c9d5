//! Conversation orchestrator: the Ask / Stop / Reset state machine.
//!
//! One `Ask` runs rounds until the backend stops asking for tools:
//! 1. **Send**: mint a `RequestId`, register its token, open a stream with
//!    the full history
//! 2. **Stream**: forward text deltas to the sink, feed tool-call deltas to
//!    the round's `ToolCallBuilder`
//! 3. **Execute**: on a tool-calls finish, append the calls, dispatch them in
//!    order, append the results, then go back to 1
//!
//! A plain finish appends the assistant text and ends the `Ask`. Stop cancels
//! the round's token; the loop notices at the next update pull or after the
//! current tool batch. Backend failures and unknown tools end the `Ask` with a
//! generic failure message on the sink.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::inference::backend::{ModelBackend, StreamRequest};
use crate::inference::config::SettingsProvider;
use crate::inference::tool_call_builder::ToolCallBuilder;
use crate::inference::types::{FinishReason, OutputItem, StreamUpdate};
use crate::tools::ToolDispatcher;

use super::cancellation::{CancellationRegistry, StopHandle};
use super::conversation::{user_message, Conversation};
use super::errors::AgentError;
use super::sink::{OutputEvent, OutputSink};
use super::types::{AskOutcome, AskRequest, Message, OrchestratorState, RequestId, ToolCall};

// ─── Constants ──────────────────────────────────────────────────────────────

/// Shown instead of starting a round when endpoint or key is missing.
pub const MISSING_CONFIGURATION_HINT: &str =
    "Please configure your AI provider's API key in the settings.";

/// Shown when a round fails.
pub const GENERIC_FAILURE: &str = "Something went wrong.";

// ─── Orchestrator ───────────────────────────────────────────────────────────

/// Owns one chat session: its history, its cancellation registry and the
/// collaborators each round needs.
pub struct Orchestrator {
    backend: Arc<dyn ModelBackend>,
    settings: Arc<dyn SettingsProvider>,
    dispatcher: ToolDispatcher,
    conversation: Mutex<Conversation>,
    state: Mutex<OrchestratorState>,
    registry: CancellationRegistry,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        settings: Arc<dyn SettingsProvider>,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            backend,
            settings,
            dispatcher,
            conversation: Mutex::new(Conversation::new()),
            state: Mutex::new(OrchestratorState::Idle),
            registry: CancellationRegistry::new(),
        }
    }

    /// A handle the UI can use to stop the running round from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(self.registry.clone())
    }

    /// Stop the round identified by `id`. Idempotent.
    pub fn stop(&self, id: &RequestId) -> bool {
        self.registry.cancel(id)
    }

    pub fn state(&self) -> OrchestratorState {
        *lock(&self.state)
    }

    /// Snapshot of the history.
    pub fn history(&self) -> Vec<Message> {
        lock(&self.conversation).messages().to_vec()
    }

    /// Clear the history. Only valid while idle.
    pub fn reset(&self) -> Result<(), AgentError> {
        let state = lock(&self.state);
        if *state != OrchestratorState::Idle {
            return Err(AgentError::NotIdle {
                state: state.to_string(),
            });
        }
        lock(&self.conversation).clear();
        tracing::info!("orchestrator: conversation reset");
        Ok(())
    }

    /// Run one user turn to completion, cancellation or failure.
    ///
    /// Returns `NotIdle` if another `Ask` is already running. Every other
    /// failure is reported on `sink` and folded into the outcome.
    pub async fn ask(
        &self,
        request: AskRequest,
        sink: &mut dyn OutputSink,
    ) -> Result<AskOutcome, AgentError> {
        let _idle = {
            let mut state = lock(&self.state);
            if *state != OrchestratorState::Idle {
                return Err(AgentError::NotIdle {
                    state: state.to_string(),
                });
            }
            *state = OrchestratorState::Sending;
            ReturnToIdle(&self.state)
        };

        let settings = self.settings.settings()?;
        let (endpoint, api_key) = match settings.credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::warn!(error = %e, "orchestrator: ask rejected, provider not configured");
                sink.handle(OutputEvent::Notice(MISSING_CONFIGURATION_HINT));
                return Ok(AskOutcome::MissingConfiguration);
            }
        };

        let prompt = if request.prompt.trim().is_empty() {
            settings.prompts.user_prompt.as_str()
        } else {
            request.prompt.as_str()
        };
        let memory = request.memory.unwrap_or(settings.session.memory);
        let Some(user) = user_message(prompt, request.image) else {
            tracing::debug!("orchestrator: empty input ignored");
            return Ok(AskOutcome::EmptyInput);
        };

        lock(&self.conversation).begin_turn(&settings.prompts.system_prompt, user.clone(), memory);
        sink.handle(OutputEvent::Message(&user));

        let template = StreamRequest {
            endpoint,
            api_key,
            model: settings.provider.model.clone(),
            api: settings.provider.api,
            messages: Vec::new(),
            tools: if settings.session.computer_use {
                self.dispatcher.definitions()
            } else {
                Vec::new()
            },
        };

        let mut round = 0usize;
        loop {
            round += 1;
            let request_id = RequestId::new();
            let token = self.registry.register(&request_id);
            sink.handle(OutputEvent::RequestStarted(&request_id));
            tracing::info!(
                round,
                request_id = %request_id,
                tool_count = template.tools.len(),
                "orchestrator: round started"
            );

            let result = self.run_round(&template, &request_id, &token, sink).await;
            self.registry.release(&request_id);

            match result {
                Ok(RoundEnd::Finished) => {
                    tracing::info!(round, request_id = %request_id, "orchestrator: ask completed");
                    return Ok(AskOutcome::Completed);
                }
                Ok(RoundEnd::ToolsExecuted) if token.is_cancelled() => {
                    tracing::info!(round, request_id = %request_id, "orchestrator: stopped after tool batch");
                    return Ok(AskOutcome::Cancelled);
                }
                Ok(RoundEnd::ToolsExecuted) => continue,
                Ok(RoundEnd::Cancelled) => {
                    tracing::info!(round, request_id = %request_id, "orchestrator: stopped");
                    return Ok(AskOutcome::Cancelled);
                }
                Err(e) => {
                    tracing::warn!(round, request_id = %request_id, error = %e.summary(), "orchestrator: round failed");
                    sink.handle(OutputEvent::Error(GENERIC_FAILURE));
                    return Ok(AskOutcome::Errored);
                }
            }
        }
    }

    // ─── Rounds ─────────────────────────────────────────────────────────

    async fn run_round(
        &self,
        template: &StreamRequest,
        request_id: &RequestId,
        token: &CancellationToken,
        sink: &mut dyn OutputSink,
    ) -> Result<RoundEnd, AgentError> {
        self.set_state(OrchestratorState::Sending);
        let mut request = template.clone();
        request.messages = self.history();

        let mut stream = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(RoundEnd::Cancelled),
            opened = self.backend.open_stream(request, token.clone()) => opened?,
        };

        self.set_state(OrchestratorState::Streaming);
        let mut turn = RoundTurn::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    turn.close(sink);
                    return Ok(RoundEnd::Cancelled);
                }
                next = stream.next() => next,
            };

            let update = match next {
                Some(Ok(update)) => update,
                Some(Err(e)) => {
                    turn.close(sink);
                    return Err(e.into());
                }
                None => {
                    turn.close(sink);
                    return Err(AgentError::StreamEndedWithoutFinish {
                        request_id: request_id.to_string(),
                    });
                }
            };

            match update {
                StreamUpdate::TextDelta(text) => turn.push_text(&text, sink),
                StreamUpdate::ToolCallDelta(delta) => {
                    tracing::trace!(index = delta.index, "orchestrator: tool call delta");
                    turn.builder.append(delta);
                }
                StreamUpdate::ItemDone(OutputItem::Message { text }) => {
                    if turn.text.is_empty() {
                        turn.push_text(&text, sink);
                    }
                    turn.close(sink);
                }
                StreamUpdate::ItemDone(OutputItem::FunctionCall(call)) => {
                    turn.completed.push(call);
                }
                StreamUpdate::Finish(reason) => {
                    turn.close(sink);
                    return self.finish_round(reason, turn, sink).await;
                }
            }
        }
    }

    async fn finish_round(
        &self,
        reason: FinishReason,
        turn: RoundTurn,
        sink: &mut dyn OutputSink,
    ) -> Result<RoundEnd, AgentError> {
        let (text, calls) = turn.into_parts();

        match reason {
            FinishReason::ToolCalls if !calls.is_empty() => {
                self.execute_tools(calls, &text, sink).await?;
                Ok(RoundEnd::ToolsExecuted)
            }
            reason => {
                if reason != FinishReason::Stop {
                    tracing::warn!(?reason, dropped_calls = calls.len(), "orchestrator: finish treated as stop");
                }
                lock(&self.conversation).add_assistant_text(&text);
                Ok(RoundEnd::Finished)
            }
        }
    }

    /// Dispatch `calls` one at a time, in order. Results land in history in
    /// the same order; skipped calls leave no result.
    async fn execute_tools(
        &self,
        calls: Vec<ToolCall>,
        text: &str,
        sink: &mut dyn OutputSink,
    ) -> Result<(), AgentError> {
        self.set_state(OrchestratorState::ToolExecuting);
        tracing::info!(
            tool_count = calls.len(),
            tool_names = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "orchestrator: executing tools"
        );
        lock(&self.conversation).add_tool_calls(calls.clone(), text);

        for call in &calls {
            sink.handle(OutputEvent::ToolCall(call));
            if let Some(result) = self.dispatcher.dispatch(call).await? {
                let shown = Message::tool_result(result.call_id.as_str(), result.content.as_str());
                sink.handle(OutputEvent::Message(&shown));
                lock(&self.conversation).add_tool_result(result);
            }
        }
        Ok(())
    }

    fn set_state(&self, next: OrchestratorState) {
        let mut state = lock(&self.state);
        let previous = *state;
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "orchestrator: state");
            *state = next;
        }
    }
}

// ─── Round-scoped state ─────────────────────────────────────────────────────

/// How a round ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundEnd {
    Finished,
    ToolsExecuted,
    Cancelled,
}

/// Everything one round accumulates. Dropped when the round ends.
#[derive(Debug, Default)]
struct RoundTurn {
    text: String,
    builder: ToolCallBuilder,
    /// Calls delivered whole (`ItemDone`), kept after the reconstructed ones.
    completed: Vec<ToolCall>,
    turn_open: bool,
}

impl RoundTurn {
    fn push_text(&mut self, text: &str, sink: &mut dyn OutputSink) {
        if text.is_empty() {
            return;
        }
        if !self.turn_open {
            self.turn_open = true;
            sink.handle(OutputEvent::AssistantTurnStarted);
        }
        sink.handle(OutputEvent::TextChunk(text));
        self.text.push_str(text);
    }

    fn close(&mut self, sink: &mut dyn OutputSink) {
        if self.turn_open {
            self.turn_open = false;
            sink.handle(OutputEvent::AssistantTurnEnded);
        }
    }

    /// Assistant text and the final call list, de-duplicated by id.
    fn into_parts(self) -> (String, Vec<ToolCall>) {
        let mut calls = self.builder.build();
        for call in self.completed {
            if !calls.iter().any(|c| c.id == call.id) {
                calls.push(call);
            }
        }
        (self.text, calls)
    }
}

/// Puts the orchestrator back to `Idle` however `ask` exits.
struct ReturnToIdle<'a>(&'a Mutex<OrchestratorState>);

impl Drop for ReturnToIdle<'_> {
    fn drop(&mut self) {
        *lock(self.0) = OrchestratorState::Idle;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
