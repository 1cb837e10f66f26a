//! The autonomous agent loop.
//!
//! Turns one natural-language instruction into a bounded sequence of
//! model turns and tool dispatches against the world-state projection,
//! forwarding observable events to the caller as they are produced.
//!
//! One in-flight model request at a time; tool calls within a turn
//! dispatch strictly in request order, because later calls may reference
//! entities the earlier ones just created or renamed.

use std::sync::Arc;

use loomweave_core::graph::WorldStateProjection;
use loomweave_core::message::{Conversation, Message};
use loomweave_core::provider::{ModelEvent, Provider, ToolCallRequest, TurnRequest};
use loomweave_core::run::RunConfig;
use loomweave_core::tool::{EffectStarter, ToolRegistry};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::projector;
use crate::run_event::RunEvent;

/// The loop's position in its state machine, traced per transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Idle,
    AwaitingModel,
    DispatchingTools,
    Done,
    Failed,
}

/// What a finished run looked like, for callers and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// 1-based count of model turns taken.
    pub iterations: u32,
    /// True when the run ended in a transport/protocol failure.
    pub failed: bool,
    /// The last assistant text of the run.
    pub final_text: String,
}

/// The orchestrator: one instance per run family, no state between runs.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        Self { provider, tools }
    }

    /// Execute one run to completion.
    ///
    /// Every event is awaited into `events` before the loop continues,
    /// so a slow consumer throttles the producer directly. Every run
    /// ends with exactly one `Done` event.
    pub async fn run(
        &self,
        user_message: &str,
        world: &mut WorldStateProjection,
        config: &RunConfig,
        effect_starter: EffectStarter,
        events: mpsc::Sender<RunEvent>,
    ) -> RunSummary {
        let mut phase = RunPhase::Idle;
        let mut conversation = Conversation::seeded(config.conversation_history.clone());
        conversation.push(Message::user(user_message));

        debug!(run_id = %config.run_id, model = %config.model, "Starting run");

        for iteration in 1..=config.max_iterations {
            transition(&mut phase, RunPhase::AwaitingModel, &config.run_id);

            let request = TurnRequest {
                model: config.model.clone(),
                messages: conversation.messages.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                tools: self.tools.definitions(),
            };

            let mut rx = match self.provider.stream_turn(request).await {
                Ok(rx) => rx,
                Err(e) => {
                    transition(&mut phase, RunPhase::Failed, &config.run_id);
                    warn!(run_id = %config.run_id, error = %e, "Model request failed");
                    let _ = events.send(RunEvent::Error { message: e.to_string() }).await;
                    let _ = events.send(RunEvent::Done { iterations: iteration }).await;
                    return RunSummary {
                        iterations: iteration,
                        failed: true,
                        final_text: final_text_of(&conversation),
                    };
                }
            };

            let mut turn_text = String::new();
            let mut calls: Vec<ToolCallRequest> = Vec::new();
            let mut stream_failure = None;

            while let Some(item) = rx.recv().await {
                match item {
                    Ok(ModelEvent::Text { delta }) => {
                        turn_text.push_str(&delta);
                        let _ = events.send(RunEvent::Response { content: delta }).await;
                    }
                    Ok(ModelEvent::ToolCallComplete { call }) => {
                        let _ = events
                            .send(RunEvent::ToolCall {
                                name: call.name.clone(),
                                args: call.arguments.clone(),
                                id: call.id.clone(),
                            })
                            .await;
                        calls.push(call);
                    }
                    // Start/delta fragments are internal to the normalizer.
                    Ok(ModelEvent::ToolCallStart { .. }) | Ok(ModelEvent::ToolCallDelta { .. }) => {}
                    Err(e) => {
                        stream_failure = Some(e);
                        break;
                    }
                }
            }

            if let Some(e) = stream_failure {
                // Nothing from a broken turn is dispatched.
                transition(&mut phase, RunPhase::Failed, &config.run_id);
                warn!(run_id = %config.run_id, error = %e, "Model stream failed");
                let _ = events.send(RunEvent::Error { message: e.to_string() }).await;
                let _ = events.send(RunEvent::Done { iterations: iteration }).await;
                return RunSummary {
                    iterations: iteration,
                    failed: true,
                    final_text: final_text_of(&conversation),
                };
            }

            let mut assistant = Message::assistant(&turn_text);
            assistant.tool_calls = calls.clone();
            conversation.push(assistant);

            if calls.is_empty() {
                transition(&mut phase, RunPhase::Done, &config.run_id);
                debug!(run_id = %config.run_id, iterations = iteration, "Run complete");
                let _ = events.send(RunEvent::Done { iterations: iteration }).await;
                return RunSummary {
                    iterations: iteration,
                    failed: false,
                    final_text: final_text_of(&conversation),
                };
            }

            transition(&mut phase, RunPhase::DispatchingTools, &config.run_id);

            for call in &calls {
                let outcome = self
                    .tools
                    .dispatch(
                        &call.name,
                        &call.arguments,
                        world,
                        &config.run_id,
                        &effect_starter,
                    )
                    .await;

                let result = serde_json::to_value(&outcome).unwrap_or_else(
                    |_| serde_json::json!({"ok": false, "error": "unserializable tool outcome"}),
                );
                let _ = events
                    .send(RunEvent::ToolResult {
                        name: call.name.clone(),
                        result,
                        id: call.id.clone(),
                    })
                    .await;

                // Even a failed call gets a tool message: the model's next
                // turn needs to see what went wrong.
                conversation.push(Message::tool_result(&call.id, outcome.to_json_string()));

                projector::apply(world, &call.name, &call.arguments, &outcome);
            }
        }

        // Budget exhausted. A visible notice distinguishes "finished"
        // from "cut off".
        transition(&mut phase, RunPhase::Done, &config.run_id);
        let notice = format!(
            "Reached the maximum of {} iterations; stopping here. The task may be incomplete.",
            config.max_iterations
        );
        let _ = events.send(RunEvent::Response { content: notice.clone() }).await;
        let _ = events
            .send(RunEvent::Done { iterations: config.max_iterations })
            .await;

        // The notice joins the conversation so it reads as the run's
        // final assistant text.
        conversation.push(Message::assistant(&notice));

        RunSummary {
            iterations: config.max_iterations,
            failed: false,
            final_text: final_text_of(&conversation),
        }
    }
}

fn transition(phase: &mut RunPhase, next: RunPhase, run_id: &str) {
    trace!(run_id, from = ?*phase, to = ?next, "Phase transition");
    *phase = next;
}

fn final_text_of(conversation: &Conversation) -> String {
    conversation
        .last_assistant_text()
        .unwrap_or_default()
        .to_string()
}
