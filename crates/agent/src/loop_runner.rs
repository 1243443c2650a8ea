//! The agent reasoning loop implementation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use gitscribe_core::event::{DomainEvent, EventBus};
use gitscribe_core::message::{History, HistoryUpdate, Message, MessageToolCall};
use gitscribe_core::provider::{Provider, ProviderRequest, ToolDefinition};
use gitscribe_core::tool::{ToolCall, ToolRegistry, ToolResult};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::answer::final_answer;
use crate::instructions::SystemInstruction;
use crate::stream_event::{AgentStreamEvent, preview, short_id};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingModel,
    ExecutingTools,
    Done,
    Failed,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model gave an answer without tool requests.
    Done,
    /// The run needed more than `limit` steps.
    StepLimitExceeded { limit: usize },
    /// The run could not continue.
    Fault { message: String },
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Done => "done",
            RunOutcome::StepLimitExceeded { .. } => "step_limit_exceeded",
            RunOutcome::Fault { .. } => "fault",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RunOutcome::Done)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Done => f.write_str("done"),
            RunOutcome::StepLimitExceeded { limit } => {
                write!(f, "stopped after reaching the step limit of {limit}")
            }
            RunOutcome::Fault { message } => write!(f, "fault: {message}"),
        }
    }
}

/// The result of one single-shot run.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    pub outcome: RunOutcome,
    /// Model calls plus tool batches
    pub steps: usize,
    pub history: History,
}

impl AgentRun {
    /// The event that ends a stream for this run.
    pub fn terminal_event(&self) -> AgentStreamEvent {
        match &self.outcome {
            RunOutcome::Fault { message } => AgentStreamEvent::error(message.clone()),
            outcome => AgentStreamEvent::Complete {
                final_response: self.answer.clone(),
                outcome: outcome.as_str().into(),
                steps: self.steps,
            },
        }
    }
}

type Progress<'a> = Option<&'a mpsc::UnboundedSender<AgentStreamEvent>>;

/// The agent loop: alternates model calls and tool batches over one
/// history until the model answers without tool requests.
pub struct AgentLoop {
    /// The model provider to use
    provider: Arc<dyn Provider>,

    /// Tools the model may request
    tools: Arc<ToolRegistry>,

    /// Prepended to every model call, never stored in history
    instruction: SystemInstruction,

    model: String,
    temperature: f32,
    max_tokens: Option<u32>,

    /// Model calls plus tool batches allowed per run
    max_steps: usize,

    /// Characters of each tool result shown in progress events
    preview_chars: usize,

    event_bus: Option<Arc<EventBus>>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        instruction: SystemInstruction,
    ) -> Self {
        Self {
            provider,
            tools,
            instruction,
            model: "gemini-1.5-flash-latest".into(),
            temperature: 0.7,
            max_tokens: None,
            max_steps: 25,
            preview_chars: 100,
            event_bus: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the step bound. Zero is raised to one.
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// Publish domain events for every model call, tool execution and run end.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn instruction(&self) -> &SystemInstruction {
        &self.instruction
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run to completion and return the aggregated answer.
    pub async fn run(&self, prompt: impl Into<String>) -> AgentRun {
        self.drive(prompt.into(), None).await
    }

    /// Run on a spawned task, reporting progress as it goes.
    ///
    /// The receiver yields `status`/`log` events and then exactly one
    /// terminal event, after which the channel closes. A panic inside the
    /// run is reported as an `error` event.
    pub fn run_stream(
        self: Arc<Self>,
        prompt: impl Into<String>,
    ) -> mpsc::UnboundedReceiver<AgentStreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let prompt = prompt.into();
        let progress_tx = tx.clone();

        let worker = tokio::spawn(async move { self.drive(prompt, Some(&progress_tx)).await });

        tokio::spawn(async move {
            let terminal = match worker.await {
                Ok(run) => run.terminal_event(),
                Err(e) => {
                    error!(error = %e, "Streaming run aborted");
                    AgentStreamEvent::error(format!("An error occurred during processing: {e}"))
                }
            };
            let _ = tx.send(terminal);
        });

        rx
    }

    async fn drive(&self, prompt: String, progress: Progress<'_>) -> AgentRun {
        let mut history = History::new(prompt);
        let run_id = history.id.clone();
        let definitions = self.tools.definitions();
        let mut phase = Phase::AwaitingModel;
        let mut outcome = RunOutcome::Done;
        let mut steps = 0usize;

        info!(
            run_id = %run_id,
            tools = definitions.len(),
            max_steps = self.max_steps,
            "Starting agent run"
        );

        loop {
            if matches!(phase, Phase::Done | Phase::Failed) {
                break;
            }
            if steps >= self.max_steps {
                warn!(run_id = %run_id, steps, "Step limit reached before a final answer");
                emit(
                    progress,
                    format!("Agent: Step limit of {} reached.", self.max_steps),
                    "Step limit reached.".to_string(),
                );
                outcome = RunOutcome::StepLimitExceeded {
                    limit: self.max_steps,
                };
                break;
            }
            steps += 1;
            debug!(run_id = %run_id, step = steps, phase = ?phase, "Agent step");

            let applied = match phase {
                Phase::AwaitingModel => {
                    let message = self.call_model(&history, &definitions, &run_id).await;
                    report_model_turn(progress, &message);
                    history.apply(HistoryUpdate::Model(message))
                }
                Phase::ExecutingTools => {
                    let requests = history.pending_tool_calls().to_vec();
                    let results = self.execute_batch(&requests, &run_id).await;
                    self.report_tool_batch(progress, &results);
                    history.apply(HistoryUpdate::ToolResults(
                        results.into_iter().map(ToolResult::into_message).collect(),
                    ))
                }
                Phase::Done | Phase::Failed => break,
            };

            phase = match (phase, applied) {
                (_, Err(e)) => {
                    error!(run_id = %run_id, error = %e, "History rejected an update");
                    outcome = RunOutcome::Fault {
                        message: format!("Agent history rejected an update: {e}"),
                    };
                    Phase::Failed
                }
                (Phase::AwaitingModel, Ok(())) if history.pending_tool_calls().is_empty() => {
                    Phase::Done
                }
                (Phase::AwaitingModel, Ok(())) => Phase::ExecutingTools,
                (_, Ok(())) => Phase::AwaitingModel,
            };
        }

        let answer = final_answer(&history);
        self.publish(DomainEvent::RunFinished {
            run_id: run_id.clone(),
            outcome: outcome.as_str().into(),
            steps,
            timestamp: Utc::now(),
        });
        info!(run_id = %run_id, outcome = outcome.as_str(), steps, "Agent run finished");

        AgentRun {
            answer,
            outcome,
            steps,
            history,
        }
    }

    /// One model turn. Provider faults become a final answer describing them.
    async fn call_model(
        &self,
        history: &History,
        tools: &[ToolDefinition],
        run_id: &str,
    ) -> Message {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.instruction.as_str()));
        messages.extend(history.messages().iter().cloned());

        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: tools.to_vec(),
        };

        match self.provider.complete(request).await {
            Ok(response) => {
                let mut message = response.message;
                normalize_call_ids(&mut message.tool_calls);
                debug!(
                    run_id = %run_id,
                    tool_requests = message.tool_calls.len(),
                    content = %preview(&message.content, 100),
                    "Model responded"
                );
                self.publish(DomainEvent::ModelInvoked {
                    run_id: run_id.to_string(),
                    model: response.model,
                    tool_requests: message.tool_calls.len(),
                    tokens_used: response.usage.map(|u| u.total_tokens).unwrap_or(0),
                    timestamp: Utc::now(),
                });
                message
            }
            Err(e) => {
                warn!(run_id = %run_id, provider = self.provider.name(), error = %e, "Model invocation failed");
                self.publish(DomainEvent::ErrorOccurred {
                    context: format!("provider:{}", self.provider.name()),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Message::assistant(format!("Error invoking model: {e}"))
            }
        }
    }

    /// Execute the requests of one model message, sequentially and in order.
    async fn execute_batch(&self, requests: &[MessageToolCall], run_id: &str) -> Vec<ToolResult> {
        debug!(run_id = %run_id, tool_count = requests.len(), "Executing tool calls");
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.execute_one(request, run_id).await);
        }
        results
    }

    async fn execute_one(&self, request: &MessageToolCall, run_id: &str) -> ToolResult {
        if self.tools.get(&request.name).is_none() {
            warn!(run_id = %run_id, tool = %request.name, "Model requested an unknown tool");
            return ToolResult {
                call_id: request.id.clone(),
                tool_name: request.name.clone(),
                success: false,
                output: format!("Error: Tool '{}' unavailable.", request.name),
            };
        }

        let started = Instant::now();
        let executed = match ToolCall::parse(request) {
            Ok(call) => self.tools.execute(&call).await,
            Err(e) => Err(e),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let (success, output) = match executed {
            Ok(output) => (true, output.render()),
            Err(e) => {
                warn!(run_id = %run_id, tool = %request.name, error = %e, "Tool execution failed");
                (false, format!("Error: tool '{}' failed: {e}", request.name))
            }
        };

        self.publish(DomainEvent::ToolExecuted {
            run_id: run_id.to_string(),
            tool_name: request.name.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        ToolResult {
            call_id: request.id.clone(),
            tool_name: request.name.clone(),
            success,
            output,
        }
    }

    fn report_tool_batch(&self, progress: Progress<'_>, results: &[ToolResult]) {
        if progress.is_none() {
            return;
        }
        let summary: Vec<String> = results
            .iter()
            .map(|r| {
                format!(
                    "Tool Result ({}): {}",
                    short_id(&r.call_id),
                    preview(&r.output, self.preview_chars)
                )
            })
            .collect();
        emit(
            progress,
            summary.join("; "),
            format!("Tool results processed: {} message(s).", results.len()),
        );
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

fn report_model_turn(progress: Progress<'_>, message: &Message) {
    if message.tool_calls.is_empty() {
        emit(
            progress,
            "Agent: Formulating final response...".into(),
            "Agent formulating final response.".into(),
        );
    } else {
        let names: Vec<&str> = message.tool_calls.iter().map(|tc| tc.name.as_str()).collect();
        let names = names.join(", ");
        emit(
            progress,
            format!("Agent: Requesting tool(s) - {names}"),
            format!("Agent requesting tools: {names}"),
        );
    }
}

fn emit(progress: Progress<'_>, status: String, log: String) {
    if let Some(tx) = progress {
        // A dropped receiver does not stop the run
        let _ = tx.send(AgentStreamEvent::Status { message: status });
        let _ = tx.send(AgentStreamEvent::Log { data: log });
    }
}

/// Give every tool request a unique, non-empty call id.
fn normalize_call_ids(calls: &mut [MessageToolCall]) {
    let mut seen = HashSet::new();
    for call in calls.iter_mut() {
        if call.id.trim().is_empty() || seen.contains(&call.id) {
            call.id = format!("call_{}", Uuid::new_v4().simple());
        }
        seen.insert(call.id.clone());
    }
}
