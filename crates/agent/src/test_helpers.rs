//! Shared test helpers for agent loop tests.

use gitscribe_core::error::ProviderError;
use gitscribe_core::message::{Message, MessageToolCall};
use gitscribe_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

enum Script {
    /// Each call returns the next response; panics when exhausted.
    Sequence(Vec<ProviderResponse>),
    /// Every call returns the same response.
    Looping(ProviderResponse),
    /// Every call fails.
    Failing(ProviderError),
}

/// A mock provider that returns scripted responses and records requests.
pub struct SequentialMockProvider {
    script: Script,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_script(Script::Sequence(responses))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, thought),
            make_text_response(answer),
        ])
    }

    pub fn looping(response: ProviderResponse) -> Self {
        Self::with_script(Script::Looping(response))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::with_script(Script::Failing(error))
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };

        match &self.script {
            Script::Sequence(responses) => match responses.get(call) {
                Some(response) => Ok(response.clone()),
                None => panic!(
                    "SequentialMockProvider: no more responses (call #{call}, have {})",
                    responses.len()
                ),
            },
            Script::Looping(response) => Ok(response.clone()),
            Script::Failing(error) => Err(error.clone()),
        }
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
        metadata: serde_json::Map::new(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools(thought, tool_calls),
        ..make_text_response("")
    }
}

/// Helper to create a tool call with id `call_<name>`.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}
