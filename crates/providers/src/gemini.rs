//! Google Gemini provider (`generateContent`).
//!
//! The system message becomes `systemInstruction`, assistant turns use role
//! `model`, and tool results become `functionResponse` parts. Gemini does not
//! return call ids, so each `functionCall` gets a fresh one; a tool result is
//! matched back to its function name through the originating call id.

use async_trait::async_trait;
use gitscribe_core::error::ProviderError;
use gitscribe_core::message::{Message, MessageToolCall, Role};
use gitscribe_core::provider::*;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Convert messages to `(systemInstruction, contents)`.
    ///
    /// Consecutive tool results are folded into one `user` turn.
    fn to_api_contents(messages: &[Message]) -> (Option<serde_json::Value>, Vec<serde_json::Value>) {
        let call_names: HashMap<&str, &str> = messages
            .iter()
            .flat_map(|m| m.tool_calls.iter())
            .map(|tc| (tc.id.as_str(), tc.name.as_str()))
            .collect();

        let mut system: Vec<&str> = Vec::new();
        let mut contents: Vec<serde_json::Value> = Vec::new();
        let mut pending_responses: Vec<serde_json::Value> = Vec::new();

        let flush = |pending: &mut Vec<serde_json::Value>, contents: &mut Vec<serde_json::Value>| {
            if !pending.is_empty() {
                contents.push(serde_json::json!({
                    "role": "user",
                    "parts": std::mem::take(pending),
                }));
            }
        };

        for msg in messages {
            if msg.role != Role::Tool {
                flush(&mut pending_responses, &mut contents);
            }
            match msg.role {
                Role::System => system.push(&msg.content),
                Role::User => contents.push(serde_json::json!({
                    "role": "user",
                    "parts": [{ "text": msg.content }],
                })),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(serde_json::json!({ "text": msg.content }));
                    }
                    for tc in &msg.tool_calls {
                        let args: serde_json::Value = serde_json::from_str(&tc.arguments)
                            .unwrap_or_else(|_| serde_json::json!({}));
                        parts.push(serde_json::json!({
                            "functionCall": { "name": tc.name, "args": args }
                        }));
                    }
                    if parts.is_empty() {
                        parts.push(serde_json::json!({ "text": "" }));
                    }
                    contents.push(serde_json::json!({ "role": "model", "parts": parts }));
                }
                Role::Tool => {
                    let call_id = msg.tool_call_id.as_deref().unwrap_or_default();
                    let name = call_names.get(call_id).copied().unwrap_or(call_id);
                    pending_responses.push(serde_json::json!({
                        "functionResponse": {
                            "name": name,
                            "response": { "result": msg.content },
                        }
                    }));
                }
            }
        }
        flush(&mut pending_responses, &mut contents);

        let system_instruction = (!system.is_empty()).then(|| {
            serde_json::json!({ "parts": [{ "text": system.join("\n\n") }] })
        });
        (system_instruction, contents)
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> serde_json::Value {
        let declarations: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect();
        serde_json::json!([{ "functionDeclarations": declarations }])
    }

    fn from_api_response(model: &str, api: GenerateResponse) -> Result<ProviderResponse, ProviderError> {
        if let Some(reason) = api.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("Prompt blocked by Gemini: {reason}"),
            });
        }

        let candidate = api
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No candidates in response".into()))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                content.push_str(&text);
            }
            if let Some(call) = part.function_call {
                let args = if call.args.is_null() {
                    serde_json::json!({})
                } else {
                    call.args
                };
                tool_calls.push(MessageToolCall {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: call.name,
                    arguments: args.to_string(),
                });
            }
        }

        let mut metadata = serde_json::Map::new();
        if let Some(reason) = candidate.finish_reason {
            metadata.insert("finish_reason".into(), serde_json::Value::String(reason));
        }

        let usage = api.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        Ok(ProviderResponse {
            message: Message::assistant_with_tools(content, tool_calls),
            usage,
            model: api.model_version.unwrap_or_else(|| model.to_string()),
            metadata,
        })
    }
}

#[async_trait]
impl gitscribe_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, request.model);
        let (system_instruction, contents) = Self::to_api_contents(&request.messages);

        let mut generation_config = serde_json::json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = serde_json::json!(max_tokens);
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if let Some(sys) = system_instruction {
            body["systemInstruction"] = sys;
        }
        if !request.tools.is_empty() {
            body["tools"] = Self::to_api_tools(&request.tools);
        }

        debug!(model = %request.model, turns = contents_len(&body), "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Gemini rejected the API key".into(),
            ));
        }
        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        Self::from_api_response(&request.model, api)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

fn contents_len(body: &serde_json::Value) -> usize {
    body["contents"].as_array().map_or(0, Vec::len)
}

// --- Gemini API types (internal) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitscribe_core::Provider;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(messages: Vec<Message>, tools: Vec<ToolDefinition>) -> ProviderRequest {
        ProviderRequest {
            model: "gemini-1.5-flash-latest".into(),
            messages,
            temperature: 0.7,
            max_tokens: None,
            tools,
        }
    }

    #[test]
    fn folds_tool_results_and_resolves_function_names() {
        let messages = vec![
            Message::system("You manage files"),
            Message::user("read notes.md"),
            Message::assistant_with_tools(
                "",
                vec![
                    MessageToolCall {
                        id: "c1".into(),
                        name: "read_file".into(),
                        arguments: r#"{"file_path":"notes.md"}"#.into(),
                    },
                    MessageToolCall {
                        id: "c2".into(),
                        name: "list_files".into(),
                        arguments: "{}".into(),
                    },
                ],
            ),
            Message::tool_result("c1", "Error: File not found"),
            Message::tool_result("c2", "[]"),
        ];

        let (system, contents) = GeminiProvider::to_api_contents(&messages);
        assert_eq!(system.unwrap()["parts"][0]["text"], "You manage files");
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["args"]["file_path"], "notes.md");

        let responses = contents[2]["parts"].as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["functionResponse"]["name"], "read_file");
        assert_eq!(responses[1]["functionResponse"]["name"], "list_files");
    }

    #[tokio::test]
    async fn text_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash-latest:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": { "parts": [{ "text": "sys" }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Hello from Gemini!" }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 8, "candidatesTokenCount": 4, "totalTokenCount": 12 }
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::with_base_url("test-key", server.uri()).unwrap();
        let response = provider
            .complete(request(vec![Message::system("sys"), Message::user("Hi")], vec![]))
            .await
            .unwrap();

        assert_eq!(response.message.content, "Hello from Gemini!");
        assert!(response.message.is_final_answer());
        assert_eq!(response.usage.unwrap().total_tokens, 12);
    }

    #[tokio::test]
    async fn function_call_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash-latest:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [
                        { "functionCall": { "name": "list_files", "args": { "directory_path": "docs" } } },
                        { "functionCall": { "name": "read_file", "args": { "file_path": "docs/a.md" } } }
                    ]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let tools = vec![ToolDefinition {
            name: "list_files".into(),
            description: "List".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }];
        let provider = GeminiProvider::with_base_url("k", server.uri()).unwrap();
        let response = provider
            .complete(request(vec![Message::user("list docs")], tools))
            .await
            .unwrap();

        let calls = &response.message.tool_calls;
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0].id, calls[1].id);
        assert_eq!(calls[0].name, "list_files");
        let args: serde_json::Value = serde_json::from_str(&calls[0].arguments).unwrap();
        assert_eq!(args["directory_path"], "docs");
    }

    #[tokio::test]
    async fn http_errors_map_to_provider_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let provider = GeminiProvider::with_base_url("k", server.uri()).unwrap();
        let err = provider
            .complete(request(vec![Message::user("Hi")], vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 500, .. }));
        assert!(err.to_string().contains("backend exploded"));
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let api: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        let err = GeminiProvider::from_api_response("m", api).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn health_check_lists_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .and(header("x-goog-api-key", "good-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .and(header("x-goog-api-key", "bad-key"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let good = GeminiProvider::with_base_url("good-key", server.uri()).unwrap();
        assert!(good.health_check().await.unwrap());
        let bad = GeminiProvider::with_base_url("bad-key", server.uri()).unwrap();
        assert!(!bad.health_check().await.unwrap());
    }
}
