//! Google Gemini provider (`generateContent`).
//!
//! Turns map onto `contents` with roles `user`/`model`, the system prompt
//! and preferences go into `systemInstruction`, and tools are declared as
//! `functionDeclarations`. A tool exchange is replayed as a model
//! `functionCall` part followed by a user `functionResponse` part.

use async_trait::async_trait;
use concierge_core::error::ProviderError;
use concierge_core::provider::*;
use concierge_core::tool::ToolCall;
use concierge_core::turn::Speaker;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use crate::reply;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// A Gemini backend.
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: GEMINI_API_BASE.to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Point at a different endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.base_url, model)
    }

    /// Build the JSON request body for `generateContent`.
    pub(crate) fn build_request_body(request: &ModelRequest) -> Value {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .map(|turn| {
                let role = match turn.speaker {
                    Speaker::User => "user",
                    Speaker::Assistant => "model",
                };
                json!({ "role": role, "parts": [{ "text": turn.text }] })
            })
            .collect();

        if let Some(exchange) = &request.tool_exchange {
            contents.push(json!({
                "role": "model",
                "parts": [{
                    "functionCall": {
                        "name": exchange.call.name,
                        "args": exchange.call.arguments,
                    }
                }]
            }));
            // functionResponse.response must be an object
            let response = match &exchange.result {
                Value::Object(_) => exchange.result.clone(),
                other => json!({ "result": other }),
            };
            contents.push(json!({
                "role": "user",
                "parts": [{
                    "functionResponse": {
                        "name": exchange.call.name,
                        "response": response,
                    }
                }]
            }));
        }

        let mut generation_config = json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }

        let mut body = json!({
            "contents": contents,
            "systemInstruction": { "parts": [{ "text": request.system_instruction() }] },
            "generationConfig": generation_config,
        });

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);

            if !request.allow_tool_calls {
                body["toolConfig"] = json!({ "functionCallingConfig": { "mode": "NONE" } });
            }
        }

        body
    }

    /// Parse a `generateContent` response.
    pub(crate) fn parse_response(body: Value, model: &str) -> Result<ModelResponse, ProviderError> {
        let candidate = body["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| {
                let reason = body["promptFeedback"]["blockReason"]
                    .as_str()
                    .unwrap_or("no candidates in response");
                ProviderError::InvalidResponse(reason.to_string())
            })?;

        let mut text = String::new();
        let mut calls = Vec::new();

        if let Some(parts) = candidate["content"]["parts"].as_array() {
            for part in parts {
                if let Some(t) = part["text"].as_str() {
                    text.push_str(t);
                }
                if let Some(fc) = part.get("functionCall") {
                    calls.push(ToolCall {
                        id: uuid::Uuid::new_v4().to_string(),
                        name: fc["name"].as_str().unwrap_or_default().to_string(),
                        arguments: fc.get("args").cloned().unwrap_or(Value::Null),
                    });
                }
            }
        }

        let usage = body.get("usageMetadata").map(|meta| {
            // Counts past u32::MAX saturate rather than wrap.
            let count = |field: &str| meta[field].as_u64().map(|n| u32::try_from(n).unwrap_or(u32::MAX));
            let prompt = count("promptTokenCount").unwrap_or(0);
            let completion = count("candidatesTokenCount").unwrap_or(0);
            Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: count("totalTokenCount").unwrap_or(prompt.saturating_add(completion)),
            }
        });

        let (reply, preferences) = reply::assemble(text.trim().to_string(), calls);

        Ok(ModelResponse {
            reply,
            preferences,
            usage,
            model: body["modelVersion"].as_str().unwrap_or(model).to_string(),
        })
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "GEMINI_API_KEY is not set".into(),
            ));
        }

        let body = Self::build_request_body(&request);
        debug!(
            model = %request.model,
            turns = request.history.len(),
            tool_exchange = request.tool_exchange.is_some(),
            "Gemini API request"
        );

        let response = self
            .client
            .post(self.api_url(&request.model))
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            // Gemini reports a bad key as 400 API_KEY_INVALID
            if error_body.contains("API_KEY_INVALID") {
                return Err(ProviderError::AuthenticationFailed("API key not valid".into()));
            }
            warn!(status, body = %error_body, "Gemini returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Self::parse_response(json, &request.model)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        if self.api_key.is_empty() {
            return Ok(false);
        }
        let response = self
            .client
            .get(&self.base_url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::preference::Preferences;
    use concierge_core::turn::Turn;

    fn request() -> ModelRequest {
        ModelRequest {
            model: "gemini-2.0-flash".into(),
            system_prompt: "You are Concierge.".into(),
            history: vec![Turn::user("Hi, I live in Taipei"), Turn::assistant("Hello!"), Turn::user("Weather?")],
            preferences: Preferences::new(),
            recollections: vec![],
            tools: concierge_core::tool::definitions(),
            tool_exchange: None,
            allow_tool_calls: true,
            temperature: 0.7,
            max_tokens: Some(500),
        }
    }

    #[test]
    fn body_maps_roles_and_tools() {
        let body = GeminiProvider::build_request_body(&request());
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "Weather?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are Concierge.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 500);

        let decls = body["tools"][0]["functionDeclarations"].as_array().unwrap();
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0]["name"], "weather");
        assert!(body.get("toolConfig").is_none());
    }

    #[test]
    fn body_includes_preferences_in_system_instruction() {
        let mut req = request();
        req.preferences.insert("city".into(), "Taipei".into());
        let body = GeminiProvider::build_request_body(&req);
        let system = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(system.contains("- city: Taipei"));
    }

    #[test]
    fn body_replays_tool_exchange_and_disables_calls() {
        let mut req = request();
        req.allow_tool_calls = false;
        req.tool_exchange = Some(ToolExchange {
            call: ToolCall {
                id: "1".into(),
                name: "weather".into(),
                arguments: json!({"city": "Tokyo"}),
            },
            result: json!({"temperature": 18, "condition": "clear sky"}),
        });
        let body = GeminiProvider::build_request_body(&req);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 5);
        assert_eq!(contents[3]["role"], "model");
        assert_eq!(contents[3]["parts"][0]["functionCall"]["args"]["city"], "Tokyo");
        assert_eq!(contents[4]["role"], "user");
        assert_eq!(contents[4]["parts"][0]["functionResponse"]["response"]["temperature"], 18);
        assert_eq!(body["toolConfig"]["functionCallingConfig"]["mode"], "NONE");
    }

    #[test]
    fn non_object_tool_result_is_wrapped() {
        let mut req = request();
        req.tool_exchange = Some(ToolExchange {
            call: ToolCall {
                id: "1".into(),
                name: "email".into(),
                arguments: json!({"action": "list"}),
            },
            result: json!("three messages"),
        });
        let body = GeminiProvider::build_request_body(&req);
        let last = body["contents"].as_array().unwrap().last().unwrap().clone();
        assert_eq!(last["parts"][0]["functionResponse"]["response"]["result"], "three messages");
    }

    #[test]
    fn parse_text_response() {
        let body = json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "Hello there!" }] } }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 3, "totalTokenCount": 15 }
        });
        let resp = GeminiProvider::parse_response(body, "gemini-2.0-flash").unwrap();
        assert_eq!(resp.reply, ModelReply::Text("Hello there!".into()));
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
        assert_eq!(resp.model, "gemini-2.0-flash");
    }

    #[test]
    fn oversized_usage_counts_saturate() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }],
            "usageMetadata": { "promptTokenCount": 5_000_000_000u64, "candidatesTokenCount": 4_294_967_000u64 }
        });
        let usage = GeminiProvider::parse_response(body, "gemini-2.0-flash").unwrap().usage.unwrap();
        assert_eq!(usage.prompt_tokens, u32::MAX);
        assert_eq!(usage.completion_tokens, 4_294_967_000);
        assert_eq!(usage.total_tokens, u32::MAX);

        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }],
            "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 3 }
        });
        let usage = GeminiProvider::parse_response(body, "gemini-2.0-flash").unwrap().usage.unwrap();
        assert_eq!(usage.total_tokens, 10);
    }

    #[test]
    fn parse_function_call_response() {
        let body = json!({
            "candidates": [{ "content": { "parts": [
                { "functionCall": { "name": "remember_preference", "args": { "key": "city", "value": "Tokyo" } } },
                { "functionCall": { "name": "weather", "args": { "city": "Tokyo" } } }
            ] } }]
        });
        let resp = GeminiProvider::parse_response(body, "gemini-2.0-flash").unwrap();
        match resp.reply {
            ModelReply::ToolCall(call) => {
                assert_eq!(call.name, "weather");
                assert_eq!(call.arguments["city"], "Tokyo");
                assert!(!call.id.is_empty());
            }
            other => panic!("expected tool call, got {other:?}"),
        }
        assert_eq!(resp.preferences.len(), 1);
        assert_eq!(resp.preferences[0].value, "Tokyo");
    }

    #[test]
    fn parse_blocked_prompt_is_invalid_response() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = GeminiProvider::parse_response(body, "gemini-2.0-flash").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(ref r) if r == "SAFETY"));
    }

    #[test]
    fn api_url_includes_model() {
        let p = GeminiProvider::new("key", Duration::from_secs(5)).with_base_url("http://localhost:9/models/");
        assert_eq!(p.api_url("gemini-2.0-flash"), "http://localhost:9/models/gemini-2.0-flash:generateContent");
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let p = GeminiProvider::new("", Duration::from_secs(5));
        let err = p.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(!p.health_check().await.unwrap());
    }
}
