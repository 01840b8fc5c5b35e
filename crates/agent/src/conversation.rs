//! The conversation loop implementation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use concierge_config::{AppConfig, AssistantConfig};
use concierge_core::preference::remember_preference_definition;
use concierge_core::provider::{ModelReply, ModelRequest, ModelResponse, Provider, ToolDefinition, ToolExchange};
use concierge_core::tool::{self, ToolCall};
use concierge_core::turn::{Session, Speaker, Turn};
use concierge_memory::{MemoryStats, PreferenceStore, RECALL_LIMIT};
use concierge_providers::RetryingProvider;
use concierge_tools::ToolDispatcher;
use tracing::{debug, info, warn};

use crate::prompt;
use crate::replies;

/// Drives one session: model call, optional tool dispatch, follow-up.
pub struct ConversationLoop {
    /// The model backend, wrapped in the single-retry policy
    provider: Arc<dyn Provider>,

    /// Weather, calendar and email adapters
    dispatcher: ToolDispatcher,

    /// Remembered facts, keyed by user id
    preferences: PreferenceStore,

    model: String,

    temperature: f32,

    max_tokens: Option<u32>,

    /// Trailing turns sent with every model call
    history_window: usize,

    assistant: AssistantConfig,

    /// Function declarations offered to the model
    tools: Vec<ToolDefinition>,
}

impl ConversationLoop {
    /// Create a loop around `provider`, whose HTTP client times out after `timeout`.
    ///
    /// Every model call gets one immediate re-attempt on transient failure,
    /// each attempt bounded by `timeout` plus a short grace period.
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: ToolDispatcher,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let mut tools = tool::definitions();
        tools.push(remember_preference_definition());

        Self {
            provider: Arc::new(RetryingProvider::for_client_timeout(provider, timeout)),
            dispatcher,
            preferences: PreferenceStore::new(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            history_window: 20,
            assistant: AssistantConfig::default(),
            tools,
        }
    }

    /// Build a loop with every knob taken from configuration.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Self {
        Self::new(
            provider,
            ToolDispatcher::from_config(config),
            &config.model,
            Duration::from_secs(config.request_timeout_secs),
        )
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_history_window(config.history_window)
        .with_assistant(config.assistant.clone())
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set how many trailing turns are sent to the model (at least one).
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.max(1);
        self
    }

    pub fn with_assistant(mut self, assistant: AssistantConfig) -> Self {
        self.assistant = assistant;
        self
    }

    /// Start from an existing preference store (e.g. one loaded from disk).
    pub fn with_preferences(mut self, preferences: PreferenceStore) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut PreferenceStore {
        &mut self.preferences
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Counts over the session log and the preference store.
    pub fn stats(&self, session: &Session) -> MemoryStats {
        MemoryStats::collect(session, &self.preferences)
    }

    /// Handle one user utterance and return the assistant's reply.
    ///
    /// Appends the user turn and exactly one assistant turn, except for a
    /// blank utterance, which appends nothing.
    pub async fn process(&mut self, session: &mut Session, utterance: &str) -> String {
        let text = utterance.trim();
        if text.is_empty() {
            return replies::USAGE_HINT.to_string();
        }

        session.push(Turn::user(text));
        info!(
            session_id = %session.id(),
            user = %session.user_id(),
            turns = session.len(),
            "Processing utterance"
        );

        let request = self.request(session, None);
        let reply = match self.provider.complete(request).await {
            Ok(response) => {
                self.remember(session.user_id(), &response);
                match response.reply {
                    ModelReply::ToolCall(call) => self.run_tool(session, call).await,
                    ModelReply::Text(text) if !text.trim().is_empty() => text,
                    ModelReply::Text(_) if !response.preferences.is_empty() => {
                        replies::acknowledge(&response.preferences)
                    }
                    ModelReply::Text(_) => replies::EMPTY_REPLY.to_string(),
                }
            }
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "Model call failed");
                replies::degraded(&e).to_string()
            }
        };

        session.push(Turn::assistant(reply.clone()));
        reply
    }

    /// Dispatch exactly one tool call and let the model phrase the result.
    async fn run_tool(&mut self, session: &Session, call: ToolCall) -> String {
        debug!(tool = %call.name, arguments = %call.arguments, "Model requested tool");

        let result = match self.dispatcher.dispatch(&call).await {
            Ok(result) => result,
            Err(e) => return replies::tool_apology(&e).to_string(),
        };

        let exchange = ToolExchange {
            call,
            result: result.data.clone(),
        };
        match self.provider.complete(self.request(session, Some(exchange))).await {
            Ok(response) => {
                self.remember(session.user_id(), &response);
                match response.reply {
                    ModelReply::Text(text) if !text.trim().is_empty() => text,
                    _ => {
                        debug!(tool = %result.tool, "Follow-up gave no text, using tool summary");
                        result.summary
                    }
                }
            }
            Err(e) => {
                warn!(tool = %result.tool, error = %e, "Follow-up model call failed, using tool summary");
                result.summary
            }
        }
    }

    fn request(&self, session: &Session, tool_exchange: Option<ToolExchange>) -> ModelRequest {
        let allow_tool_calls = tool_exchange.is_none();
        ModelRequest {
            model: self.model.clone(),
            system_prompt: prompt::system_prompt(&self.assistant, Local::now()),
            history: session.recent(self.history_window).to_vec(),
            preferences: self.preferences.get(session.user_id()),
            recollections: self.recollections(session),
            tools: self.tools.clone(),
            tool_exchange,
            allow_tool_calls,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Earlier exchanges, older than the history window, that share keywords
    /// with the latest user turn.
    fn recollections(&self, session: &Session) -> Vec<String> {
        let Some(query) = session.turns().iter().rev().find(|t| t.speaker == Speaker::User) else {
            return Vec::new();
        };
        let turns = session.turns();
        let older = &turns[..turns.len().saturating_sub(self.history_window)];
        let found = concierge_memory::recall(older, &query.text, RECALL_LIMIT);
        if !found.is_empty() {
            debug!(count = found.len(), best = found[0].score, "Recalled earlier exchanges");
        }
        found.iter().map(ToString::to_string).collect()
    }

    fn remember(&mut self, user: &str, response: &ModelResponse) {
        if let Some(usage) = &response.usage {
            debug!(model = %response.model, tokens = usage.total_tokens, "Model usage");
        }
        for update in &response.preferences {
            self.preferences.apply(user, update);
        }
        if !response.preferences.is_empty() {
            let keys: Vec<&str> = response.preferences.iter().map(|u| u.key.as_str()).collect();
            info!(user, ?keys, "Stored preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concierge_core::error::ProviderError;
    use concierge_core::preference::PreferenceUpdate;
    use concierge_core::provider::Usage;
    use concierge_core::turn::Speaker;
    use concierge_tools::{SimulatedWeather, Units};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays queued responses and records every request.
    struct MockProvider {
        responses: Mutex<VecDeque<Result<ModelResponse, ProviderError>>>,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl MockProvider {
        fn new(responses: Vec<Result<ModelResponse, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ModelRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ModelResponse::text("(script exhausted)", "mock-model")))
        }
    }

    fn text(t: &str) -> Result<ModelResponse, ProviderError> {
        Ok(ModelResponse {
            reply: ModelReply::Text(t.into()),
            preferences: vec![],
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }

    fn tool_call(name: &str, arguments: serde_json::Value) -> Result<ModelResponse, ProviderError> {
        Ok(ModelResponse {
            reply: ModelReply::ToolCall(ToolCall {
                id: "call_1".into(),
                name: name.into(),
                arguments,
            }),
            preferences: vec![],
            usage: None,
            model: "mock-model".into(),
        })
    }

    fn agent(provider: Arc<MockProvider>) -> ConversationLoop {
        let dispatcher = ToolDispatcher::new(Box::new(SimulatedWeather::new(Units::Metric)));
        ConversationLoop::new(provider, dispatcher, "mock-model", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn simple_text_response() {
        let provider = MockProvider::new(vec![text("Hello! How can I help?")]);
        let mut agent = agent(provider.clone());
        let mut session = Session::new("alice");

        let reply = agent.process(&mut session, "Hello!").await;
        assert_eq!(reply, "Hello! How can I help?");
        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[0].speaker, Speaker::User);
        assert_eq!(session.turns()[1].speaker, Speaker::Assistant);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].allow_tool_calls);
        assert_eq!(requests[0].tools.len(), 4);
        assert_eq!(requests[0].history.len(), 1);
    }

    #[tokio::test]
    async fn blank_utterance_appends_nothing() {
        let provider = MockProvider::new(vec![]);
        let mut agent = agent(provider.clone());
        let mut session = Session::new("alice");

        let reply = agent.process(&mut session, "   \n").await;
        assert_eq!(reply, replies::USAGE_HINT);
        assert!(session.is_empty());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn preferences_are_stored_and_injected() {
        let provider = MockProvider::new(vec![
            Ok(ModelResponse {
                reply: ModelReply::Text(String::new()),
                preferences: vec![PreferenceUpdate::new("city", "Taipei").unwrap()],
                usage: None,
                model: "mock-model".into(),
            }),
            text("Sure."),
        ]);
        let mut agent = agent(provider.clone());
        let mut session = Session::new("alice");

        let ack = agent.process(&mut session, "I live in Taipei").await;
        assert_eq!(ack, "Noted, I'll remember that city: Taipei.");
        assert_eq!(agent.preferences().get("alice")["city"], "Taipei");

        agent.process(&mut session, "Anything else?").await;
        let requests = provider.requests();
        assert!(requests[0].preferences.is_empty());
        assert_eq!(requests[1].preferences["city"], "Taipei");
    }

    #[tokio::test]
    async fn tool_call_then_follow_up() {
        let provider = MockProvider::new(vec![
            tool_call("weather", serde_json::json!({"city": "Tokyo"})),
            text("It's pleasant in Tokyo today."),
        ]);
        let mut agent = agent(provider.clone());
        let mut session = Session::new("alice");

        let reply = agent.process(&mut session, "Weather in Tokyo?").await;
        assert_eq!(reply, "It's pleasant in Tokyo today.");
        assert_eq!(session.len(), 2);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let follow_up = &requests[1];
        assert!(!follow_up.allow_tool_calls);
        let exchange = follow_up.tool_exchange.as_ref().unwrap();
        assert_eq!(exchange.call.name, "weather");
        assert_eq!(exchange.result["city"], "Tokyo");
    }

    #[tokio::test]
    async fn tool_error_becomes_apology_without_follow_up() {
        let provider = MockProvider::new(vec![tool_call("email", serde_json::json!({"action": "read", "id": 99}))]);
        let mut agent = agent(provider.clone());
        let mut session = Session::new("alice");

        let reply = agent.process(&mut session, "Open message 99").await;
        assert_eq!(reply, replies::tool_apology(&concierge_core::ToolError::NotFound(String::new())));
        assert_eq!(provider.requests().len(), 1);
        assert_eq!(session.last().unwrap().text, reply);
    }

    #[tokio::test]
    async fn follow_up_failure_falls_back_to_summary() {
        let provider = MockProvider::new(vec![
            tool_call("calendar", serde_json::json!({"action": "list"})),
            Err(ProviderError::AuthenticationFailed("revoked".into())),
        ]);
        let mut agent = agent(provider.clone());
        let mut session = Session::new("alice");

        let reply = agent.process(&mut session, "What's on my calendar?").await;
        assert_eq!(reply, "No events scheduled (all).");
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let provider = MockProvider::new(vec![
            Err(ProviderError::Network("connection reset".into())),
            text("Back online."),
        ]);
        let mut agent = agent(provider.clone());
        let mut session = Session::new("alice");

        assert_eq!(agent.process(&mut session, "Hi").await, "Back online.");
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn model_failure_degrades_and_session_recovers() {
        let provider = MockProvider::new(vec![
            Err(ProviderError::ApiError {
                status_code: 500,
                message: "boom".into(),
            }),
            Err(ProviderError::ApiError {
                status_code: 500,
                message: "boom".into(),
            }),
            text("Hello again."),
        ]);
        let mut agent = agent(provider.clone());
        let mut session = Session::new("alice");

        let degraded = agent.process(&mut session, "Hi").await;
        assert!(degraded.contains("trouble reaching"));
        assert_eq!(session.len(), 2);

        assert_eq!(agent.process(&mut session, "Hi again").await, "Hello again.");
        assert_eq!(session.len(), 4);
    }

    #[tokio::test]
    async fn older_related_exchange_is_recalled() {
        let provider = MockProvider::new(vec![
            text("Light rain in Tokyo."),
            text("Noted."),
            text("Sure."),
            text("Probably rain again."),
        ]);
        let mut agent = agent(provider.clone()).with_history_window(2);
        let mut session = Session::new("alice");

        agent.process(&mut session, "Weather in Tokyo?").await;
        agent.process(&mut session, "Book the dentist").await;
        agent.process(&mut session, "Thanks").await;
        agent.process(&mut session, "Will Tokyo stay rainy?").await;

        let last = provider.requests().pop().unwrap();
        assert_eq!(last.history.len(), 2);
        assert_eq!(last.recollections.len(), 1);
        assert!(last.recollections[0].contains("user: Weather in Tokyo?"));
        assert!(last.recollections[0].contains("assistant: Light rain in Tokyo."));
        assert!(last.system_instruction().contains("## Related earlier conversation"));
    }

    #[tokio::test]
    async fn nothing_recalled_inside_the_window() {
        let provider = MockProvider::new(vec![text("Light rain."), text("Still rain.")]);
        let mut agent = agent(provider.clone());
        let mut session = Session::new("alice");

        agent.process(&mut session, "Weather in Tokyo?").await;
        agent.process(&mut session, "Tokyo tomorrow?").await;
        assert!(provider.requests()[1].recollections.is_empty());
    }

    #[tokio::test]
    async fn stats_reflect_session_and_preferences() {
        let provider = MockProvider::new(vec![text("Light rain.")]);
        let mut agent = agent(provider);
        let mut session = Session::new("alice");
        agent.preferences_mut().set("alice", "city", "Tokyo");

        agent.process(&mut session, "Weather in Tokyo?").await;
        let stats = agent.stats(&session);
        assert_eq!(stats.turns, 2);
        assert_eq!(stats.categories["weather"], 1);
        assert_eq!(stats.user_preferences, 1);
    }

    #[tokio::test]
    async fn history_is_windowed() {
        let provider = MockProvider::new(vec![]);
        let mut agent = agent(provider.clone()).with_history_window(3);
        let mut session = Session::new("alice");

        for i in 0..4 {
            agent.process(&mut session, &format!("message {i}")).await;
        }
        let last = provider.requests().pop().unwrap();
        assert_eq!(last.history.len(), 3);
        assert_eq!(last.history[2].text, "message 3");
    }
}
