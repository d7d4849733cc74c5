//! Slot extraction delegated to a language model.
//!
//! The model is asked for a single JSON object keyed by dimension names. Its
//! reply is never trusted as-is: every key goes through `Dimension::from_str`
//! and every value through the validator, and whatever fails is dropped.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use rentwise_core::error::ExtractionError;
use rentwise_core::schema::validate_json;
use rentwise_core::{Dimension, Message, Provider, ProviderRequest, Role, SlotSet};

use super::{ExtractionInput, SlotExtractor};

/// Correlation header forwarded to the model service.
pub const SESSION_ID_HEADER: &str = "X-Session-ID";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_HISTORY_TURNS: usize = 10;

pub struct DelegatedExtractor {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    timeout: Duration,
    max_history_turns: usize,
}

impl DelegatedExtractor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.1,
            timeout: DEFAULT_TIMEOUT,
            max_history_turns: DEFAULT_HISTORY_TURNS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.max_history_turns = turns;
        self
    }

    fn build_request(&self, input: &ExtractionInput<'_>) -> ProviderRequest {
        let messages = vec![
            Message::system(schema_prompt()),
            Message::user(self.user_content(input)),
        ];
        let mut request = ProviderRequest::new(self.model.clone(), messages);
        request.temperature = self.temperature;
        request.base_url = input.model_base_url.map(str::to_string);
        if !input.session_id.as_str().is_empty() {
            request = request.with_header(SESSION_ID_HEADER, input.session_id.as_str());
        }
        request
    }

    /// Recent history, the known conditions, then the latest message.
    fn user_content(&self, input: &ExtractionInput<'_>) -> String {
        let mut content = String::new();

        let keep = self.max_history_turns * 2;
        let start = input.history.len().saturating_sub(keep);
        for message in &input.history[start..] {
            let speaker = match message.role {
                Role::User => "用户",
                Role::Assistant => "助手",
                Role::System => continue,
            };
            content.push_str(speaker);
            content.push('：');
            content.push_str(&message.content);
            content.push('\n');
        }

        if !input.prior.is_empty() {
            let known = serde_json::to_string(input.prior).unwrap_or_default();
            content.push_str("已知条件：");
            content.push_str(&known);
            content.push('\n');
        }

        let text = input.text.trim();
        content.push_str("用户：");
        content.push_str(if text.is_empty() { "无" } else { text });
        content
    }
}

/// System prompt listing every dimension the model may fill.
pub fn schema_prompt() -> String {
    let mut prompt = String::from(
        "你是租房需求解析器。从用户最新一条消息中提取租房查询条件，只输出一个 JSON 对象，不要其他文字。\n\
         只填写最新消息明确提到的字段，未提到的字段不要输出或填 null。可用字段：\n",
    );
    for dimension in Dimension::ALL {
        if dimension == Dimension::LandmarkId {
            continue;
        }
        prompt.push_str("- ");
        prompt.push_str(dimension.as_str());
        prompt.push_str("：");
        prompt.push_str(dimension.description());
        prompt.push('\n');
    }
    prompt
}

/// Parse a model reply into validated slots.
///
/// Tolerates fenced code blocks and prose around the object. Unknown keys and
/// invalid values are dropped.
pub fn parse_reply(reply: &str) -> Result<SlotSet, ExtractionError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let body = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => return Err(ExtractionError::MalformedReply(truncate(reply))),
    };

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExtractionError::MalformedReply(format!("{e}: {}", truncate(body))))?;
    let Value::Object(map) = value else {
        return Err(ExtractionError::MalformedReply(truncate(body)));
    };

    let mut slots = SlotSet::new();
    for (key, raw) in &map {
        let dimension = match key.parse::<Dimension>() {
            Ok(d) => d,
            Err(err) => {
                debug!(%err, "Dropping unknown key from model reply");
                continue;
            }
        };
        // Landmark ids only ever come from the lookup service.
        if dimension == Dimension::LandmarkId {
            debug!("Dropping landmark_id from model reply");
            continue;
        }
        match validate_json(dimension, raw) {
            Ok(Some(value)) => slots.insert(dimension, value),
            Ok(None) => {}
            Err(err) => debug!(%err, "Dropping invalid value from model reply"),
        }
    }
    Ok(slots)
}

fn truncate(s: &str) -> String {
    s.chars().take(200).collect()
}

#[async_trait]
impl SlotExtractor for DelegatedExtractor {
    fn name(&self) -> &str {
        "delegated"
    }

    async fn extract(&self, input: &ExtractionInput<'_>) -> Result<SlotSet, ExtractionError> {
        let request = self.build_request(input);

        let response = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(provider = self.provider.name(), error = %e, "Extraction call failed");
                return Err(ExtractionError::Provider(e));
            }
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Extraction call timed out"
                );
                return Err(ExtractionError::Timeout {
                    after_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        let slots = parse_reply(&response.message.content)?;
        debug!(
            session_id = %input.session_id,
            dimensions = slots.len(),
            "Model extraction parsed"
        );
        Ok(slots)
    }
}
