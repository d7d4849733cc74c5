//! Slot extraction strategies.
//!
//! An extractor turns one user message (plus what the session already knows)
//! into a partial [`SlotSet`] update. The update is not merged here; the
//! engine merges it into the session.
//!
//! Strategies:
//! - [`RuleExtractor`]: deterministic keyword/pattern table, total.
//! - [`DelegatedExtractor`]: asks an LLM for a JSON object, validates it.
//! - [`FallbackExtractor`]: delegated first, rules when that fails or finds nothing.

pub mod delegated;
pub mod fallback;
pub mod rules;

pub use delegated::DelegatedExtractor;
pub use fallback::FallbackExtractor;
pub use rules::RuleExtractor;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use rentwise_config::AppConfig;
use rentwise_core::error::{ExtractionError, Result};
use rentwise_core::{Message, Provider, SessionId, SlotSet};

/// Everything an extractor may look at for one turn.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionInput<'a> {
    /// The latest user message.
    pub text: &'a str,
    /// Slots accumulated before this turn.
    pub prior: &'a SlotSet,
    /// Recent conversation, oldest first.
    pub history: &'a [Message],
    /// Forwarded to the model service as a correlation header.
    pub session_id: &'a SessionId,
    /// Per-request model endpoint, when the caller supplied one.
    pub model_base_url: Option<&'a str>,
}

#[async_trait]
pub trait SlotExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(
        &self,
        input: &ExtractionInput<'_>,
    ) -> std::result::Result<SlotSet, ExtractionError>;
}

/// Pick the extraction strategy once, from configuration.
///
/// With a provider: delegated extraction with rule fallback. Without one:
/// rules only.
pub fn build_extractor(
    config: &AppConfig,
    provider: Option<Arc<dyn Provider>>,
) -> Result<Arc<dyn SlotExtractor>> {
    let rules = Arc::new(RuleExtractor::from_config(&config.extractor)?);

    let Some(provider) = provider else {
        tracing::info!("No LLM configured, using rule-based slot extraction");
        return Ok(rules);
    };

    tracing::info!(
        provider = provider.name(),
        model = %config.llm.model,
        "Using delegated slot extraction with rule fallback"
    );
    let delegated = DelegatedExtractor::new(provider, config.llm.model.clone())
        .with_temperature(config.llm.temperature)
        .with_timeout(Duration::from_secs(config.llm.timeout_secs))
        .with_history_turns(config.session.max_history_turns);

    Ok(Arc::new(FallbackExtractor::new(Arc::new(delegated), rules)))
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use rentwise_core::error::ProviderError;
    use rentwise_core::provider::{ProviderRequest, ProviderResponse};
    use std::sync::Mutex;

    /// A provider that replays scripted replies and records every request.
    pub struct ScriptedProvider {
        replies: Mutex<Vec<std::result::Result<String, ProviderError>>>,
        pub requests: Mutex<Vec<ProviderRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<std::result::Result<String, ProviderError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        pub fn text(reply: &str) -> Self {
            Self::new(vec![Ok(reply.to_string())])
        }

        pub fn slow(reply: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::text(reply)
            }
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = {
                let mut replies = self.replies.lock().unwrap();
                if replies.is_empty() {
                    Err(ProviderError::NotConfigured("no scripted reply left".into()))
                } else {
                    replies.remove(0)
                }
            };
            next.map(|text| ProviderResponse {
                message: Message::assistant(text),
                usage: None,
                model: "scripted-model".into(),
            })
        }
    }

    pub fn input<'a>(
        text: &'a str,
        prior: &'a SlotSet,
        session_id: &'a SessionId,
    ) -> ExtractionInput<'a> {
        ExtractionInput {
            text,
            prior,
            history: &[],
            session_id,
            model_base_url: None,
        }
    }
}
