//! The turn pipeline.
//!
//! One call to [`ChatEngine::handle_turn`] per user message:
//! open session → classify → (reset | action gate | house lookup | search)
//! → reply → record history. Every failure becomes reply text; a turn never
//! returns an error.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use rentwise_config::{AppConfig, LlmConfig};
use rentwise_core::error::{Error, Result};
use rentwise_core::{
    ActionRequest, Dimension, GateState, HouseApi, LandmarkLookup, Provider, SearchEndpoint,
    SessionId, SlotSet,
};

use crate::extractor::{ExtractionInput, SlotExtractor, build_extractor};
use crate::intent::{Intent, IntentClassifier};
use crate::reply;
use crate::router::{LandmarkResolver, QueryRouter, RouteDefaults};
use crate::session::{Session, SessionManager};

/// One incoming chat message.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub session_id: Option<String>,
    pub message: String,
    /// Host (or full URL) of the model service to use for this turn.
    pub model_ip: Option<String>,
}

impl TurnRequest {
    pub fn new(session_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.map(str::to_string),
            message: message.into(),
            model_ip: None,
        }
    }
}

/// What a turn did, for callers and tests that need more than the text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Nothing actionable; the reply asks for input.
    Prompted,
    Reset,
    Searched {
        endpoint: SearchEndpoint,
        params: SlotSet,
    },
    /// Routing needs more or different conditions from the user.
    Clarify,
    /// An action is waiting for its platform.
    ActionProposed,
    ActionExecuted { request: ActionRequest },
    /// An action was refused before any call was made.
    ActionRejected,
    /// A house, listing or stats lookup.
    Answered,
    /// The rental backend failed.
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub reply: String,
    pub session_id: SessionId,
    #[serde(skip)]
    pub outcome: TurnOutcome,
}

pub struct ChatEngine {
    sessions: Arc<SessionManager>,
    extractor: Arc<dyn SlotExtractor>,
    router: QueryRouter,
    resolver: LandmarkResolver,
    houses: Arc<dyn HouseApi>,
    classifier: IntentClassifier,
    user_id: Option<String>,
    llm: LlmConfig,
    delegated: bool,
}

impl ChatEngine {
    pub fn new(
        config: &AppConfig,
        provider: Option<Arc<dyn Provider>>,
        houses: Arc<dyn HouseApi>,
        landmarks: Arc<dyn LandmarkLookup>,
    ) -> Result<Self> {
        let delegated = provider.is_some();
        let extractor = build_extractor(config, provider)?;
        let router = QueryRouter::with_defaults(RouteDefaults::from_config(&config.routing)?);
        let user_id = config
            .rental_api
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(Self {
            sessions: Arc::new(SessionManager::new(config.session.max_history_turns)),
            extractor,
            router,
            resolver: LandmarkResolver::new(landmarks),
            houses,
            classifier: IntentClassifier::new()?,
            user_id,
            llm: config.llm.clone(),
            delegated,
        })
    }

    /// Share an existing session store (tests, embedding).
    pub fn with_sessions(mut self, sessions: Arc<SessionManager>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> TurnReply {
        let (session_id, mut session) = self.sessions.open(request.session_id.as_deref()).await;
        session.turn += 1;
        let turn = session.turn;
        session.gate.expire(turn);

        let text = request.message.trim();
        if text.is_empty() {
            return TurnReply {
                reply: reply::EMPTY_MESSAGE.to_string(),
                session_id,
                outcome: TurnOutcome::Prompted,
            };
        }

        let intent = self.classifier.classify(text, session.gate.is_proposed());
        debug!(session_id = %session_id, turn, ?intent, "Turn classified");

        let (reply, outcome) = match intent {
            Intent::Reset => self.reset(&mut session).await,
            Intent::Action {
                operation,
                house_id,
                platform,
            } => {
                session
                    .gate
                    .propose(operation, &house_id, platform, self.user_id.as_deref(), turn);
                self.advance_gate(&mut session).await
            }
            Intent::SupplyPlatform(platform) => {
                if session
                    .gate
                    .supply_platform(platform, self.user_id.as_deref(), turn)
                {
                    self.merge_conditions(&mut session, text, request.model_ip.as_deref())
                        .await;
                    self.advance_gate(&mut session).await
                } else {
                    self.search(&mut session, text, request.model_ip.as_deref()).await
                }
            }
            Intent::Listings { house_id } => self
                .lookup(self.houses.listings(&house_id).await, |r| {
                    reply::listings(&house_id, r)
                }),
            Intent::Detail { house_id } => {
                self.lookup(self.houses.house(&house_id).await, reply::house_detail)
            }
            Intent::Stats => self.lookup(HouseApi::stats(self.houses.as_ref()).await, reply::stats),
            Intent::Search => {
                self.search(&mut session, text, request.model_ip.as_deref())
                    .await
            }
        };

        let max_turns = self.sessions.max_history_turns();
        session.push_exchange(text, &reply, max_turns);

        TurnReply {
            reply,
            session_id,
            outcome,
        }
    }

    async fn reset(&self, session: &mut Session) -> (String, TurnOutcome) {
        session.reset();
        info!(session_id = %session.id, "Session reset by user");
        match self.houses.init().await {
            Ok(_) => (reply::RESET_DONE.to_string(), TurnOutcome::Reset),
            Err(e) => {
                warn!(error = %e, "House data reset failed");
                (reply::reset_failed(&e), TurnOutcome::Failed)
            }
        }
    }

    /// Ask for what is missing, or execute when the gate is ready.
    async fn advance_gate(&self, session: &mut Session) -> (String, TurnOutcome) {
        if let GateState::Proposed(pending) = session.gate.state() {
            debug!(
                session_id = %session.id,
                operation = %pending.operation,
                house_id = %pending.house_id,
                "Action waiting for platform"
            );
            return (reply::platform_prompt(pending), TurnOutcome::ActionProposed);
        }

        let request = match session.gate.begin_execution() {
            Ok(request) => request,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Action rejected");
                return (reply::error(&e), TurnOutcome::ActionRejected);
            }
        };

        match self.houses.execute(&request).await {
            Ok(_) => {
                info!(
                    session_id = %session.id,
                    operation = %request.operation,
                    house_id = %request.house_id,
                    platform = %request.listing_platform,
                    "Action executed"
                );
                (
                    reply::action_done(&request),
                    TurnOutcome::ActionExecuted { request },
                )
            }
            Err(e) => {
                warn!(
                    session_id = %session.id,
                    operation = %request.operation,
                    error = %e,
                    "Action call failed"
                );
                (reply::action_failed(request.operation, &e), TurnOutcome::Failed)
            }
        }
    }

    fn lookup<T, F>(&self, result: Result<T>, render: F) -> (String, TurnOutcome)
    where
        F: FnOnce(&T) -> String,
    {
        match result {
            Ok(response) => (render(&response), TurnOutcome::Answered),
            Err(e) => {
                warn!(error = %e, "House lookup failed");
                (reply::error(&e), TurnOutcome::Failed)
            }
        }
    }

    async fn search(
        &self,
        session: &mut Session,
        text: &str,
        model_ip: Option<&str>,
    ) -> (String, TurnOutcome) {
        self.merge_conditions(session, text, model_ip).await;

        let routed = match self.router.route(&session.slots, &self.resolver).await {
            Ok(routed) => routed,
            Err(e) => {
                debug!(session_id = %session.id, error = %e, "No route");
                return (reply::error(&Error::Routing(e)), TurnOutcome::Clarify);
            }
        };

        // Merged slots stay in the session whatever the backend answers.
        match HouseApi::search(self.houses.as_ref(), routed.endpoint, &routed.params).await {
            Ok(response) => (
                reply::search_results(&response),
                TurnOutcome::Searched {
                    endpoint: routed.endpoint,
                    params: routed.params,
                },
            ),
            Err(e) => {
                warn!(
                    session_id = %session.id,
                    endpoint = %routed.endpoint,
                    error = %e,
                    "Search failed"
                );
                (reply::error(&e), TurnOutcome::Failed)
            }
        }
    }

    /// Extracts conditions from `text` and merges them into the session.
    /// Extraction failures leave the session slots untouched.
    async fn merge_conditions(&self, session: &mut Session, text: &str, model_ip: Option<&str>) {
        let model_base_url = model_ip.and_then(|ip| self.llm.base_url_for_model_ip(ip));
        if model_base_url.is_some() && !self.delegated {
            debug!("model_ip ignored: slot extraction is rule-based");
        }

        let update = {
            let input = ExtractionInput {
                text,
                prior: &session.slots,
                history: &session.history,
                session_id: &session.id,
                model_base_url: model_base_url.as_deref(),
            };
            match self.extractor.extract(&input).await {
                Ok(update) => update,
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        extractor = self.extractor.name(),
                        error = %e,
                        "Slot extraction failed"
                    );
                    SlotSet::new()
                }
            }
        };

        // A newly named landmark needs a fresh resolution.
        if update.contains(Dimension::Landmark) {
            session.slots.remove(Dimension::LandmarkId);
        }
        session.slots.merge_from(&update);
        debug!(
            session_id = %session.id,
            update = %update,
            slots = %session.slots,
            "Slots merged"
        );
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use async_trait::async_trait;
    use rentwise_core::error::UpstreamError;
    use rentwise_core::ApiResponse;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every call; searches return `search_reply` or `search_error`.
    pub struct MockHouses {
        pub calls: Mutex<Vec<String>>,
        pub searches: Mutex<Vec<(SearchEndpoint, SlotSet)>>,
        pub executed: Mutex<Vec<ActionRequest>>,
        pub search_error: Mutex<Option<UpstreamError>>,
        pub search_reply: serde_json::Value,
    }

    impl Default for MockHouses {
        fn default() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                searches: Mutex::new(Vec::new()),
                executed: Mutex::new(Vec::new()),
                search_error: Mutex::new(None),
                search_reply: json!({
                    "code": 0,
                    "data": {"items": [{"house_id": "HF_1", "community": "建清园", "layout": "1室", "rent": 4500}], "total": 1}
                }),
            }
        }
    }

    impl MockHouses {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl HouseApi for MockHouses {
        async fn init(&self) -> Result<ApiResponse> {
            self.record("init");
            Ok(ApiResponse(json!({"code": 0})))
        }

        async fn house(&self, house_id: &str) -> Result<ApiResponse> {
            self.record(format!("house:{house_id}"));
            Ok(ApiResponse(json!({"data": {"id": house_id, "address": "海淀区上地", "rent": 5200}})))
        }

        async fn listings(&self, house_id: &str) -> Result<ApiResponse> {
            self.record(format!("listings:{house_id}"));
            Ok(ApiResponse(json!({"data": [{"listing_platform": "链家", "rent": 5200}]})))
        }

        async fn search(&self, endpoint: SearchEndpoint, params: &SlotSet) -> Result<ApiResponse> {
            self.record(format!("search:{endpoint}"));
            self.searches.lock().unwrap().push((endpoint, params.clone()));
            match self.search_error.lock().unwrap().clone() {
                Some(e) => Err(Error::Upstream(e)),
                None => Ok(ApiResponse(self.search_reply.clone())),
            }
        }

        async fn nearby_landmarks(
            &self,
            community: &str,
            _category: Option<&str>,
            _max_distance: Option<f64>,
        ) -> Result<ApiResponse> {
            self.record(format!("nearby_landmarks:{community}"));
            Ok(ApiResponse(json!({"data": []})))
        }

        async fn stats(&self) -> Result<ApiResponse> {
            self.record("stats");
            Ok(ApiResponse(json!({"data": {"total": 120, "available": 80}})))
        }

        async fn execute(&self, request: &ActionRequest) -> Result<ApiResponse> {
            self.record(format!("{}:{}", request.operation, request.house_id));
            self.executed.lock().unwrap().push(request.clone());
            Ok(ApiResponse(json!({"code": 0})))
        }
    }
}
