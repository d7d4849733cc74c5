//! The conversational core of rentwise.
//!
//! Each chat turn goes through the same pipeline:
//!
//! 1. **Open** the session (created on first contact, locked for the turn)
//! 2. **Classify** the message: reset, action, platform follow-up, house
//!    lookup, stats, or search
//! 3. **Extract** a partial slot update (rules, or a language model with
//!    rules as fallback) and merge it into the session
//! 4. **Route** the merged slots to exactly one search endpoint
//! 5. **Reply** with a formatted summary; failures become reply text too
//!
//! Mutating operations never come out of extraction. They only run through
//! the session's `ActionGate` once operation, house id, platform and user id
//! are all known.

pub mod engine;
pub mod extractor;
pub mod intent;
pub mod reply;
pub mod router;
pub mod session;

pub use engine::{ChatEngine, TurnOutcome, TurnReply, TurnRequest};
pub use extractor::{
    DelegatedExtractor, ExtractionInput, FallbackExtractor, RuleExtractor, SlotExtractor,
    build_extractor,
};
pub use intent::{Intent, IntentClassifier};
pub use router::{LandmarkResolver, QueryRouter, RouteDefaults, RoutedQuery};
pub use session::{Session, SessionManager, SessionSnapshot};
