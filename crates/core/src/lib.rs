//! # Rentwise Core
//!
//! Domain types, traits, and error definitions for the rentwise rental
//! assistant. This crate has **no I/O**; it defines the domain model that
//! all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM provider, rental backend, clock) is a
//! trait here. Implementations live in their respective crates. This enables:
//! - Swapping the slot-extraction strategy via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod action;
pub mod api;
pub mod clock;
pub mod error;
pub mod message;
pub mod provider;
pub mod schema;
pub mod slots;

// Re-export key types at crate root for ergonomics
pub use action::{ActionField, ActionGate, ActionRequest, GateState, Operation, PendingAction};
pub use api::{ApiResponse, HouseApi, LandmarkLookup, SearchEndpoint};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    Error, ExtractionError, ProviderError, Result, RoutingError, SchemaError, UpstreamError,
};
pub use message::{Message, Role, SessionId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use schema::{Dimension, ListingPlatform, SlotValue, ValueKind};
pub use slots::SlotSet;
