//! Mutating operations and the gate that guards them.
//!
//! A rent / terminate / offline call only ever reaches the rental backend as
//! a fully specified [`ActionRequest`]. The [`ActionGate`] tracks a proposal
//! across at most two consecutive turns and refuses to hand out a request
//! until operation, house id, platform and user id are all present.

use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};
use crate::schema::ListingPlatform;

/// Maximum length of a house identifier.
pub const MAX_HOUSE_ID_LEN: usize = 32;

/// A state-changing operation on a house.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Rent,
    Terminate,
    Offline,
}

impl Operation {
    /// Path segment on the rental backend (`/api/houses/{id}/<segment>`).
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::Terminate => "terminate",
            Self::Offline => "offline",
        }
    }

    /// Label used in replies.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rent => "租房",
            Self::Terminate => "退租",
            Self::Offline => "下架",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// One mandatory field of an [`ActionRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionField {
    Operation,
    HouseId,
    ListingPlatform,
    UserId,
}

impl ActionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operation => "operation",
            Self::HouseId => "house_id",
            Self::ListingPlatform => "listing_platform",
            Self::UserId => "user_id",
        }
    }
}

/// A complete, validated mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRequest {
    pub operation: Operation,
    pub house_id: String,
    pub listing_platform: ListingPlatform,
    pub user_id: String,
}

impl ActionRequest {
    /// Build a request, failing if any field is absent or malformed.
    ///
    /// When the user id is the only thing missing the error is
    /// [`Error::MissingIdentity`]; otherwise [`Error::ActionIncomplete`]
    /// lists every missing field.
    pub fn new(
        operation: Option<Operation>,
        house_id: Option<&str>,
        listing_platform: Option<ListingPlatform>,
        user_id: Option<&str>,
    ) -> Result<Self> {
        let house_id = house_id.map(str::trim).filter(|id| is_valid_house_id(id));
        let user_id = user_id.map(str::trim).filter(|id| !id.is_empty());

        let mut missing = Vec::new();
        if operation.is_none() {
            missing.push(ActionField::Operation);
        }
        if house_id.is_none() {
            missing.push(ActionField::HouseId);
        }
        if listing_platform.is_none() {
            missing.push(ActionField::ListingPlatform);
        }
        if user_id.is_none() {
            missing.push(ActionField::UserId);
        }

        match (operation, house_id, listing_platform, user_id) {
            (Some(operation), Some(house_id), Some(listing_platform), Some(user_id)) => Ok(Self {
                operation,
                house_id: house_id.to_string(),
                listing_platform,
                user_id: user_id.to_string(),
            }),
            _ if missing == [ActionField::UserId] => Err(Error::MissingIdentity),
            _ => Err(Error::ActionIncomplete { missing }),
        }
    }
}

/// House ids are short ASCII tokens such as `HF_2001`.
pub fn is_valid_house_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_HOUSE_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// An operation parsed from text that is still waiting for its platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAction {
    pub operation: Operation,
    pub house_id: String,
    pub listing_platform: Option<ListingPlatform>,
    /// Turn number on which the operation was stated.
    pub proposed_turn: u64,
}

/// State of one session's gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    #[default]
    Idle,
    Proposed(PendingAction),
    Ready(ActionRequest),
    Executed(ActionRequest),
    Rejected { missing: Vec<ActionField> },
}

/// Finite-state guard for mutating operations.
///
/// ```text
/// Idle ──propose──▶ Proposed ──platform (same/next turn)──▶ Ready ──begin_execution──▶ Executed
///                       │
///                       └─ no user id ─▶ Rejected
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionGate {
    state: GateState,
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_proposed(&self) -> bool {
        matches!(self.state, GateState::Proposed(_))
    }

    /// Start a fresh proposal, discarding whatever came before.
    pub fn propose(
        &mut self,
        operation: Operation,
        house_id: &str,
        listing_platform: Option<ListingPlatform>,
        user_id: Option<&str>,
        turn: u64,
    ) -> &GateState {
        let pending = PendingAction {
            operation,
            house_id: house_id.trim().to_string(),
            listing_platform,
            proposed_turn: turn,
        };
        self.state = Self::evaluate(pending, user_id);
        &self.state
    }

    /// Supply the platform for an open proposal.
    ///
    /// Only honored on the proposal's own turn or the one right after it.
    /// Returns `false` when there was nothing to complete.
    pub fn supply_platform(
        &mut self,
        listing_platform: ListingPlatform,
        user_id: Option<&str>,
        turn: u64,
    ) -> bool {
        let GateState::Proposed(pending) = &self.state else {
            return false;
        };
        if turn > pending.proposed_turn + 1 {
            self.state = GateState::Idle;
            return false;
        }
        let pending = PendingAction {
            listing_platform: Some(listing_platform),
            ..pending.clone()
        };
        self.state = Self::evaluate(pending, user_id);
        true
    }

    /// Drop a proposal that is older than the turn before `turn`.
    pub fn expire(&mut self, turn: u64) {
        if let GateState::Proposed(pending) = &self.state {
            if turn > pending.proposed_turn + 1 {
                self.state = GateState::Idle;
            }
        }
    }

    /// Hand out the request for execution, moving `Ready` to `Executed`.
    ///
    /// Any other state is an error and nothing may be sent.
    pub fn begin_execution(&mut self) -> Result<ActionRequest> {
        match &self.state {
            GateState::Ready(request) => {
                let request = request.clone();
                self.state = GateState::Executed(request.clone());
                Ok(request)
            }
            GateState::Rejected { missing } if missing == &[ActionField::UserId] => {
                Err(Error::MissingIdentity)
            }
            GateState::Rejected { missing } => Err(Error::ActionIncomplete {
                missing: missing.clone(),
            }),
            GateState::Proposed(_) => Err(Error::ActionIncomplete {
                missing: self.missing_fields(),
            }),
            GateState::Idle | GateState::Executed(_) => Err(Error::ActionIncomplete {
                missing: vec![ActionField::Operation, ActionField::HouseId],
            }),
        }
    }

    /// Fields still needed before the current proposal can run.
    pub fn missing_fields(&self) -> Vec<ActionField> {
        match &self.state {
            GateState::Proposed(pending) => {
                let mut missing = Vec::new();
                if !is_valid_house_id(&pending.house_id) {
                    missing.push(ActionField::HouseId);
                }
                if pending.listing_platform.is_none() {
                    missing.push(ActionField::ListingPlatform);
                }
                missing
            }
            GateState::Rejected { missing } => missing.clone(),
            _ => Vec::new(),
        }
    }

    /// Return to `Idle`.
    pub fn clear(&mut self) {
        self.state = GateState::Idle;
    }

    fn evaluate(pending: PendingAction, user_id: Option<&str>) -> GateState {
        if !is_valid_house_id(&pending.house_id) {
            return GateState::Rejected {
                missing: vec![ActionField::HouseId],
            };
        }
        if pending.listing_platform.is_none() {
            return GateState::Proposed(pending);
        }
        match ActionRequest::new(
            Some(pending.operation),
            Some(&pending.house_id),
            pending.listing_platform,
            user_id,
        ) {
            Ok(request) => GateState::Ready(request),
            Err(Error::ActionIncomplete { missing }) => GateState::Rejected { missing },
            Err(_) => GateState::Rejected {
                missing: vec![ActionField::UserId],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_every_field() {
        let err = ActionRequest::new(Some(Operation::Rent), Some("HF_2001"), None, Some("u1"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ActionIncomplete { ref missing } if missing == &[ActionField::ListingPlatform]
        ));

        let err = ActionRequest::new(
            Some(Operation::Rent),
            Some("HF_2001"),
            Some(ListingPlatform::Anjuke),
            Some("  "),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingIdentity));

        let ok = ActionRequest::new(
            Some(Operation::Offline),
            Some(" HF_7 "),
            Some(ListingPlatform::Lianjia),
            Some("u1"),
        )
        .unwrap();
        assert_eq!(ok.house_id, "HF_7");
    }

    #[test]
    fn malformed_house_ids_are_missing() {
        assert!(is_valid_house_id("HF_2001"));
        assert!(!is_valid_house_id("HF 2001"));
        assert!(!is_valid_house_id("../etc"));
        assert!(!is_valid_house_id(""));
    }

    #[test]
    fn proposal_without_platform_stays_proposed() {
        let mut gate = ActionGate::new();
        gate.propose(Operation::Rent, "HF_2001", None, Some("u1"), 1);
        assert!(gate.is_proposed());
        assert_eq!(gate.missing_fields(), vec![ActionField::ListingPlatform]);

        let err = gate.begin_execution().unwrap_err();
        assert!(matches!(err, Error::ActionIncomplete { .. }));
        assert!(gate.is_proposed());
    }

    #[test]
    fn platform_on_next_turn_makes_ready_then_executed() {
        let mut gate = ActionGate::new();
        gate.propose(Operation::Rent, "HF_2001", None, Some("u1"), 1);
        assert!(gate.supply_platform(ListingPlatform::Anjuke, Some("u1"), 2));
        assert!(matches!(gate.state(), GateState::Ready(_)));

        let request = gate.begin_execution().unwrap();
        assert_eq!(request.listing_platform, ListingPlatform::Anjuke);
        assert!(matches!(gate.state(), GateState::Executed(_)));

        // executed is terminal for this request
        assert!(gate.begin_execution().is_err());
    }

    #[test]
    fn stale_proposal_expires() {
        let mut gate = ActionGate::new();
        gate.propose(Operation::Terminate, "HF_9", None, Some("u1"), 1);
        gate.expire(2);
        assert!(gate.is_proposed());
        gate.expire(3);
        assert_eq!(gate.state(), &GateState::Idle);

        gate.propose(Operation::Terminate, "HF_9", None, Some("u1"), 5);
        assert!(!gate.supply_platform(ListingPlatform::Lianjia, Some("u1"), 7));
        assert_eq!(gate.state(), &GateState::Idle);
    }

    #[test]
    fn missing_user_id_rejects() {
        let mut gate = ActionGate::new();
        gate.propose(Operation::Rent, "HF_1", Some(ListingPlatform::Lianjia), None, 1);
        assert_eq!(
            gate.state(),
            &GateState::Rejected {
                missing: vec![ActionField::UserId]
            }
        );
        assert!(matches!(gate.begin_execution(), Err(Error::MissingIdentity)));
    }

    #[test]
    fn platform_in_same_utterance_is_ready_immediately() {
        let mut gate = ActionGate::new();
        let state = gate.propose(
            Operation::Offline,
            "HF_3",
            Some(ListingPlatform::Tongcheng58),
            Some("u1"),
            4,
        );
        assert!(matches!(state, GateState::Ready(_)));
    }
}
