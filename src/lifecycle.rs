//! Credit request lifecycle
//!
//! ```text
//! (none) --open--> EmAndamento --resolve(Aprovado)--> Aprovado
//!                              \--resolve(Negado)---> Negado
//! ```
//!
//! `Aprovado` and `Negado` are terminal. Resolution is not idempotent: a
//! second resolve on the same request is rejected, never overwritten.

use crate::models::{
    ClientId, CreditRequest, CreditRequestId, CreditStatus, Decision, NewCreditRequest,
    ScoringResult,
};
use chrono::{DateTime, Utc};
use std::fmt;

impl CreditStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CreditStatus::InProgress)
    }

    pub fn can_transition_to(&self, next: CreditStatus) -> bool {
        matches!(
            (self, next),
            (CreditStatus::InProgress, CreditStatus::Approved)
                | (CreditStatus::InProgress, CreditStatus::Denied)
        )
    }
}

/// Lifecycle rule violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The request is not in a state that allows the transition.
    InvalidStateTransition {
        request_id: CreditRequestId,
        from: CreditStatus,
        to: CreditStatus,
    },
    /// An approval arrived without a score while the policy requires one.
    MissingScore,
    /// A denial arrived without a justification while the policy requires one.
    MissingJustification,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::InvalidStateTransition {
                request_id,
                from,
                to,
            } => write!(
                f,
                "Credit request {} cannot move from {} to {}",
                request_id, from, to
            ),
            LifecycleError::MissingScore => write!(f, "Approval requires a score"),
            LifecycleError::MissingJustification => {
                write!(f, "Denial requires a justification")
            }
        }
    }
}

impl std::error::Error for LifecycleError {}

/// Guards applied when a pending request is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPolicy {
    pub require_score_on_approval: bool,
    pub require_justification_on_denial: bool,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            require_score_on_approval: true,
            require_justification_on_denial: false,
        }
    }
}

/// Decision data supplied by the scoring process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub decision: Decision,
    pub score: Option<i32>,
    pub justification: Option<String>,
}

impl Resolution {
    pub fn approve(score: i32) -> Self {
        Self {
            decision: Decision::Approved,
            score: Some(score),
            justification: None,
        }
    }

    pub fn deny(justification: impl Into<String>) -> Self {
        Self {
            decision: Decision::Denied,
            score: None,
            justification: Some(justification.into()),
        }
    }

    pub fn with_score(mut self, score: i32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }
}

impl From<ScoringResult> for Resolution {
    fn from(result: ScoringResult) -> Self {
        Self {
            decision: result.decision,
            score: result.score,
            justification: result.justification,
        }
    }
}

/// Opens a new request for `client_id` at `now`, in the initial state.
///
/// The caller must have confirmed eligibility for the client.
pub fn open(client_id: ClientId, now: DateTime<Utc>) -> NewCreditRequest {
    NewCreditRequest {
        client_id,
        requested_at: now,
    }
}

/// Resolves a pending request, returning the updated request.
///
/// The state check runs before the policy guards, so an already resolved
/// request always reports `InvalidStateTransition`. Blank justifications
/// are stored as absent.
pub fn resolve(
    request: &CreditRequest,
    resolution: &Resolution,
    policy: &ResolutionPolicy,
    now: DateTime<Utc>,
) -> Result<CreditRequest, LifecycleError> {
    let next = CreditStatus::from(resolution.decision);
    if !request.status.can_transition_to(next) {
        return Err(LifecycleError::InvalidStateTransition {
            request_id: request.id,
            from: request.status,
            to: next,
        });
    }

    let justification = resolution
        .justification
        .as_deref()
        .map(str::trim)
        .filter(|j| !j.is_empty())
        .map(str::to_string);

    match resolution.decision {
        Decision::Approved if policy.require_score_on_approval && resolution.score.is_none() => {
            return Err(LifecycleError::MissingScore);
        }
        Decision::Denied if policy.require_justification_on_denial && justification.is_none() => {
            return Err(LifecycleError::MissingJustification);
        }
        _ => {}
    }

    Ok(CreditRequest {
        status: next,
        score: resolution.score,
        justification,
        responded_at: Some(now),
        ..request.clone()
    })
}
