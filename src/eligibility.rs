//! Credit eligibility evaluator
//!
//! A client may open a new credit request only when:
//! 1. Onboarding is complete
//! 2. No credit request of theirs falls inside the cooldown window
//!
//! The window is `(now - cooldown, now]` and is open-ended towards the
//! future: a request dated after `now` (clock skew) still blocks.

use crate::models::{ClientAggregate, CreditRequest};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Days a client must wait between two credit requests.
pub const DEFAULT_COOLDOWN_DAYS: i64 = 30;

/// Longest cooldown a policy accepts, in days.
pub const MAX_COOLDOWN_DAYS: i64 = 36_500;

/// Why a client cannot open a credit request right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IneligibilityReason {
    /// Registration is not finished yet.
    OnboardingIncomplete,
    /// A recent request is still inside the cooldown window.
    CooldownActive {
        /// Timestamp of the most recent blocking request.
        last_requested_at: DateTime<Utc>,
        /// First instant at which the client becomes eligible again.
        available_at: DateTime<Utc>,
    },
}

/// Outcome of an eligibility check. Being ineligible is a valid answer, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityDecision {
    Eligible,
    Ineligible(IneligibilityReason),
}

impl EligibilityDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, EligibilityDecision::Eligible)
    }
}

/// Parameters of the eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityPolicy {
    pub cooldown: Duration,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::days(DEFAULT_COOLDOWN_DAYS),
        }
    }
}

impl EligibilityPolicy {
    /// Builds a policy with a cooldown of `days`, clamped to `0..=MAX_COOLDOWN_DAYS`.
    pub fn with_cooldown_days(days: i64) -> Self {
        Self {
            cooldown: Duration::days(days.clamp(0, MAX_COOLDOWN_DAYS)),
        }
    }

    /// Evaluates whether `aggregate` may open a credit request at `now`.
    ///
    /// `aggregate` must carry the client's complete request history; a
    /// partial set yields an overly permissive answer.
    pub fn evaluate(&self, aggregate: &ClientAggregate, now: DateTime<Utc>) -> EligibilityDecision {
        if !aggregate.client.onboarding_complete {
            return EligibilityDecision::Ineligible(IneligibilityReason::OnboardingIncomplete);
        }

        match self.cooldown_block(&aggregate.credit_requests, now) {
            Some(reason) => EligibilityDecision::Ineligible(reason),
            None => EligibilityDecision::Eligible,
        }
    }

    /// Returns the `CooldownActive` reason if any of `requests` falls inside
    /// the window ending at `now`, ignoring onboarding.
    ///
    /// A window start or end beyond chrono's date range saturates instead of
    /// overflowing.
    pub fn cooldown_block(
        &self,
        requests: &[CreditRequest],
        now: DateTime<Utc>,
    ) -> Option<IneligibilityReason> {
        let window_start = now.checked_sub_signed(self.cooldown);
        let last_requested_at = requests
            .iter()
            .map(|r| r.requested_at)
            .filter(|requested_at| window_start.map_or(true, |start| *requested_at > start))
            .max()?;

        Some(IneligibilityReason::CooldownActive {
            last_requested_at,
            available_at: last_requested_at
                .checked_add_signed(self.cooldown)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }
}

/// Returns `true` iff the client may open a credit request at `now`, using
/// the default 30-day cooldown.
pub fn can_request_credit(aggregate: &ClientAggregate, now: DateTime<Utc>) -> bool {
    EligibilityPolicy::default()
        .evaluate(aggregate, now)
        .is_eligible()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, CreditRequest, Document, NewClient, NewCreditRequest};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn client(onboarding_complete: bool) -> Client {
        let mut client = NewClient {
            name: "João da Silva".to_string(),
            document: Document::parse("12345678901").unwrap(),
            email: None,
            phone: None,
            registered_at: now() - Duration::days(365),
        }
        .into_client(1);
        client.onboarding_complete = onboarding_complete;
        client
    }

    fn request_at(id: i64, requested_at: DateTime<Utc>) -> CreditRequest {
        NewCreditRequest {
            client_id: 1,
            requested_at,
        }
        .into_request(id)
    }

    #[test]
    fn test_incomplete_onboarding_wins_over_history() {
        let aggregate = ClientAggregate::new(client(false), vec![]);
        assert_eq!(
            EligibilityPolicy::default().evaluate(&aggregate, now()),
            EligibilityDecision::Ineligible(IneligibilityReason::OnboardingIncomplete)
        );
    }

    #[test]
    fn test_cooldown_reports_latest_blocking_request() {
        let first = now() - Duration::days(20);
        let second = now() - Duration::days(5);
        let aggregate = ClientAggregate::new(
            client(true),
            vec![request_at(1, second), request_at(2, first)],
        );

        assert_eq!(
            EligibilityPolicy::default().evaluate(&aggregate, now()),
            EligibilityDecision::Ineligible(IneligibilityReason::CooldownActive {
                last_requested_at: second,
                available_at: second + Duration::days(30),
            })
        );
    }

    #[test]
    fn test_custom_cooldown() {
        let aggregate = ClientAggregate::new(
            client(true),
            vec![request_at(1, now() - Duration::days(10))],
        );
        assert!(EligibilityPolicy::with_cooldown_days(7)
            .evaluate(&aggregate, now())
            .is_eligible());
        assert!(!EligibilityPolicy::with_cooldown_days(14)
            .evaluate(&aggregate, now())
            .is_eligible());
    }

    #[test]
    fn test_cooldown_days_are_clamped() {
        assert_eq!(
            EligibilityPolicy::with_cooldown_days(200_000_000).cooldown,
            Duration::days(MAX_COOLDOWN_DAYS)
        );
        assert_eq!(EligibilityPolicy::with_cooldown_days(-3).cooldown, Duration::zero());
    }

    #[test]
    fn test_cooldown_beyond_date_range_saturates() {
        // Far enough back that `now - cooldown` leaves chrono's range
        let policy = EligibilityPolicy {
            cooldown: Duration::days(100_000_000),
        };
        let requested_at = now() - Duration::days(4_000);
        let aggregate = ClientAggregate::new(client(true), vec![request_at(1, requested_at)]);

        assert_eq!(
            policy.evaluate(&aggregate, now()),
            EligibilityDecision::Ineligible(IneligibilityReason::CooldownActive {
                last_requested_at: requested_at,
                available_at: DateTime::<Utc>::MAX_UTC,
            })
        );
    }

    #[test]
    fn test_one_second_inside_window_blocks() {
        let aggregate = ClientAggregate::new(
            client(true),
            vec![request_at(1, now() - Duration::days(30) + Duration::seconds(1))],
        );
        assert!(!can_request_credit(&aggregate, now()));
    }
}
