/// Property-based tests using proptest
/// Tests invariants of the eligibility window and of request resolution
use banco_digital::eligibility::{can_request_credit, EligibilityDecision, EligibilityPolicy};
use banco_digital::lifecycle::{self, Resolution, ResolutionPolicy};
use banco_digital::models::{
    ClientAggregate, CreditRequest, CreditStatus, Decision, Document, NewClient, NewCreditRequest,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn aggregate(onboarding_complete: bool, offsets_secs: &[i64]) -> ClientAggregate {
    let mut client = NewClient {
        name: "Cliente Teste".to_string(),
        document: Document::parse("12345678901").unwrap(),
        email: None,
        phone: None,
        registered_at: now() - Duration::days(800),
    }
    .into_client(1);
    client.onboarding_complete = onboarding_complete;

    let requests: Vec<CreditRequest> = offsets_secs
        .iter()
        .enumerate()
        .map(|(i, offset)| {
            NewCreditRequest {
                client_id: 1,
                requested_at: now() - Duration::seconds(*offset),
            }
            .into_request(i as i64 + 1)
        })
        .collect();

    ClientAggregate::new(client, requests)
}

const WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

// Property: incomplete onboarding always denies
proptest! {
    #[test]
    fn incomplete_onboarding_never_eligible(
        offsets in prop::collection::vec(-WINDOW_SECS..(WINDOW_SECS * 12), 0..6)
    ) {
        prop_assert!(!can_request_credit(&aggregate(false, &offsets), now()));
    }
}

// Property: eligibility matches the window definition
proptest! {
    #[test]
    fn eligible_iff_no_request_inside_window(
        offsets in prop::collection::vec(-WINDOW_SECS..(WINDOW_SECS * 12), 0..6)
    ) {
        let expected = offsets.iter().all(|offset| *offset >= WINDOW_SECS);
        prop_assert_eq!(can_request_credit(&aggregate(true, &offsets), now()), expected);
    }

    #[test]
    fn cooldown_end_is_after_now_when_blocked(
        offsets in prop::collection::vec(0i64..WINDOW_SECS, 1..6)
    ) {
        let decision = EligibilityPolicy::default().evaluate(&aggregate(true, &offsets), now());
        match decision {
            EligibilityDecision::Ineligible(
                banco_digital::eligibility::IneligibilityReason::CooldownActive { available_at, .. }
            ) => prop_assert!(available_at > now()),
            other => prop_assert!(false, "Expected cooldown, got {:?}", other),
        }
    }
}

// Property: resolution invariants
proptest! {
    #[test]
    fn resolution_sets_response_date_once(
        score in proptest::option::of(0i32..=1000),
        approve in proptest::bool::ANY,
        days_later in 0i64..90
    ) {
        let request = lifecycle::open(1, now()).into_request(1);
        let resolution = if approve {
            Resolution {
                decision: Decision::Approved,
                score,
                justification: None,
            }
        } else {
            Resolution {
                decision: Decision::Denied,
                score,
                justification: Some("motivo".to_string()),
            }
        };
        let resolved_at = now() + Duration::days(days_later);
        let policy = ResolutionPolicy::default();

        match lifecycle::resolve(&request, &resolution, &policy, resolved_at) {
            Ok(resolved) => {
                prop_assert!(resolved.status.is_terminal());
                prop_assert_eq!(resolved.responded_at, Some(resolved_at));
                prop_assert_eq!(resolved.score, score);
                let again = lifecycle::resolve(&resolved, &resolution, &policy, resolved_at);
                prop_assert!(again.is_err());
            }
            Err(_) => {
                // Only an approval without score may be refused on a pending request
                prop_assert!(approve && score.is_none());
                prop_assert_eq!(request.status, CreditStatus::InProgress);
            }
        }
    }
}
