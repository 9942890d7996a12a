use application::authorization::evaluate;
use chrono::Utc;
use domain::{
    AccessRequest, Action, ChannelId, Outcome, PolicySet, ReasonCode, RequestSource, RoomState,
    SubjectId,
};
use proptest::prelude::*;
use serde_json::json;

fn guard_policy() -> PolicySet {
    PolicySet::from_json(json!([{
        "subject": "guard",
        "actuator": "frontDoor",
        "actions": ["unlock"],
        "when": {"type": "occupancy", "operator": "<", "value": 5}
    }]))
    .unwrap()
}

fn guard_unlock() -> AccessRequest {
    AccessRequest::new(
        SubjectId::new("guard").unwrap(),
        ChannelId::new("frontDoor").unwrap(),
        Action::Unlock,
        RequestSource::Local,
    )
}

fn room(occupancy: u32) -> RoomState {
    RoomState::observed(Utc::now()).with_occupancy(occupancy).with_version(1)
}

#[test]
fn test_guard_granted_when_room_quiet() {
    let decision = evaluate(&guard_unlock(), guard_policy().rules(), &room(2));
    assert_eq!(decision.outcome, Outcome::Granted);
    assert_eq!(decision.reason, ReasonCode::PolicyMatched);
    assert!(decision.permits_actuation());
}

#[test]
fn test_guard_denied_when_room_crowded() {
    let decision = evaluate(&guard_unlock(), guard_policy().rules(), &room(10));
    assert_eq!(decision.outcome, Outcome::Denied);
    assert_eq!(decision.reason, ReasonCode::NoMatchingPolicy);
    assert!(!decision.permits_actuation());
}

#[test]
fn test_guard_deferred_when_state_stale() {
    let decision = evaluate(&guard_unlock(), guard_policy().rules(), &room(2).into_stale());
    assert_eq!(decision.outcome, Outcome::Deferred);
    assert_eq!(decision.reason, ReasonCode::StateUnavailable);
    assert!(!decision.permits_actuation());
}

#[test]
fn test_initial_state_defers() {
    let decision = evaluate(&guard_unlock(), guard_policy().rules(), &RoomState::initial());
    assert_eq!(decision.outcome, Outcome::Deferred);
}

fn subject_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("guard".to_string()),
        Just("guest-1".to_string()),
        "[a-z][a-z0-9_-]{0,15}",
    ]
}

fn actuator_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("frontDoor".to_string()),
        Just("bathLight".to_string()),
        "[a-zA-Z][a-zA-Z0-9_-]{0,15}",
    ]
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Unlock),
        Just(Action::Lock),
        Just(Action::SwitchOn),
        Just(Action::SwitchOff),
    ]
}

fn state_strategy() -> impl Strategy<Value = RoomState> {
    (0u32..20, any::<bool>(), prop::option::of(-10.0f64..40.0)).prop_map(
        |(occupancy, stale, temperature)| {
            let mut state = RoomState::observed(Utc::now()).with_occupancy(occupancy);
            if let Some(t) = temperature {
                state = state.with_measure(domain::MeasureType::RoomTemperature, t);
            }
            if stale { state.into_stale() } else { state }
        },
    )
}

fn mixed_policy() -> PolicySet {
    PolicySet::from_json(json!([
        {
            "name": "no-guests-at-night",
            "subject": "guest-*",
            "actuator": "*",
            "actions": ["unlock"],
            "effect": "deny",
            "when": {"type": "occupancy", "operator": "==", "value": 0}
        },
        {
            "subject": "guard",
            "actuator": "frontDoor",
            "actions": ["unlock", "lock"],
            "when": {"type": "occupancy", "operator": "<", "value": 5}
        },
        {
            "subject": "*",
            "actuator": "bathLight",
            "actions": ["switch_on", "switch_off"],
            "when": {"type": "measure", "measure": "room_temperature", "operator": "<", "value": 30}
        }
    ]))
    .unwrap()
}

proptest! {
    #[test]
    fn no_applicable_rule_is_never_granted(
        subject in subject_strategy(),
        actuator in actuator_strategy(),
        action in action_strategy(),
        state in state_strategy(),
    ) {
        let request = AccessRequest::new(
            SubjectId::new(subject).unwrap(),
            ChannelId::new(actuator).unwrap(),
            action,
            RequestSource::Remote,
        );
        let policy = mixed_policy();
        let decision = evaluate(&request, policy.rules(), &state);

        if !policy.rules().iter().any(|rule| rule.applies_to(&request)) {
            prop_assert_eq!(decision.outcome, Outcome::Denied);
            prop_assert_eq!(decision.reason, ReasonCode::NoMatchingPolicy);
        }
        if decision.reason == ReasonCode::NoMatchingPolicy {
            prop_assert_ne!(decision.outcome, Outcome::Granted);
        }
    }

    #[test]
    fn stale_state_is_never_granted(
        subject in subject_strategy(),
        actuator in actuator_strategy(),
        action in action_strategy(),
        state in state_strategy(),
    ) {
        let request = AccessRequest::new(
            SubjectId::new(subject).unwrap(),
            ChannelId::new(actuator).unwrap(),
            action,
            RequestSource::Local,
        );
        let policy = mixed_policy();
        let stale = state.into_stale();
        let decision = evaluate(&request, policy.rules(), &stale);

        prop_assert_ne!(decision.outcome, Outcome::Granted);
        if policy.rules().iter().any(|rule| rule.applies_to(&request)) {
            prop_assert_eq!(decision.outcome, Outcome::Deferred);
            prop_assert_eq!(decision.reason, ReasonCode::StateUnavailable);
        }
    }

    #[test]
    fn evaluation_is_idempotent(
        subject in subject_strategy(),
        actuator in actuator_strategy(),
        action in action_strategy(),
        state in state_strategy(),
    ) {
        let request = AccessRequest::new(
            SubjectId::new(subject).unwrap(),
            ChannelId::new(actuator).unwrap(),
            action,
            RequestSource::Local,
        );
        let policy = mixed_policy();
        let first = evaluate(&request, policy.rules(), &state);
        let second = evaluate(&request, policy.rules(), &state);
        prop_assert!(first.same_verdict(&second));
    }
}
