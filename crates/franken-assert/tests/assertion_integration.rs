//! Integration tests for the `assert` family: SameValue semantics, error
//! kind identity in `throws`, message construction around hostile values and
//! the event journal.

use frankenengine_assert::assert::{assert_true, is_same_value, not_same_value, same_value, throws, throws_with};
use frankenengine_assert::events::to_jsonl;
use frankenengine_assert::{Abrupt, ErrorKind, HarnessConfig, HarnessError, HarnessEvent, JsValue, Realm};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn num(n: f64) -> JsValue {
    JsValue::Number(n)
}

fn thrower(realm: &mut Realm, value: JsValue) -> JsValue {
    let f = realm.new_function("thrower", 0, move |_, _, _| Err(Abrupt::Throw(value.clone())));
    JsValue::Object(f)
}

// ===========================================================================
// 1. SameValue
// ===========================================================================

#[test]
fn same_value_table() {
    let mut realm = Realm::new();
    assert!(same_value(&mut realm, &num(0.0), &num(-0.0), None).is_err());
    assert!(same_value(&mut realm, &num(-0.0), &num(-0.0), None).is_ok());
    assert!(same_value(&mut realm, &num(f64::NAN), &num(f64::NAN), None).is_ok());
    assert!(same_value(&mut realm, &num(1.0), &num(1.0), None).is_ok());
}

#[test]
fn not_same_value_negates_same_value_for_all_pairs() {
    let mut realm = Realm::new();
    let o = JsValue::Object(realm.new_object());
    let p = JsValue::Object(realm.new_object());
    let values = [
        num(0.0),
        num(-0.0),
        num(f64::NAN),
        num(1.0),
        JsValue::str("1"),
        JsValue::Undefined,
        JsValue::Null,
        JsValue::Bool(false),
        o,
        p,
    ];
    for a in &values {
        for b in &values {
            let same = same_value(&mut realm, a, b, None).is_ok();
            let not_same = not_same_value(&mut realm, a, b, None).is_ok();
            assert_ne!(same, not_same, "pair {a} / {b}");
            assert_eq!(same, is_same_value(a, b));
        }
    }
}

#[test]
fn not_same_value_message() {
    let mut realm = Realm::new();
    let err = not_same_value(&mut realm, &num(-0.0), &num(-0.0), Some("zeros")).unwrap_err();
    assert_eq!(err.message(), "zeros Expected SameValue(«-0», «-0») to be false");
    assert!(err.is_assertion());
}

#[test]
fn failure_message_survives_throwing_to_string() {
    let mut realm = Realm::new();
    let hostile = realm.new_object();
    let boom = realm.new_function("toString", 0, |_, _, _| Err(Abrupt::type_error("boom")));
    realm.put(hostile, &"toString".into(), JsValue::Object(boom)).unwrap();
    let err = same_value(&mut realm, &JsValue::Object(hostile), &num(1.0), None).unwrap_err();
    assert_eq!(err.message(), "Expected SameValue(«[object Object]», «1») to be true");
}

#[test]
fn assert_true_rejects_truthy_non_booleans() {
    let mut realm = Realm::new();
    for value in [num(1.0), JsValue::str("true"), JsValue::Object(realm.new_object())] {
        assert!(assert_true(&mut realm, &value, None).is_err());
    }
    let err = assert_true(&mut realm, &JsValue::Undefined, None).unwrap_err();
    assert_eq!(err.message(), "Expected true but got undefined");
}

// ===========================================================================
// 2. throws
// ===========================================================================

#[test]
fn throws_matches_intrinsic_kinds() {
    let mut realm = Realm::new();
    for kind in ErrorKind::ALL {
        let ctor = realm.error_constructor(kind);
        let error = JsValue::Object(realm.new_error(kind, "x"));
        let op = thrower(&mut realm, error);
        throws(&mut realm, &ctor, &op, None).unwrap();
    }
}

#[test]
fn throws_rejects_subclass_of_expected_kind() {
    let mut realm = Realm::new();
    let type_error = realm.error_constructor(ErrorKind::TypeError);
    let sub = realm.define_error_subclass("MyTypeError", &type_error).unwrap();
    let instance = realm.call(&JsValue::Object(sub), &JsValue::Undefined, &[]).unwrap();
    assert!(realm.instance_of_kind(&instance, ErrorKind::TypeError));

    let op = thrower(&mut realm, instance);
    let err = throws(&mut realm, &type_error, &op, None).unwrap_err();
    assert_eq!(err.message(), "Expected a TypeError but got a MyTypeError");

    throws(&mut realm, &JsValue::Object(sub), &op, None).unwrap();
}

#[test]
fn throws_builtin_type_error_from_strict_write() {
    let mut realm = Realm::new();
    let frozen = realm.new_object_from(&[("x", num(1.0))]);
    realm.freeze(frozen).unwrap();
    let ctor = realm.error_constructor(ErrorKind::TypeError);
    throws_with(
        &mut realm,
        &ctor,
        move |realm| realm.put(frozen, &"x".into(), JsValue::from(2)),
        None,
    )
    .unwrap();
}

#[test]
fn throws_range_error_from_array_length() {
    let mut realm = Realm::new();
    let array = realm.new_array(Vec::new());
    let ctor = realm.error_constructor(ErrorKind::RangeError);
    throws_with(
        &mut realm,
        &ctor,
        move |realm| realm.put(array, &"length".into(), JsValue::from(-1)),
        None,
    )
    .unwrap();
}

#[test]
fn throws_without_throw_names_expected_kind() {
    let mut realm = Realm::new();
    let ctor = realm.error_constructor(ErrorKind::SyntaxError);
    let err = throws_with(&mut realm, &ctor, |_| Ok(()), None).unwrap_err();
    assert_eq!(
        err.message(),
        "Expected a SyntaxError to be thrown but no exception was thrown at all"
    );
}

#[test]
fn throws_non_callable_operation_is_usage_error_before_calling() {
    let mut realm = Realm::new();
    let ctor = realm.error_constructor(ErrorKind::Error);
    let err = throws(&mut realm, &ctor, &num(1.0), None).unwrap_err();
    assert!(matches!(err, HarnessError::Usage { .. }));
    assert_eq!(err.code(), "FE-ASSERT-0001");
}

#[test]
fn nested_assertion_failure_composes_with_throws() {
    let mut realm = Realm::new();
    let ctor = realm.error_constructor(ErrorKind::Test262Error);
    throws_with(
        &mut realm,
        &ctor,
        |realm| {
            same_value(realm, &num(1.0), &num(2.0), None).map_err(|err| err.into_abrupt(realm))
        },
        None,
    )
    .unwrap();
}

// ===========================================================================
// 3. Event journal
// ===========================================================================

#[test]
fn every_call_is_journaled_with_correlation_ids() {
    let config = HarnessConfig {
        trace_id: "trace-42".to_string(),
        decision_id: "decision-42".to_string(),
        ..HarnessConfig::default()
    };
    let mut realm = Realm::with_config(config.clone()).unwrap();
    same_value(&mut realm, &num(1.0), &num(1.0), None).unwrap();
    let _ = assert_true(&mut realm, &JsValue::Bool(false), None);
    let events = realm.drain_events();
    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.trace_id, "trace-42");
        assert_eq!(event.decision_id, "decision-42");
        assert_eq!(event.env_fingerprint, config.fingerprint());
    }
    assert_eq!(events[1].error_code.as_deref(), Some("FE-ASSERT-0002"));
    assert!(realm.events().is_empty());
}

#[test]
fn journal_serializes_as_jsonl() {
    let mut realm = Realm::new();
    same_value(&mut realm, &num(1.0), &num(1.0), None).unwrap();
    let jsonl = to_jsonl(realm.events()).unwrap();
    let event: HarnessEvent = serde_json::from_str(jsonl.trim_end()).unwrap();
    assert_eq!(event.event, "same_value");
    assert_eq!(event.component, "conformance_assert");
}
