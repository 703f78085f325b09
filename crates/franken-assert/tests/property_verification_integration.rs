//! Integration tests for `verify_property` and the per-facet helpers:
//! absence checks, facet aggregation, restore semantics, array `length`,
//! symbol keys and host objects whose descriptors disagree with behavior.

use frankenengine_assert::property::{
    verify_configurable, verify_enumerable, verify_equal_to, verify_not_configurable,
    verify_not_enumerable, verify_not_writable, verify_property, verify_writable,
};
use frankenengine_assert::{
    Abrupt, DescriptorArg, ExpectedDescriptor, Facet, HarnessConfig, HarnessError, JsValue, ObjectHandle,
    PropertyDescriptor, PropertyKey, Realm, VerifyOptions,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn key(s: &str) -> PropertyKey {
    PropertyKey::from(s)
}

fn obj(handle: ObjectHandle) -> JsValue {
    JsValue::Object(handle)
}

fn descriptor(realm: &Realm, handle: ObjectHandle, name: &str) -> Option<PropertyDescriptor> {
    realm.get_own_property_descriptor(handle, &key(name)).unwrap()
}

// ===========================================================================
// 1. The {a: 1} scenario
// ===========================================================================

#[test]
fn full_descriptor_passes_then_value_mismatch_names_expected_value() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("a", JsValue::from(1))]);

    // The configurability probe deletes `a`; restore keeps it for the next call.
    let report = verify_property(
        &mut realm,
        &obj(o),
        &key("a"),
        ExpectedDescriptor::data(JsValue::from(1), true, true, true).into(),
        Some(VerifyOptions::restore()),
    )
    .unwrap();
    assert_eq!(
        report.checked,
        vec![Facet::Value, Facet::Enumerable, Facet::Writable, Facet::Configurable]
    );
    assert!(report.restored);

    let err = verify_property(
        &mut realm,
        &obj(o),
        &key("a"),
        ExpectedDescriptor::new().value(2).into(),
        None,
    )
    .unwrap_err();
    assert!(err.is_assertion());
    assert_eq!(err.message(), "descriptor value should be 2");
}

#[test]
fn descriptor_given_as_realm_object() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("a", JsValue::from(1))]);
    let desc = realm.new_object_from(&[
        ("value", JsValue::from(1)),
        ("writable", JsValue::Bool(true)),
        ("enumerable", JsValue::Bool(true)),
    ]);
    verify_property(&mut realm, &obj(o), &key("a"), DescriptorArg::Value(obj(desc)), None).unwrap();
    assert_eq!(descriptor(&realm, o, "a"), Some(PropertyDescriptor::data(JsValue::from(1))));
}

// ===========================================================================
// 2. Absence
// ===========================================================================

#[test]
fn undefined_descriptor_succeeds_iff_absent() {
    let mut realm = Realm::new();
    let parent = realm.new_object_from(&[("inherited", JsValue::from(1))]);
    let child = realm.alloc(frankenengine_assert::ObjectKind::Ordinary, Some(parent));
    realm.put(child, &key("own"), JsValue::from(1)).unwrap();

    verify_property(&mut realm, &obj(child), &key("missing"), DescriptorArg::Undefined, None).unwrap();
    verify_property(&mut realm, &obj(child), &key("inherited"), DescriptorArg::Undefined, None).unwrap();
    let err = verify_property(&mut realm, &obj(child), &key("own"), DescriptorArg::Undefined, None)
        .unwrap_err();
    assert!(err.message().contains("obj['own'] descriptor should be undefined"));
}

#[test]
fn omitted_descriptor_is_distinct_from_undefined() {
    let mut realm = Realm::new();
    let o = realm.new_object();
    let err = verify_property(&mut realm, &obj(o), &key("x"), DescriptorArg::Missing, None).unwrap_err();
    assert!(matches!(err, HarnessError::Usage { .. }));
    assert!(verify_property(&mut realm, &obj(o), &key("x"), DescriptorArg::Undefined, None).is_ok());
}

#[test]
fn non_boolean_flags_always_mismatch() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("x", JsValue::from(1))]);
    let desc = realm.new_object_from(&[
        ("enumerable", JsValue::from(1)),
        ("writable", JsValue::Undefined),
    ]);
    let err = verify_property(&mut realm, &obj(o), &key("x"), DescriptorArg::Value(obj(desc)), None)
        .unwrap_err();
    assert!(err.is_assertion());
    assert_eq!(
        err.message(),
        "descriptor should be enumerable; descriptor should not be writable"
    );
    assert_eq!(descriptor(&realm, o, "x"), Some(PropertyDescriptor::data(JsValue::from(1))));
}

#[test]
fn null_descriptor_is_rejected() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("x", JsValue::from(1))]);
    let err = verify_property(&mut realm, &obj(o), &key("x"), DescriptorArg::Value(JsValue::Null), None)
        .unwrap_err();
    assert_eq!(err.message(), "The desc argument should be an object or undefined, null");
}

// ===========================================================================
// 3. Restore
// ===========================================================================

#[test]
fn restore_reapplies_descriptor_even_on_mismatch() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("x", JsValue::from(1))]);
    let before = descriptor(&realm, o, "x");

    let err = verify_property(
        &mut realm,
        &obj(o),
        &key("x"),
        ExpectedDescriptor::data(JsValue::from(9), false, false, true).into(),
        Some(VerifyOptions::restore()),
    )
    .unwrap_err();
    assert_eq!(
        err.message(),
        "descriptor value should be 9; descriptor should not be enumerable; descriptor should not be writable"
    );
    assert_eq!(descriptor(&realm, o, "x"), before);
}

#[test]
fn restore_keeps_non_default_flags() {
    let mut realm = Realm::new();
    let o = realm.new_object();
    let original = PropertyDescriptor::with_flags(JsValue::str("v"), true, false, true);
    realm.define_own_property(o, key("x"), original.clone()).unwrap();
    verify_property(
        &mut realm,
        &obj(o),
        &key("x"),
        ExpectedDescriptor::new().configurable(true).into(),
        Some(VerifyOptions::restore()),
    )
    .unwrap();
    assert_eq!(descriptor(&realm, o, "x"), Some(original));
}

#[test]
fn restore_rejected_on_non_extensible_object_is_unexpected() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("a", JsValue::from(1))]);
    realm.prevent_extensions(o).unwrap();
    let err = verify_property(
        &mut realm,
        &obj(o),
        &key("a"),
        ExpectedDescriptor::new().configurable(true).into(),
        Some(VerifyOptions::restore()),
    )
    .unwrap_err();
    assert!(matches!(err, HarnessError::Unexpected { .. }));
    assert_eq!(err.message(), "restoring obj[a] failed: redefinition was rejected");
    assert_eq!(descriptor(&realm, o, "a"), None);
}

#[test]
fn unexpected_probe_throw_propagates_and_descriptor_is_restored() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("x", JsValue::from(1))]);
    let before = descriptor(&realm, o, "x");
    let hook = realm.new_function("set", 2, |_, _, _| Err(Abrupt::range_error("host refused")));
    realm.set_host_set_hook(o, hook).unwrap();
    let err = verify_property(
        &mut realm,
        &obj(o),
        &key("x"),
        ExpectedDescriptor::new().writable(true).into(),
        Some(VerifyOptions::restore()),
    )
    .unwrap_err();
    assert!(matches!(err, HarnessError::Unexpected { .. }));
    assert!(!err.is_assertion());
    assert_eq!(err.message(), "Expected TypeError, got RangeError: host refused");
    assert_eq!(descriptor(&realm, o, "x"), before);
}

#[test]
fn without_restore_non_destructive_probes_leave_state_intact() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("x", JsValue::from(1))]);
    let before = descriptor(&realm, o, "x");
    verify_property(
        &mut realm,
        &obj(o),
        &key("x"),
        ExpectedDescriptor::new().value(1).writable(true).enumerable(true).into(),
        None,
    )
    .unwrap();
    assert_eq!(descriptor(&realm, o, "x"), before);
}

#[test]
fn without_restore_configurable_probe_deletes() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("x", JsValue::from(1))]);
    verify_property(
        &mut realm,
        &obj(o),
        &key("x"),
        ExpectedDescriptor::new().configurable(true).into(),
        None,
    )
    .unwrap();
    assert_eq!(descriptor(&realm, o, "x"), None);
}

// ===========================================================================
// 4. Arrays, symbols, frozen objects
// ===========================================================================

#[test]
fn array_length_descriptor() {
    let mut realm = Realm::new();
    let a = realm.new_array(vec![JsValue::from(1), JsValue::from(2)]);
    verify_property(
        &mut realm,
        &obj(a),
        &key("length"),
        ExpectedDescriptor::data(JsValue::from(2), true, false, false).into(),
        None,
    )
    .unwrap();
    assert_eq!(realm.get(a, &key("length")).unwrap(), JsValue::from(2));
    assert!(realm.has_own_property(a, &key("1")).unwrap());
}

#[test]
fn symbol_keyed_property() {
    let mut realm = Realm::new();
    let o = realm.new_object();
    let sym = PropertyKey::Symbol(realm.new_symbol(Some("tag")));
    realm
        .define_own_property(o, sym.clone(), PropertyDescriptor::data(JsValue::from(1)))
        .unwrap();
    verify_property(
        &mut realm,
        &obj(o),
        &sym,
        ExpectedDescriptor::data(JsValue::from(1), true, true, true).into(),
        Some(VerifyOptions::restore()),
    )
    .unwrap();
    let err = verify_property(&mut realm, &obj(o), &sym, DescriptorArg::Undefined, None).unwrap_err();
    assert!(err.message().contains("obj['Symbol(tag)']"));
}

#[test]
fn frozen_property_reports_all_false() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("k", JsValue::from(1))]);
    realm.freeze(o).unwrap();
    verify_property(
        &mut realm,
        &obj(o),
        &key("k"),
        ExpectedDescriptor::data(JsValue::from(1), false, true, false).into(),
        None,
    )
    .unwrap();
    verify_not_writable(&mut realm, &obj(o), &key("k"), None).unwrap();
    verify_not_configurable(&mut realm, &obj(o), &key("k")).unwrap();
}

#[test]
fn sloppy_mode_probes_agree_with_strict_mode() {
    let mut realm = Realm::with_config(HarnessConfig {
        strict_mode: false,
        ..HarnessConfig::default()
    })
    .unwrap();
    let o = realm.new_object_from(&[("k", JsValue::from(1))]);
    realm.freeze(o).unwrap();
    verify_property(
        &mut realm,
        &obj(o),
        &key("k"),
        ExpectedDescriptor::new().writable(false).configurable(false).into(),
        None,
    )
    .unwrap();
}

// ===========================================================================
// 5. Host objects that lie
// ===========================================================================

#[test]
fn descriptor_says_writable_but_writes_are_dropped() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("x", JsValue::from(1))]);
    let hook = realm.new_function("set", 2, |_, _, _| Ok(JsValue::Bool(true)));
    realm.set_host_set_hook(o, hook).unwrap();
    let err = verify_property(
        &mut realm,
        &obj(o),
        &key("x"),
        ExpectedDescriptor::new().writable(true).into(),
        None,
    )
    .unwrap_err();
    assert_eq!(err.message(), "descriptor should be writable");
}

// ===========================================================================
// 6. Per-facet helpers
// ===========================================================================

#[test]
fn per_facet_helpers_on_default_property() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("p", JsValue::str("v"))]);
    let target = obj(o);
    verify_equal_to(&mut realm, &target, &key("p"), &JsValue::str("v")).unwrap();
    verify_writable(&mut realm, &target, &key("p"), None, None).unwrap();
    verify_enumerable(&mut realm, &target, &key("p")).unwrap();
    verify_configurable(&mut realm, &target, &key("p")).unwrap();
    assert!(descriptor(&realm, o, "p").is_none());
}

#[test]
fn per_facet_helpers_on_hidden_property() {
    let mut realm = Realm::new();
    let o = realm.new_object();
    realm
        .define_own_property(o, key("h"), PropertyDescriptor::hidden(JsValue::from(1)))
        .unwrap();
    let target = obj(o);
    verify_not_enumerable(&mut realm, &target, &key("h")).unwrap();
    let err = verify_enumerable(&mut realm, &target, &key("h")).unwrap_err();
    assert_eq!(err.message(), "Expected obj[h] to have enumerable:true.");
}

#[test]
fn verify_equal_to_reports_both_values() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("n", JsValue::Number(f64::NAN))]);
    verify_equal_to(&mut realm, &obj(o), &key("n"), &JsValue::Number(f64::NAN)).unwrap();
    let err = verify_equal_to(&mut realm, &obj(o), &key("n"), &JsValue::from(1)).unwrap_err();
    assert_eq!(err.message(), "Expected obj[n] to equal 1, actually NaN");
}

#[test]
fn verification_events_are_journaled() {
    let mut realm = Realm::new();
    let o = realm.new_object_from(&[("x", JsValue::from(1))]);
    realm.drain_events();
    let _ = verify_property(
        &mut realm,
        &obj(o),
        &key("x"),
        ExpectedDescriptor::new().value(2).into(),
        None,
    );
    let events = realm.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "verify_property");
    assert_eq!(events[0].outcome, "fail");
    assert_eq!(events[0].detail.as_deref(), Some("descriptor value should be 2"));
}
