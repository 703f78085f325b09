//! `verifyProperty` and the per-facet `verify*` helpers.
//!
//! Each facet is checked twice: against the descriptor the object reports,
//! and against what the object does when probed. Both must agree with the
//! expectation.

use crate::descriptor::{DescriptorArg, ExpectedDescriptor, Facet, VerificationReport, VerifyOptions};
use crate::error::HarnessError;
use crate::events;
use crate::object_model::PropertyDescriptor;
use crate::probe;
use crate::realm::Realm;
use crate::stringify::{describe_abrupt, safe_stringify};
use crate::value::{JsValue, ObjectHandle, PropertyKey};

const MISSING_DESCRIPTOR: &str =
    "verifyProperty should receive at least 3 arguments: obj, name, and descriptor";

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn require_object(realm: &mut Realm, target: &JsValue, helper: &str) -> Result<ObjectHandle, HarnessError> {
    target.as_object().ok_or_else(|| {
        HarnessError::usage(format!(
            "{helper} expects an object target, got {}",
            safe_stringify(realm, target)
        ))
    })
}

fn key_name(realm: &mut Realm, key: &PropertyKey) -> String {
    safe_stringify(realm, &key.to_value())
}

fn own_descriptor(
    realm: &mut Realm,
    target: ObjectHandle,
    key: &PropertyKey,
) -> Result<Option<PropertyDescriptor>, HarnessError> {
    realm
        .get_own_property_descriptor(target, key)
        .map_err(|abrupt| HarnessError::unexpected(describe_abrupt(realm, &abrupt)))
}

/// Descriptor of a property the helper requires to exist.
fn existing_descriptor(
    realm: &mut Realm,
    target: ObjectHandle,
    key: &PropertyKey,
) -> Result<PropertyDescriptor, HarnessError> {
    match own_descriptor(realm, target, key)? {
        Some(desc) => Ok(desc),
        None => {
            let name = key_name(realm, key);
            Err(HarnessError::assertion(format!("obj should have an own property {name}")))
        }
    }
}

fn should(flag: bool, facet: Facet) -> String {
    let not = if flag { "" } else { "not " };
    format!("descriptor should {not}be {facet}")
}

// ---------------------------------------------------------------------------
// verify_property
// ---------------------------------------------------------------------------

/// Check that `target[key]` matches `desc`.
///
/// Facets are checked in the order value, enumerable, writable,
/// configurable. A facet whose reported value already disagrees is not
/// probed. Every mismatch is collected and reported together, joined with
/// `"; "`. The configurability probe deletes a configurable property; pass
/// [`VerifyOptions::restore`] to have the original descriptor reapplied,
/// which happens before any failure is raised. A restore that does not take
/// is [`HarnessError::Unexpected`], unless a probe already failed that way.
pub fn verify_property(
    realm: &mut Realm,
    target: &JsValue,
    key: &PropertyKey,
    desc: DescriptorArg,
    options: Option<VerifyOptions>,
) -> Result<VerificationReport, HarnessError> {
    let result = verify_property_inner(realm, target, key, desc, options.unwrap_or_default());
    events::record(realm, "verify_property", result)
}

fn verify_property_inner(
    realm: &mut Realm,
    target: &JsValue,
    key: &PropertyKey,
    desc: DescriptorArg,
    options: VerifyOptions,
) -> Result<VerificationReport, HarnessError> {
    if matches!(desc, DescriptorArg::Missing) {
        return Err(HarnessError::usage(MISSING_DESCRIPTOR));
    }
    let handle = require_object(realm, target, "verifyProperty")?;
    let name = key_name(realm, key);
    let original = own_descriptor(realm, handle, key)?;

    let expected = match desc {
        DescriptorArg::Missing => return Err(HarnessError::usage(MISSING_DESCRIPTOR)),
        DescriptorArg::Undefined => {
            if original.is_some() {
                return Err(HarnessError::assertion(format!(
                    "obj['{name}'] descriptor should be undefined Expected SameValue(«[object Object]», «undefined») to be true"
                )));
            }
            return Ok(VerificationReport {
                name,
                absent: true,
                checked: Vec::new(),
                restored: false,
            });
        }
        DescriptorArg::Value(value) => {
            if original.is_none() {
                return Err(HarnessError::assertion(format!("obj should have an own property {name}")));
            }
            ExpectedDescriptor::from_object(realm, &value)?
        }
        DescriptorArg::Record(record) => record,
    };
    let Some(original) = original else {
        return Err(HarnessError::assertion(format!("obj should have an own property {name}")));
    };

    let mut checked = Vec::new();
    let outcome = check_facets(realm, handle, key, &original, &expected, &mut checked);

    let restore_error = if options.restore {
        restore_original(realm, handle, key, original, &name).err()
    } else {
        None
    };

    let failures = outcome?;
    if let Some(err) = restore_error {
        return Err(err);
    }
    if !failures.is_empty() {
        return Err(HarnessError::assertion(failures.join("; ")));
    }
    Ok(VerificationReport {
        name,
        absent: false,
        checked,
        restored: options.restore,
    })
}

/// Reapply the descriptor captured before probing. A rejected or throwing
/// redefinition means the property could not be put back.
fn restore_original(
    realm: &mut Realm,
    target: ObjectHandle,
    key: &PropertyKey,
    original: PropertyDescriptor,
    name: &str,
) -> Result<(), HarnessError> {
    match realm.define_own_property(target, key.clone(), original) {
        Ok(true) => Ok(()),
        Ok(false) => Err(HarnessError::unexpected(format!(
            "restoring obj[{name}] failed: redefinition was rejected"
        ))),
        Err(abrupt) => Err(HarnessError::unexpected(format!(
            "restoring obj[{name}] failed: {}",
            describe_abrupt(realm, &abrupt)
        ))),
    }
}

fn check_facets(
    realm: &mut Realm,
    target: ObjectHandle,
    key: &PropertyKey,
    original: &PropertyDescriptor,
    expected: &ExpectedDescriptor,
    checked: &mut Vec<Facet>,
) -> Result<Vec<String>, HarnessError> {
    let mut failures = Vec::new();

    if let Some(value) = &expected.value {
        checked.push(Facet::Value);
        let actual = original.value().unwrap_or(&JsValue::Undefined);
        if !value.same_value(actual) {
            failures.push(format!("descriptor value should be {}", safe_stringify(realm, value)));
        }
    }

    if let Some(enumerable) = expected.enumerable {
        checked.push(Facet::Enumerable);
        if enumerable != original.is_enumerable()
            || enumerable != probe::is_enumerable(realm, target, key)?
        {
            failures.push(should(enumerable, Facet::Enumerable));
        }
    } else {
        note_non_boolean(expected, Facet::Enumerable, checked, &mut failures);
    }

    if let Some(writable) = expected.writable {
        checked.push(Facet::Writable);
        if original.writable() != Some(writable)
            || writable != probe::is_writable(realm, target, key, None, None)?
        {
            failures.push(should(writable, Facet::Writable));
        }
    } else {
        note_non_boolean(expected, Facet::Writable, checked, &mut failures);
    }

    if let Some(configurable) = expected.configurable {
        checked.push(Facet::Configurable);
        if configurable != original.is_configurable()
            || configurable != probe::is_configurable(realm, target, key)?
        {
            failures.push(should(configurable, Facet::Configurable));
        }
    } else {
        note_non_boolean(expected, Facet::Configurable, checked, &mut failures);
    }

    Ok(failures)
}

fn note_non_boolean(
    expected: &ExpectedDescriptor,
    facet: Facet,
    checked: &mut Vec<Facet>,
    failures: &mut Vec<String>,
) {
    if let Some(truthy) = expected.non_boolean_facet(facet) {
        checked.push(facet);
        failures.push(should(truthy, facet));
    }
}

// ---------------------------------------------------------------------------
// per-facet helpers
// ---------------------------------------------------------------------------

/// `target[key]` (through `[[Get]]`) must be SameValue to `value`.
pub fn verify_equal_to(
    realm: &mut Realm,
    target: &JsValue,
    key: &PropertyKey,
    value: &JsValue,
) -> Result<(), HarnessError> {
    let result = check_equal_to(realm, target, key, value);
    events::record(realm, "verify_equal_to", result)
}

fn check_equal_to(
    realm: &mut Realm,
    target: &JsValue,
    key: &PropertyKey,
    value: &JsValue,
) -> Result<(), HarnessError> {
    let handle = require_object(realm, target, "verifyEqualTo")?;
    let actual = realm
        .get(handle, key)
        .map_err(|abrupt| HarnessError::unexpected(describe_abrupt(realm, &abrupt)))?;
    if actual.same_value(value) {
        return Ok(());
    }
    let name = key_name(realm, key);
    Err(HarnessError::assertion(format!(
        "Expected obj[{name}] to equal {}, actually {}",
        safe_stringify(realm, value),
        safe_stringify(realm, &actual)
    )))
}

/// Without `verify_prop`, the descriptor must report `writable: true`; the
/// probe must then observe the write (at `verify_prop` when given).
pub fn verify_writable(
    realm: &mut Realm,
    target: &JsValue,
    key: &PropertyKey,
    verify_prop: Option<&PropertyKey>,
    value: Option<&JsValue>,
) -> Result<(), HarnessError> {
    let result = check_writable(realm, target, key, verify_prop, value, true);
    events::record(realm, "verify_writable", result)
}

pub fn verify_not_writable(
    realm: &mut Realm,
    target: &JsValue,
    key: &PropertyKey,
    verify_prop: Option<&PropertyKey>,
) -> Result<(), HarnessError> {
    let result = check_writable(realm, target, key, verify_prop, None, false);
    events::record(realm, "verify_not_writable", result)
}

fn check_writable(
    realm: &mut Realm,
    target: &JsValue,
    key: &PropertyKey,
    verify_prop: Option<&PropertyKey>,
    value: Option<&JsValue>,
    expect: bool,
) -> Result<(), HarnessError> {
    let helper = if expect { "verifyWritable" } else { "verifyNotWritable" };
    let handle = require_object(realm, target, helper)?;
    let name = key_name(realm, key);
    if verify_prop.is_none() {
        let desc = existing_descriptor(realm, handle, key)?;
        if desc.is_writable() != expect {
            return Err(HarnessError::assertion(format!(
                "Expected obj[{name}] to have writable:{expect}."
            )));
        }
    }
    if probe::is_writable(realm, handle, key, verify_prop, value)? != expect {
        return Err(HarnessError::assertion(behavior_message(&name, "writable", expect)));
    }
    Ok(())
}

pub fn verify_enumerable(realm: &mut Realm, target: &JsValue, key: &PropertyKey) -> Result<(), HarnessError> {
    let result = check_enumerable(realm, target, key, true);
    events::record(realm, "verify_enumerable", result)
}

pub fn verify_not_enumerable(realm: &mut Realm, target: &JsValue, key: &PropertyKey) -> Result<(), HarnessError> {
    let result = check_enumerable(realm, target, key, false);
    events::record(realm, "verify_not_enumerable", result)
}

fn check_enumerable(realm: &mut Realm, target: &JsValue, key: &PropertyKey, expect: bool) -> Result<(), HarnessError> {
    let helper = if expect { "verifyEnumerable" } else { "verifyNotEnumerable" };
    let handle = require_object(realm, target, helper)?;
    let name = key_name(realm, key);
    let desc = existing_descriptor(realm, handle, key)?;
    if desc.is_enumerable() != expect {
        return Err(HarnessError::assertion(format!(
            "Expected obj[{name}] to have enumerable:{expect}."
        )));
    }
    if probe::is_enumerable(realm, handle, key)? != expect {
        return Err(HarnessError::assertion(behavior_message(&name, "enumerable", expect)));
    }
    Ok(())
}

/// Note that a passing check leaves the property deleted.
pub fn verify_configurable(realm: &mut Realm, target: &JsValue, key: &PropertyKey) -> Result<(), HarnessError> {
    let result = check_configurable(realm, target, key, true);
    events::record(realm, "verify_configurable", result)
}

pub fn verify_not_configurable(realm: &mut Realm, target: &JsValue, key: &PropertyKey) -> Result<(), HarnessError> {
    let result = check_configurable(realm, target, key, false);
    events::record(realm, "verify_not_configurable", result)
}

fn check_configurable(realm: &mut Realm, target: &JsValue, key: &PropertyKey, expect: bool) -> Result<(), HarnessError> {
    let helper = if expect { "verifyConfigurable" } else { "verifyNotConfigurable" };
    let handle = require_object(realm, target, helper)?;
    let name = key_name(realm, key);
    let desc = existing_descriptor(realm, handle, key)?;
    if desc.is_configurable() != expect {
        return Err(HarnessError::assertion(format!(
            "Expected obj[{name}] to have configurable:{expect}."
        )));
    }
    if probe::is_configurable(realm, handle, key)? != expect {
        return Err(HarnessError::assertion(behavior_message(&name, "configurable", expect)));
    }
    Ok(())
}

fn behavior_message(name: &str, facet: &str, expect: bool) -> String {
    if expect {
        format!("Expected obj[{name}] to be {facet}, but was not.")
    } else {
        format!("Expected obj[{name}] NOT to be {facet}, but was.")
    }
}
