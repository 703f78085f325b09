//! Behavioral probes.
//!
//! A descriptor snapshot can disagree with what the object actually does
//! (host objects, set hooks). Each probe exercises the property instead:
//! delete it, enumerate it, write to it. A TypeError from the attempt is the
//! expected "not permitted" answer; anything else thrown is a defect and
//! comes back as [`HarnessError::Unexpected`].

use crate::error::{Abrupt, HarnessError};
use crate::realm::Realm;
use crate::stringify::{describe_abrupt, safe_stringify};
use crate::value::{JsValue, ObjectHandle, PropertyKey};

fn expected_type_error(realm: &mut Realm, abrupt: &Abrupt) -> HarnessError {
    HarnessError::unexpected(format!("Expected TypeError, got {}", describe_abrupt(realm, abrupt)))
}

fn read_failed(realm: &mut Realm, key: &PropertyKey, abrupt: &Abrupt) -> HarnessError {
    let name = safe_stringify(realm, &key.to_value());
    HarnessError::unexpected(format!(
        "reading obj[{name}] raised {}",
        describe_abrupt(realm, abrupt)
    ))
}

/// Swallow a TypeError; pass any other throw through as unexpected.
fn tolerate_type_error<T>(realm: &mut Realm, result: Result<T, Abrupt>) -> Result<(), HarnessError> {
    match result {
        Ok(_) => Ok(()),
        Err(abrupt) if realm.is_type_error(&abrupt) => Ok(()),
        Err(abrupt) => Err(expected_type_error(realm, &abrupt)),
    }
}

/// Delete the property; configurable iff it is gone afterwards.
///
/// Destructive: a configurable property stays deleted. Callers that need it
/// back use `VerifyOptions::restore`.
pub fn is_configurable(realm: &mut Realm, target: ObjectHandle, key: &PropertyKey) -> Result<bool, HarnessError> {
    let attempt = realm.delete_property(target, key);
    tolerate_type_error(realm, attempt)?;
    let still_own = realm
        .has_own_property(target, key)
        .map_err(|abrupt| read_failed(realm, key, &abrupt))?;
    Ok(!still_own)
}

/// Own, `propertyIsEnumerable`, and (string keys only) reached by the
/// for-in walk. Symbol keys never appear in for-in, so that half is skipped
/// for them.
pub fn is_enumerable(realm: &mut Realm, target: ObjectHandle, key: &PropertyKey) -> Result<bool, HarnessError> {
    let walk_check = match key {
        PropertyKey::String(name) => realm
            .for_in_keys(target)
            .map_err(|abrupt| read_failed(realm, key, &abrupt))?
            .iter()
            .any(|k| k == name),
        PropertyKey::Symbol(_) => true,
    };
    if !walk_check {
        return Ok(false);
    }
    let own = realm
        .has_own_property(target, key)
        .map_err(|abrupt| read_failed(realm, key, &abrupt))?;
    let enumerable = realm
        .property_is_enumerable(target, key)
        .map_err(|abrupt| read_failed(realm, key, &abrupt))?;
    Ok(own && enumerable)
}

/// Write a distinguishing value and read it back.
///
/// The value written is `value` when truthy, otherwise the configured array
/// length probe for an array's `length`, otherwise the configured sentinel.
/// The read-back uses `verify_prop` when given (for properties whose write is
/// observed elsewhere). Only a write that took effect is undone: the old
/// value is put back, or the property deleted if it was not own before.
pub fn is_writable(
    realm: &mut Realm,
    target: ObjectHandle,
    key: &PropertyKey,
    verify_prop: Option<&PropertyKey>,
    value: Option<&JsValue>,
) -> Result<bool, HarnessError> {
    let target_value = JsValue::Object(target);
    let fallback = if realm.is_array(&target_value) && key.as_str() == Some("length") {
        JsValue::Number(realm.config().array_length_probe)
    } else {
        JsValue::Str(realm.config().writability_sentinel.clone())
    };
    let new_value = value.filter(|v| v.truthy()).cloned().unwrap_or(fallback);

    let had_value = realm
        .has_own_property(target, key)
        .map_err(|abrupt| read_failed(realm, key, &abrupt))?;
    let old_value = realm
        .get(target, key)
        .map_err(|abrupt| read_failed(realm, key, &abrupt))?;

    let attempt = realm.put(target, key, new_value.clone());
    tolerate_type_error(realm, attempt)?;

    let read_key = verify_prop.unwrap_or(key);
    let observed = realm
        .get(target, read_key)
        .map_err(|abrupt| read_failed(realm, read_key, &abrupt))?;
    let write_succeeded = observed.same_value(&new_value);

    if write_succeeded {
        let undo = if had_value {
            realm.put(target, key, old_value)
        } else {
            realm.delete_property(target, key).map(|_| ())
        };
        if let Err(abrupt) = undo {
            let name = safe_stringify(realm, &key.to_value());
            return Err(HarnessError::unexpected(format!(
                "undoing write to obj[{name}] raised {}",
                describe_abrupt(realm, &abrupt)
            )));
        }
    }
    Ok(write_succeeded)
}
