//! `assert`, `assert.sameValue`, `assert.notSameValue` and `assert.throws`.
//!
//! Every check appends a [`crate::events::HarnessEvent`] to the realm
//! journal (when enabled) and returns `Err(HarnessError::Assertion)` on
//! failure. Messages are built with [`safe_stringify`], so a value whose
//! `toString` throws cannot mask the failure being reported.

use crate::error::{Completion, HarnessError};
use crate::events;
use crate::realm::Realm;
use crate::stringify::{describe_abrupt, safe_stringify};
use crate::value::JsValue;

const THROWS_USAGE: &str =
    "assert.throws requires two arguments: the error constructor and a function to run";

/// SameValue: `+0` and `-0` differ, `NaN` equals itself.
pub fn is_same_value(a: &JsValue, b: &JsValue) -> bool {
    a.same_value(b)
}

fn prefix(message: Option<&str>) -> String {
    match message {
        Some(m) => format!("{m} "),
        None => String::new(),
    }
}

/// Passes only for the boolean `true`; truthy values are failures.
pub fn assert_true(realm: &mut Realm, condition: &JsValue, message: Option<&str>) -> Result<(), HarnessError> {
    let result = if *condition == JsValue::Bool(true) {
        Ok(())
    } else {
        let message = match message {
            Some(m) => m.to_string(),
            None => format!("Expected true but got {}", safe_stringify(realm, condition)),
        };
        Err(HarnessError::assertion(message))
    };
    events::record(realm, "assert", result)
}

pub fn same_value(
    realm: &mut Realm,
    actual: &JsValue,
    expected: &JsValue,
    message: Option<&str>,
) -> Result<(), HarnessError> {
    let result = if is_same_value(actual, expected) {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "{}Expected SameValue(«{}», «{}») to be true",
            prefix(message),
            safe_stringify(realm, actual),
            safe_stringify(realm, expected)
        )))
    };
    events::record(realm, "same_value", result)
}

pub fn not_same_value(
    realm: &mut Realm,
    actual: &JsValue,
    unexpected: &JsValue,
    message: Option<&str>,
) -> Result<(), HarnessError> {
    let result = if !is_same_value(actual, unexpected) {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "{}Expected SameValue(«{}», «{}») to be false",
            prefix(message),
            safe_stringify(realm, actual),
            safe_stringify(realm, unexpected)
        )))
    };
    events::record(realm, "not_same_value", result)
}

/// Call `operation` with no arguments and require it to throw an object whose
/// `constructor` is `expected` itself. Subclass instances do not match.
pub fn throws(
    realm: &mut Realm,
    expected: &JsValue,
    operation: &JsValue,
    message: Option<&str>,
) -> Result<(), HarnessError> {
    let result = check_throws(realm, expected, operation, message);
    events::record(realm, "throws", result)
}

/// [`throws`] for a Rust closure. The closure runs as a native function, so
/// an assertion failing inside it has to be re-raised with
/// [`HarnessError::into_abrupt`].
pub fn throws_with<F>(
    realm: &mut Realm,
    expected: &JsValue,
    operation: F,
    message: Option<&str>,
) -> Result<(), HarnessError>
where
    F: Fn(&mut Realm) -> Completion<()> + 'static,
{
    let function = realm.new_function("operation", 0, move |realm, _, _| {
        operation(realm)?;
        Ok(JsValue::Undefined)
    });
    throws(realm, expected, &JsValue::Object(function), message)
}

fn check_throws(
    realm: &mut Realm,
    expected: &JsValue,
    operation: &JsValue,
    message: Option<&str>,
) -> Result<(), HarnessError> {
    if !realm.is_callable(operation) {
        return Err(HarnessError::usage(THROWS_USAGE));
    }
    let mut text = prefix(message);

    let abrupt = match realm.call(operation, &JsValue::Undefined, &[]) {
        Ok(_) => {
            text.push_str(&format!(
                "Expected a {} to be thrown but no exception was thrown at all",
                constructor_name(realm, expected)
            ));
            return Err(HarnessError::assertion(text));
        }
        Err(abrupt) => abrupt,
    };

    let thrown = realm.materialize(abrupt);
    let Some(handle) = thrown.as_object() else {
        text.push_str("Thrown value was not an object!");
        return Err(HarnessError::assertion(text));
    };
    let actual = realm.get(handle, &"constructor".into()).map_err(|abrupt| {
        HarnessError::unexpected(format!(
            "reading constructor of thrown value raised {}",
            describe_abrupt(realm, &abrupt)
        ))
    })?;
    if !actual.same_value(expected) {
        text.push_str(&format!(
            "Expected a {} but got a {}",
            constructor_name(realm, expected),
            constructor_name(realm, &actual)
        ));
        return Err(HarnessError::assertion(text));
    }
    Ok(())
}

/// `ctor.name`, rendered safely.
fn constructor_name(realm: &mut Realm, ctor: &JsValue) -> String {
    let Some(handle) = ctor.as_object() else {
        return safe_stringify(realm, ctor);
    };
    match realm.get(handle, &"name".into()) {
        Ok(name) => safe_stringify(realm, &name),
        Err(_) => safe_stringify(realm, ctor),
    }
}
