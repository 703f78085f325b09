use crate::error::Abrupt;
use crate::realm::Realm;
use crate::value::JsValue;

/// Render `value` for a diagnostic message. Never fails.
///
/// Negative zero renders as `-0` (plain `String(-0)` gives `0`). Objects
/// whose `toString`/`valueOf` throw, or yield no primitive, fall back to
/// their `Object.prototype.toString` tag so the message being built still
/// describes the original failure.
pub fn safe_stringify(realm: &mut Realm, value: &JsValue) -> String {
    if value.is_negative_zero() {
        return "-0".to_string();
    }
    match realm.to_display_string(value) {
        Ok(text) => text,
        Err(_) => realm.builtin_tag(value),
    }
}

/// Render a pending throw: the thrown value's string form, or the message of
/// a built-in error that has not been materialized.
pub fn describe_abrupt(realm: &mut Realm, abrupt: &Abrupt) -> String {
    match abrupt {
        Abrupt::Throw(value) => safe_stringify(realm, value),
        Abrupt::TypeError(message) => format!("TypeError: {message}"),
        Abrupt::RangeError(message) => format!("RangeError: {message}"),
    }
}
