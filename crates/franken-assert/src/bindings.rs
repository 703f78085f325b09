//! Installs the helper family on a realm's global object as native
//! functions, with the positional calling convention of the conformance
//! harness. Failures are thrown into the realm as `Test262Error` objects.

use crate::assert;
use crate::descriptor::{DescriptorArg, VerifyOptions};
use crate::error::{Completion, HarnessError};
use crate::object_model::PropertyDescriptor;
use crate::property;
use crate::realm::Realm;
use crate::stringify::{describe_abrupt, safe_stringify};
use crate::value::{JsValue, ObjectHandle, PropertyKey};

type HarnessFn = fn(&mut Realm, &[JsValue]) -> Result<JsValue, HarnessError>;

const GLOBAL_HELPERS: [(&str, u32, HarnessFn); 8] = [
    ("verifyProperty", 4, verify_property_binding),
    ("verifyEqualTo", 3, verify_equal_to_binding),
    ("verifyWritable", 4, verify_writable_binding),
    ("verifyNotWritable", 4, verify_not_writable_binding),
    ("verifyEnumerable", 2, verify_enumerable_binding),
    ("verifyNotEnumerable", 2, verify_not_enumerable_binding),
    ("verifyConfigurable", 2, verify_configurable_binding),
    ("verifyNotConfigurable", 2, verify_not_configurable_binding),
];

const ASSERT_METHODS: [(&str, u32, HarnessFn); 5] = [
    ("sameValue", 3, same_value_binding),
    ("notSameValue", 3, not_same_value_binding),
    ("throws", 3, throws_binding),
    ("_isSameValue", 2, is_same_value_binding),
    ("_toString", 1, to_string_binding),
];

/// Define `assert` (with its methods) and the `verify*` helpers on the global
/// object. `Test262Error` is an intrinsic and already there. Returns the
/// `assert` function.
pub fn install_harness(realm: &mut Realm) -> Completion<ObjectHandle> {
    let global = realm.global();
    let assert_fn = harness_function(realm, "assert", 2, assert_binding);
    define_hidden(realm, global, "assert", assert_fn)?;
    for (name, arity, body) in ASSERT_METHODS {
        let method = harness_function(realm, name, arity, body);
        define_hidden(realm, assert_fn, name, method)?;
    }
    for (name, arity, body) in GLOBAL_HELPERS {
        let function = harness_function(realm, name, arity, body);
        define_hidden(realm, global, name, function)?;
    }
    Ok(assert_fn)
}

fn harness_function(realm: &mut Realm, name: &str, arity: u32, body: HarnessFn) -> ObjectHandle {
    realm.new_function(name, arity, move |realm, _, args| {
        body(realm, args).map_err(|err| err.into_abrupt(realm))
    })
}

fn define_hidden(realm: &mut Realm, target: ObjectHandle, name: &str, function: ObjectHandle) -> Completion<()> {
    realm.define_property_or_throw(
        target,
        name.into(),
        PropertyDescriptor::hidden(JsValue::Object(function)),
    )
}

// ---------------------------------------------------------------------------
// argument plumbing
// ---------------------------------------------------------------------------

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

/// Optional message argument: `undefined` means absent, anything else is
/// converted with `String(message)`.
fn message_arg(realm: &mut Realm, args: &[JsValue], index: usize) -> Option<String> {
    match arg(args, index) {
        JsValue::Undefined => None,
        other => Some(safe_stringify(realm, &other)),
    }
}

fn key_arg(realm: &mut Realm, args: &[JsValue], index: usize) -> Result<PropertyKey, HarnessError> {
    let value = arg(args, index);
    realm
        .to_property_key(&value)
        .map_err(|abrupt| HarnessError::unexpected(describe_abrupt(realm, &abrupt)))
}

/// Falsy alternate read-back keys count as absent.
fn optional_key_arg(realm: &mut Realm, args: &[JsValue], index: usize) -> Result<Option<PropertyKey>, HarnessError> {
    if !arg(args, index).truthy() {
        return Ok(None);
    }
    key_arg(realm, args, index).map(Some)
}

fn options_arg(realm: &mut Realm, args: &[JsValue]) -> Result<Option<VerifyOptions>, HarnessError> {
    let Some(handle) = arg(args, 3).as_object() else {
        return Ok(None);
    };
    let restore = realm
        .get(handle, &"restore".into())
        .map_err(|abrupt| HarnessError::unexpected(describe_abrupt(realm, &abrupt)))?;
    Ok(Some(VerifyOptions {
        restore: restore.truthy(),
    }))
}

// ---------------------------------------------------------------------------
// bodies
// ---------------------------------------------------------------------------

fn assert_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let message = message_arg(realm, args, 1);
    assert::assert_true(realm, &arg(args, 0), message.as_deref())?;
    Ok(JsValue::Undefined)
}

fn same_value_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let message = message_arg(realm, args, 2);
    assert::same_value(realm, &arg(args, 0), &arg(args, 1), message.as_deref())?;
    Ok(JsValue::Undefined)
}

fn not_same_value_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let message = message_arg(realm, args, 2);
    assert::not_same_value(realm, &arg(args, 0), &arg(args, 1), message.as_deref())?;
    Ok(JsValue::Undefined)
}

fn throws_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let message = message_arg(realm, args, 2);
    assert::throws(realm, &arg(args, 0), &arg(args, 1), message.as_deref())?;
    Ok(JsValue::Undefined)
}

fn is_same_value_binding(_: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    Ok(JsValue::Bool(assert::is_same_value(&arg(args, 0), &arg(args, 1))))
}

fn to_string_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    Ok(JsValue::Str(safe_stringify(realm, &arg(args, 0))))
}

fn verify_property_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let key = key_arg(realm, args, 1)?;
    let desc = if args.len() < 3 {
        DescriptorArg::Missing
    } else {
        DescriptorArg::from(arg(args, 2))
    };
    let options = options_arg(realm, args)?;
    property::verify_property(realm, &arg(args, 0), &key, desc, options)?;
    Ok(JsValue::Bool(true))
}

fn verify_equal_to_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let key = key_arg(realm, args, 1)?;
    property::verify_equal_to(realm, &arg(args, 0), &key, &arg(args, 2))?;
    Ok(JsValue::Undefined)
}

fn verify_writable_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let key = key_arg(realm, args, 1)?;
    let verify_prop = optional_key_arg(realm, args, 2)?;
    let value = args.get(3).filter(|v| !v.is_undefined());
    property::verify_writable(realm, &arg(args, 0), &key, verify_prop.as_ref(), value)?;
    Ok(JsValue::Undefined)
}

fn verify_not_writable_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let key = key_arg(realm, args, 1)?;
    let verify_prop = optional_key_arg(realm, args, 2)?;
    property::verify_not_writable(realm, &arg(args, 0), &key, verify_prop.as_ref())?;
    Ok(JsValue::Undefined)
}

fn verify_enumerable_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let key = key_arg(realm, args, 1)?;
    property::verify_enumerable(realm, &arg(args, 0), &key)?;
    Ok(JsValue::Undefined)
}

fn verify_not_enumerable_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let key = key_arg(realm, args, 1)?;
    property::verify_not_enumerable(realm, &arg(args, 0), &key)?;
    Ok(JsValue::Undefined)
}

fn verify_configurable_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let key = key_arg(realm, args, 1)?;
    property::verify_configurable(realm, &arg(args, 0), &key)?;
    Ok(JsValue::Undefined)
}

fn verify_not_configurable_binding(realm: &mut Realm, args: &[JsValue]) -> Result<JsValue, HarnessError> {
    let key = key_arg(realm, args, 1)?;
    property::verify_not_configurable(realm, &arg(args, 0), &key)?;
    Ok(JsValue::Undefined)
}
