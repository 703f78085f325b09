//! Inputs and outputs of `verify_property`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::realm::Realm;
use crate::stringify::{describe_abrupt, safe_stringify};
use crate::value::{JsValue, ObjectHandle, PropertyKey};

/// Expected descriptor: only the facets that are `Some` are checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
    /// Flags given as non-booleans, with their truthiness. They never equal
    /// a reported flag, so each one is a mismatch.
    #[serde(skip)]
    pub(crate) non_boolean: Vec<(Facet, bool)>,
}

impl ExpectedDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// All four facets of a data property.
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            non_boolean: Vec::new(),
        }
    }

    pub fn value(mut self, value: impl Into<JsValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = Some(writable);
        self
    }

    pub fn enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = Some(enumerable);
        self
    }

    pub fn configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.writable.is_none()
            && self.enumerable.is_none()
            && self.configurable.is_none()
            && self.non_boolean.is_empty()
    }

    pub(crate) fn non_boolean_facet(&self, facet: Facet) -> Option<bool> {
        self.non_boolean
            .iter()
            .find(|(f, _)| *f == facet)
            .map(|(_, truthy)| *truthy)
    }

    /// Read the facets off a descriptor object. Only own properties count.
    /// A flag holding a non-boolean is kept as a guaranteed mismatch.
    pub fn from_object(realm: &mut Realm, desc: &JsValue) -> Result<Self, HarnessError> {
        let handle = match desc {
            JsValue::Null => {
                return Err(HarnessError::usage(
                    "The desc argument should be an object or undefined, null",
                ));
            }
            JsValue::Object(h) if !realm.is_callable(desc) => *h,
            other => {
                return Err(HarnessError::usage(format!(
                    "The desc argument should be an object or undefined, {}",
                    safe_stringify(realm, other)
                )));
            }
        };

        let mut expected = Self::new();
        expected.value = read_facet(realm, handle, Facet::Value)?;
        for facet in [Facet::Writable, Facet::Enumerable, Facet::Configurable] {
            let flag = match read_facet(realm, handle, facet)? {
                None => None,
                Some(JsValue::Bool(b)) => Some(b),
                Some(other) => {
                    expected.non_boolean.push((facet, other.truthy()));
                    None
                }
            };
            match facet {
                Facet::Writable => expected.writable = flag,
                Facet::Enumerable => expected.enumerable = flag,
                Facet::Configurable => expected.configurable = flag,
                Facet::Value => {}
            }
        }
        Ok(expected)
    }
}

fn read_facet(
    realm: &mut Realm,
    handle: ObjectHandle,
    facet: Facet,
) -> Result<Option<JsValue>, HarnessError> {
    let key = PropertyKey::from(facet.name());
    let present = realm
        .has_own_property(handle, &key)
        .map_err(|abrupt| HarnessError::unexpected(describe_abrupt(realm, &abrupt)))?;
    if !present {
        return Ok(None);
    }
    realm.get(handle, &key).map(Some).map_err(|abrupt| {
        HarnessError::unexpected(format!(
            "reading descriptor facet {facet} raised {}",
            describe_abrupt(realm, &abrupt)
        ))
    })
}

/// Third argument of `verify_property`.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorArg {
    /// Omitted entirely; a usage error, unlike an explicit `undefined`.
    Missing,
    /// Explicit `undefined`: the property must not exist.
    Undefined,
    /// A realm value, read with [`ExpectedDescriptor::from_object`].
    Value(JsValue),
    Record(ExpectedDescriptor),
}

impl From<ExpectedDescriptor> for DescriptorArg {
    fn from(desc: ExpectedDescriptor) -> Self {
        Self::Record(desc)
    }
}

impl From<JsValue> for DescriptorArg {
    fn from(value: JsValue) -> Self {
        match value {
            JsValue::Undefined => Self::Undefined,
            other => Self::Value(other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOptions {
    /// Reapply the original descriptor once the checks have run.
    pub restore: bool,
}

impl VerifyOptions {
    pub fn restore() -> Self {
        Self { restore: true }
    }
}

/// Descriptor facets, in the order `verify_property` checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Facet {
    Value,
    Enumerable,
    Writable,
    Configurable,
}

impl Facet {
    pub fn name(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Enumerable => "enumerable",
            Self::Writable => "writable",
            Self::Configurable => "configurable",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a successful `verify_property`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub name: String,
    /// The property was expected to be, and is, absent.
    pub absent: bool,
    pub checked: Vec<Facet>,
    pub restored: bool,
}
