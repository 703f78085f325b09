//! Heap objects and property descriptors.
//!
//! - **Property descriptors**: data vs accessor, configurable/enumerable/writable
//! - **Own-property storage**: `BTreeMap` keyed by `PropertyKey` for
//!   deterministic ordering
//! - **`[[DefineOwnProperty]]`** validation against non-configurable properties
//!
//! Operations that need the whole heap (prototype walks, accessor calls,
//! array `length`) live in [`crate::realm`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::{JsValue, ObjectHandle, PropertyKey};

// ---------------------------------------------------------------------------
// PropertyDescriptor
// ---------------------------------------------------------------------------

/// Complete ES2020 property descriptor (§6.2.5) as stored on an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyDescriptor {
    /// Data descriptor: has `value` and `writable`.
    Data {
        value: JsValue,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    /// Accessor descriptor: has `get` and/or `set` function objects.
    Accessor {
        get: Option<ObjectHandle>,
        set: Option<ObjectHandle>,
        enumerable: bool,
        configurable: bool,
    },
}

impl PropertyDescriptor {
    /// Writable, enumerable, configurable data property (plain assignment).
    pub fn data(value: JsValue) -> Self {
        Self::Data {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Writable, configurable, non-enumerable data property (built-in methods).
    pub fn hidden(value: JsValue) -> Self {
        Self::Data {
            value,
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable data property.
    pub fn data_frozen(value: JsValue) -> Self {
        Self::Data {
            value,
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    pub fn with_flags(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self::Data {
            value,
            writable,
            enumerable,
            configurable,
        }
    }

    pub fn accessor(
        get: Option<ObjectHandle>,
        set: Option<ObjectHandle>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self::Accessor {
            get,
            set,
            enumerable,
            configurable,
        }
    }

    pub fn is_configurable(&self) -> bool {
        match self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn is_enumerable(&self) -> bool {
        match self {
            Self::Data { enumerable, .. } | Self::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    /// `value` facet; accessors have none.
    pub fn value(&self) -> Option<&JsValue> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }

    /// `writable` facet; accessors have none, so this is `None` rather than
    /// `false` for them.
    pub fn writable(&self) -> Option<bool> {
        match self {
            Self::Data { writable, .. } => Some(*writable),
            Self::Accessor { .. } => None,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.writable().unwrap_or(false)
    }

    pub fn set_non_configurable(&mut self) {
        match self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => {
                *configurable = false;
            }
        }
    }

    /// No-op for accessors.
    pub fn set_non_writable(&mut self) {
        if let Self::Data { writable, .. } = self {
            *writable = false;
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectKind
// ---------------------------------------------------------------------------

/// Index into the realm's native function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NativeFunctionId(pub u32);

/// What kind of object this is; drives `Array.isArray`, callability and the
/// `Object.prototype.toString` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Ordinary,
    Array,
    Error,
    Function(NativeFunctionId),
}

impl ObjectKind {
    pub fn builtin_tag(self) -> &'static str {
        match self {
            Self::Ordinary => "Object",
            Self::Array => "Array",
            Self::Error => "Error",
            Self::Function(_) => "Function",
        }
    }
}

// ---------------------------------------------------------------------------
// HeapObject
// ---------------------------------------------------------------------------

/// An object with its internal slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapObject {
    pub kind: ObjectKind,
    /// `[[Prototype]]` (None is the end of the chain).
    pub prototype: Option<ObjectHandle>,
    /// `[[Extensible]]`.
    pub extensible: bool,
    /// Own properties. Serialized as `[key, descriptor]` pairs since the key
    /// is not a string.
    #[serde(with = "properties_as_seq")]
    pub properties: BTreeMap<PropertyKey, PropertyDescriptor>,
    /// Host `[[Set]]` override: a function object called as
    /// `hook(key, value)` with `this` bound to the object instead of the
    /// ordinary algorithm. Its truthiness is the `[[Set]]` result.
    pub set_hook: Option<ObjectHandle>,
}

impl HeapObject {
    pub fn new(kind: ObjectKind, prototype: Option<ObjectHandle>) -> Self {
        Self {
            kind,
            prototype,
            extensible: true,
            properties: BTreeMap::new(),
            set_hook: None,
        }
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.properties.contains_key(key)
    }

    /// ValidateAndApplyPropertyDescriptor (§9.1.6.3) for complete descriptors.
    ///
    /// `false` means the change is rejected; the object is left untouched.
    pub fn define_own_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        let Some(current) = self.properties.get(&key) else {
            if !self.extensible {
                return false;
            }
            self.properties.insert(key, desc);
            return true;
        };

        if !current.is_configurable() {
            if desc.is_configurable() || desc.is_enumerable() != current.is_enumerable() {
                return false;
            }
            if current.is_data() != desc.is_data() {
                return false;
            }
            match (current, &desc) {
                (
                    PropertyDescriptor::Data {
                        writable: false,
                        value: current_value,
                        ..
                    },
                    PropertyDescriptor::Data {
                        writable: new_writable,
                        value: new_value,
                        ..
                    },
                ) => {
                    if *new_writable || !current_value.same_value(new_value) {
                        return false;
                    }
                }
                (
                    PropertyDescriptor::Accessor {
                        get: cur_get,
                        set: cur_set,
                        ..
                    },
                    PropertyDescriptor::Accessor {
                        get: new_get,
                        set: new_set,
                        ..
                    },
                ) => {
                    if cur_get != new_get || cur_set != new_set {
                        return false;
                    }
                }
                _ => {}
            }
        }

        self.properties.insert(key, desc);
        true
    }

    /// `[[Delete]]`: `false` if the property is non-configurable.
    pub fn delete(&mut self, key: &PropertyKey) -> bool {
        match self.properties.get(key) {
            Some(desc) if !desc.is_configurable() => false,
            Some(_) => {
                self.properties.remove(key);
                true
            }
            None => true,
        }
    }

    /// `[[OwnPropertyKeys]]`: integer indices ascending, then strings, then
    /// symbols. String order within a group follows `BTreeMap` order.
    pub fn own_property_keys(&self) -> Vec<PropertyKey> {
        let mut int_keys: Vec<(u32, PropertyKey)> = Vec::new();
        let mut str_keys: Vec<PropertyKey> = Vec::new();
        let mut sym_keys: Vec<PropertyKey> = Vec::new();

        for key in self.properties.keys() {
            match key {
                PropertyKey::String(_) => match key.array_index() {
                    Some(n) => int_keys.push((n, key.clone())),
                    None => str_keys.push(key.clone()),
                },
                PropertyKey::Symbol(_) => sym_keys.push(key.clone()),
            }
        }

        int_keys.sort_by_key(|(n, _)| *n);
        let mut result: Vec<PropertyKey> = int_keys.into_iter().map(|(_, k)| k).collect();
        result.extend(str_keys);
        result.extend(sym_keys);
        result
    }

    pub fn freeze(&mut self) {
        self.extensible = false;
        for desc in self.properties.values_mut() {
            desc.set_non_configurable();
            desc.set_non_writable();
        }
    }
}

mod properties_as_seq {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::PropertyDescriptor;
    use crate::value::PropertyKey;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<PropertyKey, PropertyDescriptor>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&PropertyKey, &PropertyDescriptor)> = map.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<PropertyKey, PropertyDescriptor>, D::Error> {
        let pairs: Vec<(PropertyKey, PropertyDescriptor)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
