//! Object heap, intrinsics and the abstract operations the assertion helpers
//! drive: `[[Get]]`, `[[Set]]`, `[[Delete]]`, `[[DefineOwnProperty]]`,
//! for-in enumeration, `String(value)` and `Object.prototype.toString`.
//!
//! There is no evaluator. Function objects wrap native Rust closures, which
//! is how tests give a value behavior (getters that throw, `toString` that
//! throws, operations handed to `throws`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::error::{Abrupt, Completion, HarnessError};
use crate::events::HarnessEvent;
use crate::object_model::{HeapObject, NativeFunctionId, ObjectKind, PropertyDescriptor};
use crate::value::{JsValue, ObjectHandle, PropertyKey, SymbolId, number_to_string};

/// Maximum prototype chain depth to prevent runaway walks.
const MAX_PROTOTYPE_CHAIN_DEPTH: u32 = 1024;
/// Maximum nesting of native calls (getters calling getters, ...).
const MAX_CALL_DEPTH: u32 = 256;
const MAX_ARRAY_LENGTH: f64 = 4_294_967_295.0;

/// Native function body: `(realm, this, arguments)`.
pub type NativeFn = Rc<dyn Fn(&mut Realm, &JsValue, &[JsValue]) -> Completion>;

struct NativeFunction {
    name: String,
    behavior: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Intrinsic error constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
    EvalError,
    URIError,
    /// The conformance suite's own error type.
    Test262Error,
}

impl ErrorKind {
    pub const ALL: [Self; 8] = [
        Self::Error,
        Self::TypeError,
        Self::RangeError,
        Self::ReferenceError,
        Self::SyntaxError,
        Self::EvalError,
        Self::URIError,
        Self::Test262Error,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::RangeError => "RangeError",
            Self::ReferenceError => "ReferenceError",
            Self::SyntaxError => "SyntaxError",
            Self::EvalError => "EvalError",
            Self::URIError => "URIError",
            Self::Test262Error => "Test262Error",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ErrorIntrinsic {
    constructor: ObjectHandle,
    prototype: ObjectHandle,
}

#[derive(Debug, Clone)]
struct Intrinsics {
    object_prototype: ObjectHandle,
    function_prototype: ObjectHandle,
    array_prototype: ObjectHandle,
    global: ObjectHandle,
    errors: BTreeMap<ErrorKind, ErrorIntrinsic>,
}

// ---------------------------------------------------------------------------
// Realm
// ---------------------------------------------------------------------------

/// Heap of objects plus intrinsics and the harness journal.
#[derive(Debug)]
pub struct Realm {
    objects: Vec<HeapObject>,
    functions: Vec<NativeFunction>,
    symbol_descriptions: Vec<Option<String>>,
    intrinsics: Intrinsics,
    config: HarnessConfig,
    env_fingerprint: String,
    events: Vec<HarnessEvent>,
    call_depth: u32,
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl Realm {
    /// Realm with the default (strict) configuration.
    pub fn new() -> Self {
        Self::bootstrap(HarnessConfig::default())
    }

    pub fn with_config(config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        Ok(Self::bootstrap(config))
    }

    fn bootstrap(config: HarnessConfig) -> Self {
        let placeholder = ObjectHandle(0);
        let env_fingerprint = config.fingerprint();
        let mut realm = Self {
            objects: Vec::new(),
            functions: Vec::new(),
            symbol_descriptions: Vec::new(),
            intrinsics: Intrinsics {
                object_prototype: placeholder,
                function_prototype: placeholder,
                array_prototype: placeholder,
                global: placeholder,
                errors: BTreeMap::new(),
            },
            config,
            env_fingerprint,
            events: Vec::new(),
            call_depth: 0,
        };

        let object_prototype = realm.alloc(ObjectKind::Ordinary, None);
        let function_prototype = realm.alloc(ObjectKind::Ordinary, Some(object_prototype));
        let array_prototype = realm.alloc(ObjectKind::Array, Some(object_prototype));
        let global = realm.alloc(ObjectKind::Ordinary, Some(object_prototype));
        realm.intrinsics.object_prototype = object_prototype;
        realm.intrinsics.function_prototype = function_prototype;
        realm.intrinsics.array_prototype = array_prototype;
        realm.intrinsics.global = global;
        realm.force_define(
            array_prototype,
            "length".into(),
            PropertyDescriptor::with_flags(JsValue::from(0), true, false, false),
        );

        realm.install_object_prototype();
        realm.install_function_prototype();
        realm.install_array_prototype();
        realm.install_errors();
        realm
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn env_fingerprint(&self) -> &str {
        &self.env_fingerprint
    }

    pub fn global(&self) -> ObjectHandle {
        self.intrinsics.global
    }

    pub fn object_prototype(&self) -> ObjectHandle {
        self.intrinsics.object_prototype
    }

    pub fn function_prototype(&self) -> ObjectHandle {
        self.intrinsics.function_prototype
    }

    pub fn array_prototype(&self) -> ObjectHandle {
        self.intrinsics.array_prototype
    }

    /// The intrinsic constructor for `kind`, as a value.
    pub fn error_constructor(&self, kind: ErrorKind) -> JsValue {
        JsValue::Object(self.error_intrinsic(kind).constructor)
    }

    pub fn error_prototype(&self, kind: ErrorKind) -> ObjectHandle {
        self.error_intrinsic(kind).prototype
    }

    fn error_intrinsic(&self, kind: ErrorKind) -> ErrorIntrinsic {
        // Every kind is installed during bootstrap.
        self.intrinsics.errors[&kind]
    }

    pub fn events(&self) -> &[HarnessEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<HarnessEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: HarnessEvent) {
        self.events.push(event);
        if self.events.len() > self.config.max_events {
            self.events.remove(0);
        }
    }

    // -- allocation ---------------------------------------------------------

    /// Allocate an object of `kind` with the given prototype.
    pub fn alloc(&mut self, kind: ObjectKind, prototype: Option<ObjectHandle>) -> ObjectHandle {
        let handle = ObjectHandle(self.objects.len() as u32);
        self.objects.push(HeapObject::new(kind, prototype));
        handle
    }

    /// `{}`: ordinary object inheriting from `Object.prototype`.
    pub fn new_object(&mut self) -> ObjectHandle {
        let proto = self.intrinsics.object_prototype;
        self.alloc(ObjectKind::Ordinary, Some(proto))
    }

    /// Object literal with default (writable, enumerable, configurable) data
    /// properties.
    pub fn new_object_from(&mut self, entries: &[(&str, JsValue)]) -> ObjectHandle {
        let handle = self.new_object();
        for (key, value) in entries {
            self.force_define(handle, (*key).into(), PropertyDescriptor::data(value.clone()));
        }
        handle
    }

    /// Array literal.
    pub fn new_array(&mut self, elements: Vec<JsValue>) -> ObjectHandle {
        let proto = self.intrinsics.array_prototype;
        let handle = self.alloc(ObjectKind::Array, Some(proto));
        let len = elements.len();
        for (index, element) in elements.into_iter().enumerate() {
            self.force_define(
                handle,
                PropertyKey::String(index.to_string()),
                PropertyDescriptor::data(element),
            );
        }
        self.force_define(
            handle,
            "length".into(),
            PropertyDescriptor::with_flags(JsValue::Number(len as f64), true, false, false),
        );
        handle
    }

    pub fn new_symbol(&mut self, description: Option<&str>) -> SymbolId {
        let id = SymbolId(self.symbol_descriptions.len() as u32);
        self.symbol_descriptions.push(description.map(str::to_string));
        id
    }

    pub fn symbol_description(&self, id: SymbolId) -> Option<&str> {
        self.symbol_descriptions
            .get(id.0 as usize)
            .and_then(|d| d.as_deref())
    }

    /// Function object backed by a native closure.
    pub fn new_function<F>(&mut self, name: &str, arity: u32, behavior: F) -> ObjectHandle
    where
        F: Fn(&mut Realm, &JsValue, &[JsValue]) -> Completion + 'static,
    {
        let id = NativeFunctionId(self.functions.len() as u32);
        self.functions.push(NativeFunction {
            name: name.to_string(),
            behavior: Rc::new(behavior),
        });
        let proto = self.intrinsics.function_prototype;
        let handle = self.alloc(ObjectKind::Function(id), Some(proto));
        self.force_define(
            handle,
            "name".into(),
            PropertyDescriptor::with_flags(JsValue::str(name), false, false, true),
        );
        self.force_define(
            handle,
            "length".into(),
            PropertyDescriptor::with_flags(JsValue::from(arity), false, false, true),
        );
        handle
    }

    /// Error object of an intrinsic kind, as `new Kind(message)` would build it.
    pub fn new_error(&mut self, kind: ErrorKind, message: &str) -> ObjectHandle {
        let proto = self.error_prototype(kind);
        let handle = self.alloc(ObjectKind::Error, Some(proto));
        if !message.is_empty() {
            self.force_define(handle, "message".into(), PropertyDescriptor::hidden(JsValue::str(message)));
        }
        handle
    }

    /// `class Name extends Parent {}` for error constructors. The new
    /// constructor is a distinct kind: `throws` with `Parent` does not accept
    /// its instances.
    pub fn define_error_subclass(&mut self, name: &str, parent: &JsValue) -> Completion<ObjectHandle> {
        let Some(parent_ctor) = parent.as_object().filter(|_| self.is_callable(parent)) else {
            return Err(Abrupt::type_error(format!(
                "Class extends value {parent} is not a constructor"
            )));
        };
        let parent_proto = match self.get(parent_ctor, &"prototype".into())? {
            JsValue::Object(h) => h,
            other => {
                return Err(Abrupt::type_error(format!(
                    "Class extends value does not have valid prototype property {other}"
                )));
            }
        };
        let prototype = self.alloc(ObjectKind::Ordinary, Some(parent_proto));
        let constructor = self.install_error_constructor(name, prototype);
        self.object_mut(constructor)?.prototype = Some(parent_ctor);
        Ok(constructor)
    }

    /// Write a property descriptor onto an object without validation.
    /// Used to build intrinsics and literals.
    fn force_define(&mut self, handle: ObjectHandle, key: PropertyKey, desc: PropertyDescriptor) {
        if let Some(obj) = self.objects.get_mut(handle.0 as usize) {
            obj.properties.insert(key, desc);
        }
    }

    // -- object access ------------------------------------------------------

    pub fn object(&self, handle: ObjectHandle) -> Completion<&HeapObject> {
        self.objects
            .get(handle.0 as usize)
            .ok_or_else(|| Abrupt::type_error(format!("object#{} not found", handle.0)))
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> Completion<&mut HeapObject> {
        self.objects
            .get_mut(handle.0 as usize)
            .ok_or_else(|| Abrupt::type_error(format!("object#{} not found", handle.0)))
    }

    pub fn is_callable(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(h) => self
                .objects
                .get(h.0 as usize)
                .is_some_and(|o| matches!(o.kind, ObjectKind::Function(_))),
            _ => false,
        }
    }

    /// `Array.isArray`.
    pub fn is_array(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(h) => self
                .objects
                .get(h.0 as usize)
                .is_some_and(|o| o.kind == ObjectKind::Array),
            _ => false,
        }
    }

    pub fn set_host_set_hook(&mut self, handle: ObjectHandle, hook: ObjectHandle) -> Completion<()> {
        if !self.is_callable(&JsValue::Object(hook)) {
            return Err(Abrupt::type_error("set hook must be callable"));
        }
        self.object_mut(handle)?.set_hook = Some(hook);
        Ok(())
    }

    pub fn prevent_extensions(&mut self, handle: ObjectHandle) -> Completion<()> {
        self.object_mut(handle)?.extensible = false;
        Ok(())
    }

    pub fn freeze(&mut self, handle: ObjectHandle) -> Completion<()> {
        self.object_mut(handle)?.freeze();
        Ok(())
    }

    /// `Object.setPrototypeOf`. Returns `false` on a non-extensible object.
    pub fn set_prototype_of(
        &mut self,
        handle: ObjectHandle,
        proto: Option<ObjectHandle>,
    ) -> Completion<bool> {
        let mut current = proto;
        let mut visited = BTreeSet::new();
        visited.insert(handle);
        while let Some(h) = current {
            if !visited.insert(h) {
                return Err(Abrupt::type_error("Cyclic __proto__ value"));
            }
            current = self.object(h)?.prototype;
        }
        let obj = self.object_mut(handle)?;
        if !obj.extensible {
            return Ok(obj.prototype == proto);
        }
        obj.prototype = proto;
        Ok(true)
    }

    // -- own-property queries -----------------------------------------------

    /// `Object.getOwnPropertyDescriptor`.
    pub fn get_own_property_descriptor(
        &self,
        handle: ObjectHandle,
        key: &PropertyKey,
    ) -> Completion<Option<PropertyDescriptor>> {
        Ok(self.object(handle)?.get_own_property(key).cloned())
    }

    /// `Object.prototype.hasOwnProperty`.
    pub fn has_own_property(&self, handle: ObjectHandle, key: &PropertyKey) -> Completion<bool> {
        Ok(self.object(handle)?.has_own_property(key))
    }

    /// `Object.prototype.propertyIsEnumerable`.
    pub fn property_is_enumerable(&self, handle: ObjectHandle, key: &PropertyKey) -> Completion<bool> {
        Ok(self
            .object(handle)?
            .get_own_property(key)
            .is_some_and(PropertyDescriptor::is_enumerable))
    }

    pub fn own_property_keys(&self, handle: ObjectHandle) -> Completion<Vec<PropertyKey>> {
        Ok(self.object(handle)?.own_property_keys())
    }

    /// `for...in` enumeration: walk the prototype chain, collect enumerable
    /// string keys, skipping keys shadowed lower in the chain.
    pub fn for_in_keys(&self, handle: ObjectHandle) -> Completion<Vec<String>> {
        let mut result = Vec::new();
        let mut seen = BTreeSet::<PropertyKey>::new();
        let mut current = Some(handle);
        let mut depth: u32 = 0;
        let mut visited = BTreeSet::new();

        while let Some(h) = current {
            self.guard_chain(h, depth, &mut visited)?;
            let obj = self.object(h)?;
            for key in obj.own_property_keys() {
                if !seen.insert(key.clone()) {
                    continue;
                }
                if let PropertyKey::String(ref s) = key
                    && obj.get_own_property(&key).is_some_and(PropertyDescriptor::is_enumerable)
                {
                    result.push(s.clone());
                }
            }
            current = obj.prototype;
            depth += 1;
        }
        Ok(result)
    }

    fn guard_chain(
        &self,
        handle: ObjectHandle,
        depth: u32,
        visited: &mut BTreeSet<ObjectHandle>,
    ) -> Completion<()> {
        if depth > MAX_PROTOTYPE_CHAIN_DEPTH {
            return Err(Abrupt::range_error(format!(
                "prototype chain depth {depth} exceeds max {MAX_PROTOTYPE_CHAIN_DEPTH}"
            )));
        }
        if !visited.insert(handle) {
            return Err(Abrupt::type_error("prototype chain cycle detected"));
        }
        Ok(())
    }

    /// Nearest property named `key` on the chain starting at `handle`.
    fn find_property(
        &self,
        handle: ObjectHandle,
        key: &PropertyKey,
    ) -> Completion<Option<(ObjectHandle, PropertyDescriptor)>> {
        let mut current = Some(handle);
        let mut depth: u32 = 0;
        let mut visited = BTreeSet::new();
        while let Some(h) = current {
            self.guard_chain(h, depth, &mut visited)?;
            let obj = self.object(h)?;
            if let Some(desc) = obj.get_own_property(key) {
                return Ok(Some((h, desc.clone())));
            }
            current = obj.prototype;
            depth += 1;
        }
        Ok(None)
    }

    // -- [[Get]] / [[Set]] / [[Delete]] / [[DefineOwnProperty]] ---------------

    /// `[[Get]](O, P)` with `O` as receiver.
    pub fn get(&mut self, handle: ObjectHandle, key: &PropertyKey) -> Completion {
        match self.find_property(handle, key)? {
            None => Ok(JsValue::Undefined),
            Some((_, PropertyDescriptor::Data { value, .. })) => Ok(value),
            Some((_, PropertyDescriptor::Accessor { get: None, .. })) => Ok(JsValue::Undefined),
            Some((_, PropertyDescriptor::Accessor { get: Some(getter), .. })) => {
                self.call(&JsValue::Object(getter), &JsValue::Object(handle), &[])
            }
        }
    }

    /// OrdinarySet (§9.1.9.2). `Ok(false)` is a rejected write; whether that
    /// throws is up to [`Realm::put`].
    pub fn set(&mut self, handle: ObjectHandle, key: &PropertyKey, value: JsValue) -> Completion<bool> {
        if let Some(hook) = self.object(handle)?.set_hook {
            let result = self.call(
                &JsValue::Object(hook),
                &JsValue::Object(handle),
                &[key.to_value(), value],
            )?;
            return Ok(result.truthy());
        }

        match self.find_property(handle, key)? {
            Some((_, PropertyDescriptor::Data { writable: false, .. })) => Ok(false),
            Some((_, PropertyDescriptor::Accessor { set: None, .. })) => Ok(false),
            Some((_, PropertyDescriptor::Accessor { set: Some(setter), .. })) => {
                self.call(&JsValue::Object(setter), &JsValue::Object(handle), &[value])?;
                Ok(true)
            }
            Some((owner, PropertyDescriptor::Data { enumerable, configurable, .. }))
                if owner == handle =>
            {
                let desc = PropertyDescriptor::with_flags(value, true, enumerable, configurable);
                self.define_own_property(handle, key.clone(), desc)
            }
            _ => self.define_own_property(handle, key.clone(), PropertyDescriptor::data(value)),
        }
    }

    /// Assignment `O[P] = V`; a rejected write throws in strict mode.
    pub fn put(&mut self, handle: ObjectHandle, key: &PropertyKey, value: JsValue) -> Completion<()> {
        if !self.set(handle, key, value)? && self.config.strict_mode {
            return Err(Abrupt::type_error(format!(
                "Cannot assign to read only property '{}' of object",
                self.key_display(key)
            )));
        }
        Ok(())
    }

    /// `[[Delete]](O, P)`: `false` for non-configurable properties.
    pub fn delete(&mut self, handle: ObjectHandle, key: &PropertyKey) -> Completion<bool> {
        Ok(self.object_mut(handle)?.delete(key))
    }

    /// `delete O[P]`; a rejected delete throws in strict mode.
    pub fn delete_property(&mut self, handle: ObjectHandle, key: &PropertyKey) -> Completion<bool> {
        let deleted = self.delete(handle, key)?;
        if !deleted && self.config.strict_mode {
            return Err(Abrupt::type_error(format!(
                "Cannot delete property '{}' of object",
                self.key_display(key)
            )));
        }
        Ok(deleted)
    }

    /// `[[DefineOwnProperty]]` including the array exotic `length` and index
    /// behavior (§9.4.2.1).
    pub fn define_own_property(
        &mut self,
        handle: ObjectHandle,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> Completion<bool> {
        if self.object(handle)?.kind != ObjectKind::Array {
            return Ok(self.object_mut(handle)?.define_own_property(key, desc));
        }
        if key.as_str() == Some("length") {
            return self.array_set_length(handle, desc);
        }
        let Some(index) = key.array_index() else {
            return Ok(self.object_mut(handle)?.define_own_property(key, desc));
        };

        let (old_len, length_writable) = self.array_length(handle)?;
        if f64::from(index) >= old_len && !length_writable {
            return Ok(false);
        }
        let obj = self.object_mut(handle)?;
        if !obj.define_own_property(key, desc) {
            return Ok(false);
        }
        if f64::from(index) >= old_len
            && let Some(PropertyDescriptor::Data { value, .. }) =
                obj.properties.get_mut(&PropertyKey::from("length"))
        {
            *value = JsValue::Number(f64::from(index) + 1.0);
        }
        Ok(true)
    }

    /// `Object.defineProperty`: a rejected definition throws.
    pub fn define_property_or_throw(
        &mut self,
        handle: ObjectHandle,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> Completion<()> {
        let label = self.key_display(&key);
        if !self.define_own_property(handle, key, desc)? {
            return Err(Abrupt::type_error(format!("Cannot redefine property: {label}")));
        }
        Ok(())
    }

    fn array_length(&self, handle: ObjectHandle) -> Completion<(f64, bool)> {
        match self.object(handle)?.get_own_property(&"length".into()) {
            Some(PropertyDescriptor::Data {
                value: JsValue::Number(n),
                writable,
                ..
            }) => Ok((*n, *writable)),
            _ => Ok((0.0, true)),
        }
    }

    /// ArraySetLength (§9.4.2.4).
    fn array_set_length(&mut self, handle: ObjectHandle, desc: PropertyDescriptor) -> Completion<bool> {
        let PropertyDescriptor::Data {
            value,
            writable: new_writable,
            enumerable,
            configurable,
        } = desc
        else {
            return Ok(false);
        };
        let number = self.to_number(&value)?;
        if !(number.is_finite() && number >= 0.0 && number.fract() == 0.0 && number <= MAX_ARRAY_LENGTH)
        {
            return Err(Abrupt::range_error("Invalid array length"));
        }
        let new_len = number;
        let (old_len, old_writable) = self.array_length(handle)?;
        if !old_writable && new_len != old_len {
            return Ok(false);
        }

        let obj = self.object_mut(handle)?;
        let mut doomed: Vec<(u32, PropertyKey)> = obj
            .properties
            .keys()
            .filter_map(|k| k.array_index().map(|i| (i, k.clone())))
            .filter(|(i, _)| f64::from(*i) >= new_len)
            .collect();
        doomed.sort_by(|a, b| b.0.cmp(&a.0));

        let mut final_len = new_len;
        let mut blocked = false;
        for (index, key) in doomed {
            if !obj.delete(&key) {
                final_len = f64::from(index) + 1.0;
                blocked = true;
                break;
            }
        }

        let length_desc = PropertyDescriptor::with_flags(
            JsValue::Number(final_len),
            new_writable,
            enumerable,
            configurable,
        );
        let applied = obj.define_own_property("length".into(), length_desc);
        Ok(applied && !blocked)
    }

    // -- calls ----------------------------------------------------------------

    /// `Call(F, thisArg, args)`.
    pub fn call(&mut self, callee: &JsValue, this: &JsValue, args: &[JsValue]) -> Completion {
        let behavior = match callee {
            JsValue::Object(h) => match self.object(*h)?.kind {
                ObjectKind::Function(id) => self
                    .functions
                    .get(id.0 as usize)
                    .map(|f| Rc::clone(&f.behavior)),
                _ => None,
            },
            _ => None,
        };
        let Some(behavior) = behavior else {
            return Err(Abrupt::type_error(format!(
                "{} is not a function",
                callee.type_name()
            )));
        };
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(Abrupt::range_error("Maximum call stack size exceeded"));
        }
        self.call_depth += 1;
        let result = (*behavior)(self, this, args);
        self.call_depth -= 1;
        result
    }

    // -- abrupt completions -------------------------------------------------

    /// The value a `catch` clause would observe.
    pub fn materialize(&mut self, abrupt: Abrupt) -> JsValue {
        match abrupt {
            Abrupt::Throw(value) => value,
            Abrupt::TypeError(message) => JsValue::Object(self.new_error(ErrorKind::TypeError, &message)),
            Abrupt::RangeError(message) => JsValue::Object(self.new_error(ErrorKind::RangeError, &message)),
        }
    }

    /// `e instanceof TypeError` for a pending abrupt completion.
    pub fn is_type_error(&self, abrupt: &Abrupt) -> bool {
        match abrupt {
            Abrupt::TypeError(_) => true,
            Abrupt::RangeError(_) => false,
            Abrupt::Throw(value) => self.instance_of_kind(value, ErrorKind::TypeError),
        }
    }

    /// `value instanceof Kind` against the intrinsic prototype.
    pub fn instance_of_kind(&self, value: &JsValue, kind: ErrorKind) -> bool {
        let Some(handle) = value.as_object() else {
            return false;
        };
        let target = self.error_prototype(kind);
        let mut current = self.objects.get(handle.0 as usize).and_then(|o| o.prototype);
        let mut depth: u32 = 0;
        while let Some(h) = current {
            if h == target {
                return true;
            }
            if depth > MAX_PROTOTYPE_CHAIN_DEPTH {
                return false;
            }
            current = self.objects.get(h.0 as usize).and_then(|o| o.prototype);
            depth += 1;
        }
        false
    }

    // -- conversions --------------------------------------------------------

    /// `String(value)`. Throws when an object's `toString`/`valueOf` throw or
    /// neither yields a primitive.
    pub fn to_display_string(&mut self, value: &JsValue) -> Completion<String> {
        match value {
            JsValue::Object(h) => {
                let primitive = self.to_primitive_string(*h)?;
                self.to_display_string(&primitive)
            }
            JsValue::Symbol(id) => Ok(format!(
                "Symbol({})",
                self.symbol_description(*id).unwrap_or_default()
            )),
            JsValue::Number(n) => Ok(number_to_string(*n)),
            other => Ok(other.to_string()),
        }
    }

    /// Key as it appears in error messages; symbols show their description.
    pub fn key_display(&self, key: &PropertyKey) -> String {
        match key {
            PropertyKey::String(name) => name.clone(),
            PropertyKey::Symbol(id) => {
                format!("Symbol({})", self.symbol_description(*id).unwrap_or_default())
            }
        }
    }

    /// OrdinaryToPrimitive with hint "string".
    fn to_primitive_string(&mut self, handle: ObjectHandle) -> Completion {
        for name in ["toString", "valueOf"] {
            let method = self.get(handle, &name.into())?;
            if self.is_callable(&method) {
                let result = self.call(&method, &JsValue::Object(handle), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(Abrupt::type_error("Cannot convert object to primitive value"))
    }

    /// ToNumber for primitives; objects go through their string form.
    pub fn to_number(&mut self, value: &JsValue) -> Completion<f64> {
        match value {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            JsValue::Number(n) => Ok(*n),
            JsValue::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(0.0);
                }
                Ok(trimmed.parse::<f64>().unwrap_or(f64::NAN))
            }
            JsValue::Symbol(_) => Err(Abrupt::type_error("Cannot convert a Symbol value to a number")),
            JsValue::Object(_) => {
                let text = self.to_display_string(value)?;
                self.to_number(&JsValue::Str(text))
            }
        }
    }

    /// ToPropertyKey.
    pub fn to_property_key(&mut self, value: &JsValue) -> Completion<PropertyKey> {
        match value {
            JsValue::Symbol(id) => Ok(PropertyKey::Symbol(*id)),
            other => Ok(PropertyKey::String(self.to_display_string(other)?)),
        }
    }

    /// `Object.prototype.toString.call(value)`. Never throws.
    pub fn builtin_tag(&self, value: &JsValue) -> String {
        let tag = match value {
            JsValue::Undefined => "Undefined",
            JsValue::Null => "Null",
            JsValue::Bool(_) => "Boolean",
            JsValue::Number(_) => "Number",
            JsValue::Str(_) => "String",
            JsValue::Symbol(_) => "Symbol",
            JsValue::Object(h) => self
                .objects
                .get(h.0 as usize)
                .map_or("Object", |o| o.kind.builtin_tag()),
        };
        format!("[object {tag}]")
    }

    // -- intrinsics ---------------------------------------------------------

    fn define_method<F>(&mut self, target: ObjectHandle, name: &str, arity: u32, behavior: F)
    where
        F: Fn(&mut Realm, &JsValue, &[JsValue]) -> Completion + 'static,
    {
        let function = self.new_function(name, arity, behavior);
        self.force_define(target, name.into(), PropertyDescriptor::hidden(JsValue::Object(function)));
    }

    fn install_object_prototype(&mut self) {
        let proto = self.intrinsics.object_prototype;
        self.define_method(proto, "toString", 0, |realm, this, _| {
            Ok(JsValue::Str(realm.builtin_tag(this)))
        });
        self.define_method(proto, "valueOf", 0, |_, this, _| Ok(this.clone()));
        self.define_method(proto, "hasOwnProperty", 1, |realm, this, args| {
            let key = realm.to_property_key(args.first().unwrap_or(&JsValue::Undefined))?;
            let handle = this_object(this)?;
            Ok(JsValue::Bool(realm.has_own_property(handle, &key)?))
        });
        self.define_method(proto, "propertyIsEnumerable", 1, |realm, this, args| {
            let key = realm.to_property_key(args.first().unwrap_or(&JsValue::Undefined))?;
            let handle = this_object(this)?;
            Ok(JsValue::Bool(realm.property_is_enumerable(handle, &key)?))
        });
    }

    fn install_function_prototype(&mut self) {
        let proto = self.intrinsics.function_prototype;
        self.define_method(proto, "toString", 0, |realm, this, _| {
            let handle = this_object(this)?;
            if !realm.is_callable(this) {
                return Err(Abrupt::type_error(
                    "Function.prototype.toString requires that 'this' be a Function",
                ));
            }
            let name = match realm.get(handle, &"name".into())? {
                JsValue::Str(s) => s,
                _ => String::new(),
            };
            Ok(JsValue::Str(format!("function {name}() {{ [native code] }}")))
        });
    }

    fn install_array_prototype(&mut self) {
        let proto = self.intrinsics.array_prototype;
        self.define_method(proto, "toString", 0, |realm, this, _| {
            let handle = this_object(this)?;
            let length_value = realm.get(handle, &"length".into())?;
            let length = realm.to_number(&length_value)?;
            let mut parts = Vec::new();
            let mut index = 0u32;
            while f64::from(index) < length {
                let element = realm.get(handle, &PropertyKey::String(index.to_string()))?;
                parts.push(match element {
                    JsValue::Undefined | JsValue::Null => String::new(),
                    other => realm.to_display_string(&other)?,
                });
                index += 1;
            }
            Ok(JsValue::Str(parts.join(",")))
        });
    }

    fn install_errors(&mut self) {
        let object_prototype = self.intrinsics.object_prototype;
        let base = self.install_error_kind(ErrorKind::Error, object_prototype);
        self.define_method(base.prototype, "toString", 0, |realm, this, _| {
            let handle = this_object(this)?;
            let name = match realm.get(handle, &"name".into())? {
                JsValue::Undefined => "Error".to_string(),
                other => realm.to_display_string(&other)?,
            };
            let message = match realm.get(handle, &"message".into())? {
                JsValue::Undefined => String::new(),
                other => realm.to_display_string(&other)?,
            };
            Ok(JsValue::Str(match (name.is_empty(), message.is_empty()) {
                (true, _) => message,
                (_, true) => name,
                _ => format!("{name}: {message}"),
            }))
        });

        for kind in ErrorKind::ALL {
            match kind {
                ErrorKind::Error => {}
                ErrorKind::Test262Error => {
                    let intrinsic = self.install_error_kind(kind, object_prototype);
                    self.define_method(intrinsic.prototype, "toString", 0, |realm, this, _| {
                        let handle = this_object(this)?;
                        let message = match realm.get(handle, &"message".into())? {
                            JsValue::Undefined => String::new(),
                            other => realm.to_display_string(&other)?,
                        };
                        Ok(JsValue::Str(format!("Test262Error: {message}")))
                    });
                }
                _ => {
                    self.install_error_kind(kind, base.prototype);
                }
            }
        }
    }

    fn install_error_kind(&mut self, kind: ErrorKind, parent_proto: ObjectHandle) -> ErrorIntrinsic {
        let prototype = self.alloc(ObjectKind::Ordinary, Some(parent_proto));
        let constructor = self.install_error_constructor(kind.name(), prototype);
        let intrinsic = ErrorIntrinsic {
            constructor,
            prototype,
        };
        self.intrinsics.errors.insert(kind, intrinsic);
        let global = self.intrinsics.global;
        self.force_define(global, kind.name().into(), PropertyDescriptor::hidden(JsValue::Object(constructor)));
        intrinsic
    }

    /// Constructor function wired to `prototype` in both directions.
    fn install_error_constructor(&mut self, name: &str, prototype: ObjectHandle) -> ObjectHandle {
        let constructor = self.new_function(name, 1, move |realm, _, args| {
            let message = match args.first() {
                None | Some(JsValue::Undefined) => None,
                Some(value) => Some(realm.to_display_string(value)?),
            };
            let handle = realm.alloc(ObjectKind::Error, Some(prototype));
            if let Some(message) = message {
                realm.force_define(handle, "message".into(), PropertyDescriptor::hidden(JsValue::Str(message)));
            }
            Ok(JsValue::Object(handle))
        });
        self.force_define(
            constructor,
            "prototype".into(),
            PropertyDescriptor::with_flags(JsValue::Object(prototype), false, false, false),
        );
        self.force_define(prototype, "constructor".into(), PropertyDescriptor::hidden(JsValue::Object(constructor)));
        self.force_define(prototype, "name".into(), PropertyDescriptor::hidden(JsValue::str(name)));
        self.force_define(prototype, "message".into(), PropertyDescriptor::hidden(JsValue::str("")));
        constructor
    }
}

fn this_object(this: &JsValue) -> Completion<ObjectHandle> {
    this.as_object().ok_or_else(|| {
        Abrupt::type_error(format!(
            "Cannot convert {} to object",
            this.type_name()
        ))
    })
}
