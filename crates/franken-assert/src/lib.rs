#![forbid(unsafe_code)]

//! Conformance assertion and property-verification helpers over a native
//! ECMAScript value and object model.
//!
//! The entry points take a [`Realm`] and the values under test:
//! [`assert::assert_true`], [`assert::same_value`],
//! [`assert::not_same_value`], [`assert::throws`],
//! [`property::verify_property`] and the per-facet `verify_*` helpers.
//! [`bindings::install_harness`] exposes the same family to native code
//! running inside the realm.

pub mod assert;
pub mod bindings;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod object_model;
pub mod probe;
pub mod property;
pub mod realm;
pub mod stringify;
pub mod value;

pub use config::HarnessConfig;
pub use descriptor::{DescriptorArg, ExpectedDescriptor, Facet, VerificationReport, VerifyOptions};
pub use error::{Abrupt, Completion, HarnessError};
pub use events::HarnessEvent;
pub use object_model::{ObjectKind, PropertyDescriptor};
pub use realm::{ErrorKind, Realm};
pub use value::{JsValue, ObjectHandle, PropertyKey, SymbolId};
