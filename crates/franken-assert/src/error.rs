//! Failure taxonomy.
//!
//! [`Abrupt`] is a throw raised *inside* the realm (by a native function, a
//! strict-mode `[[Set]]`, an invalid array length, ...). [`HarnessError`] is
//! what the assertion helpers return to their caller.

use serde::{Deserialize, Serialize};

use crate::realm::{ErrorKind, Realm};
use crate::value::JsValue;

pub const FE_ASSERT_USAGE: &str = "FE-ASSERT-0001";
pub const FE_ASSERT_FAILED: &str = "FE-ASSERT-0002";
pub const FE_ASSERT_UNEXPECTED: &str = "FE-ASSERT-0003";
pub const FE_ASSERT_INVALID_CONFIG: &str = "FE-ASSERT-0004";

// ---------------------------------------------------------------------------
// Abrupt
// ---------------------------------------------------------------------------

/// Abrupt completion. Built-in failures stay descriptive until something
/// needs the actual error object, see [`Realm::materialize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Abrupt {
    /// An arbitrary thrown value (`throw x`).
    Throw(JsValue),
    /// A `TypeError` raised by a built-in operation.
    TypeError(String),
    /// A `RangeError` raised by a built-in operation.
    RangeError(String),
}

impl Abrupt {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError(message.into())
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        Self::RangeError(message.into())
    }
}

/// Result of running realm code.
pub type Completion<T = JsValue> = Result<T, Abrupt>;

// ---------------------------------------------------------------------------
// HarnessError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessErrorInfo {
    pub code: &'static str,
    pub detail: String,
}

/// Failure raised by an assertion or verification helper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// The helper was called incorrectly (missing argument, non-callable
    /// operation). Raised before any probing.
    #[error("FE-ASSERT-0001: {detail}")]
    Usage { detail: String },
    /// The checked condition does not hold.
    #[error("{message}")]
    Assertion { message: String },
    /// A probe raised something other than the expected TypeError. Indicates
    /// a defect in the environment, never a test outcome.
    #[error("FE-ASSERT-0003: {detail}")]
    Unexpected { detail: String },
    #[error("FE-ASSERT-0004: {detail}")]
    Config { detail: String },
}

impl HarnessError {
    pub fn usage(detail: impl Into<String>) -> Self {
        Self::Usage {
            detail: detail.into(),
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::Unexpected {
            detail: detail.into(),
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Usage { .. } => FE_ASSERT_USAGE,
            Self::Assertion { .. } => FE_ASSERT_FAILED,
            Self::Unexpected { .. } => FE_ASSERT_UNEXPECTED,
            Self::Config { .. } => FE_ASSERT_INVALID_CONFIG,
        }
    }

    /// Human-readable description without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Usage { detail } | Self::Unexpected { detail } | Self::Config { detail } => {
                detail
            }
            Self::Assertion { message } => message,
        }
    }

    pub fn stable(&self) -> HarnessErrorInfo {
        HarnessErrorInfo {
            code: self.code(),
            detail: self.message().to_string(),
        }
    }

    /// Re-raise inside the realm as a `Test262Error`, so a failing assertion
    /// nested in an operation can be observed by `throws`.
    pub fn into_abrupt(self, realm: &mut Realm) -> Abrupt {
        let error = realm.new_error(ErrorKind::Test262Error, self.message());
        Abrupt::Throw(JsValue::Object(error))
    }
}
