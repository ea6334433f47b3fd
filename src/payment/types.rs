//! Payloads that flow through the dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::fmt;

const PLATFORM_KEY: &str = "platform";

/// Loose truthiness shared by every "was anything given" check.
///
/// `null`, `false`, `""` and numeric zero count as nothing.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(true) | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Identifier of a storefront platform, e.g. `"apple"` or `"roku"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformId(String);

impl PlatformId {
    /// Create a platform identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PlatformId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlatformId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlatformId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque payment payload handed to an engine.
///
/// Receipt data, purchase tokens and the like. The dispatcher never looks
/// inside; it only checks that something was supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payment(Value);

impl Payment {
    /// Wrap a JSON payload.
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Returns true if the payload carries anything at all.
    ///
    /// `null`, `false`, `""` and `0` count as no payment. Empty arrays and
    /// objects are passed through to the engine.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !is_blank(&self.0)
    }

    /// Borrow the raw payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.0
    }

    /// Take the raw payload.
    #[must_use]
    pub fn into_payload(self) -> Value {
        self.0
    }
}

impl From<Value> for Payment {
    fn from(payload: Value) -> Self {
        Self(payload)
    }
}

/// Result of a `verifyPayment` call.
///
/// Engines fill `fields` with whatever their storefront reports. The
/// dispatcher sets `platform` on every successful verification, and the same
/// value is later used to route `isCancelled`/`isExpired` back to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Platform that produced this result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformId>,

    /// Engine-reported fields, kept verbatim.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl VerificationResult {
    /// Build a result from engine-reported fields.
    ///
    /// A string `"platform"` entry is lifted into [`Self::platform`].
    #[must_use]
    pub fn new(mut fields: Map<String, Value>) -> Self {
        let platform = match fields.remove(PLATFORM_KEY) {
            Some(Value::String(id)) => Some(PlatformId::from(id)),
            Some(other) => {
                fields.insert(PLATFORM_KEY.to_string(), other);
                None
            }
            None => None,
        };
        Self { platform, fields }
    }

    /// Build a result from a JSON value.
    ///
    /// Non-object values are kept under a `"value"` key.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::new(fields),
            other => {
                let mut fields = Map::new();
                fields.insert("value".to_string(), other);
                Self::new(fields)
            }
        }
    }

    /// Platform that produced this result, if stamped.
    #[must_use]
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_ref().map(PlatformId::as_str)
    }

    /// Transaction identifier reported by the engine.
    ///
    /// Missing, `null`, `false`, `""` and `0` identifiers all count as absent.
    #[must_use]
    pub fn transaction_id(&self) -> Option<&Value> {
        self.fields.get("transactionId").filter(|id| !is_blank(id))
    }

    /// Look up an engine-reported field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set an engine-reported field, returning the result for chaining.
    ///
    /// A string `"platform"` sets [`Self::platform`] instead.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key == PLATFORM_KEY {
            self.platform = None;
            if let Value::String(id) = value {
                self.platform = Some(PlatformId::from(id));
                return self;
            }
        }
        self.fields.insert(key, value);
        self
    }

    /// Stamp the originating platform, replacing any previous value.
    ///
    /// A `"platform"` key left in [`Self::fields`] is dropped so the result
    /// serializes with exactly one platform.
    pub(crate) fn stamp(&mut self, platform: &PlatformId) {
        self.fields.remove(PLATFORM_KEY);
        self.platform = Some(platform.clone());
    }
}
