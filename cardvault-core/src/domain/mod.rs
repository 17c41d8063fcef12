//! Core domain entities
//!
//! Records, field validation and error types. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod card;
mod user;
pub mod result;
pub mod validation;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use card::{CardDetails, CardPatch, CardQuery, CreditCard, NewCard, CARD_REQUIRED_FIELDS};
pub use user::{NewUser, User, UserDetails, UserPatch};
pub use validation::{ExpiryPolicy, ValidationReport};

/// Confirmation returned by delete operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct Deleted {
    pub message: String,
    pub id: String,
}

impl Deleted {
    pub fn new(message: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            id: id.into(),
        }
    }
}

/// JSON error payload of the REST API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Every required field, on missing-field errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// The required fields that were absent or empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Deserialize a present key (including an explicit `null`) as `Some`.
///
/// Used together with `#[serde(default)]` so that a missing key stays `None`
/// while `null` becomes `Some(None)`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Treat empty strings the same as absent values
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Current time at the microsecond precision records are stored with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
