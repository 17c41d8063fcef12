//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::card::CreditCard;

/// A card holder account, identified by a unique email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        let now = super::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A user together with its cards, when they were requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_cards: Option<Vec<CreditCard>>,
}

impl UserDetails {
    pub fn bare(user: User) -> Self {
        Self {
            user,
            credit_cards: None,
        }
    }

    pub fn with_cards(user: User, cards: Vec<CreditCard>) -> Self {
        Self {
            user,
            credit_cards: Some(cards),
        }
    }
}

/// Payload for creating a user
///
/// Fields are optional at the wire level so a missing email surfaces as a
/// validation error instead of a decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct NewUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl NewUser {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: Some(email.into()),
            name,
        }
    }
}

/// Partial update for a user
///
/// `email` is applied only when non-empty. `name` is applied whenever the key
/// is present: `Some(None)` (an explicit `null`) clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::present",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "with-utoipa", schema(value_type = Option<String>))]
    pub name: Option<Option<String>>,
}
