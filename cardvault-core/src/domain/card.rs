//! Credit card domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;
use super::validation::mask_card_number;

/// Wire names of the fields a new card must carry
pub const CARD_REQUIRED_FIELDS: [&str; 4] = ["cardNumber", "cardHolder", "expiryDate", "cvv"];

/// A stored credit card, optionally owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct CreditCard {
    pub id: String,
    pub card_number: String,
    pub card_holder: String,
    /// Expiry in `MM/YY` form
    pub expiry_date: String,
    pub cvv: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditCard {
    pub fn new(
        card_number: impl Into<String>,
        card_holder: impl Into<String>,
        expiry_date: impl Into<String>,
        cvv: impl Into<String>,
        user_id: Option<String>,
    ) -> Self {
        let now = super::now();
        Self {
            id: Uuid::new_v4().to_string(),
            card_number: card_number.into(),
            card_holder: card_holder.into(),
            expiry_date: expiry_date.into(),
            cvv: cvv.into(),
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Card number safe for display (first two and last four digits)
    pub fn masked_number(&self) -> String {
        mask_card_number(&self.card_number)
    }
}

/// A card together with its owner relation
///
/// `user` is `None` when the owner was not requested, `Some(None)` when it was
/// requested but the card has no owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct CardDetails {
    #[serde(flatten)]
    pub card: CreditCard,
    #[serde(
        default,
        deserialize_with = "super::present",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "with-utoipa", schema(value_type = Option<User>))]
    pub user: Option<Option<User>>,
}

impl CardDetails {
    pub fn bare(card: CreditCard) -> Self {
        Self { card, user: None }
    }

    pub fn with_owner(card: CreditCard, owner: Option<User>) -> Self {
        Self {
            card,
            user: Some(owner),
        }
    }
}

/// Payload for creating a card
///
/// Every field is optional on the wire; required-field checks happen in the
/// card service so that all missing fields are reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct NewCard {
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub card_holder: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub cvv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl NewCard {
    pub fn new(
        card_number: impl Into<String>,
        card_holder: impl Into<String>,
        expiry_date: impl Into<String>,
        cvv: impl Into<String>,
    ) -> Self {
        Self {
            card_number: Some(card_number.into()),
            card_holder: Some(card_holder.into()),
            expiry_date: Some(expiry_date.into()),
            cvv: Some(cvv.into()),
            user_id: None,
        }
    }

    pub fn owned_by(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Wire names of required fields that are absent or empty
    pub fn missing_fields(&self) -> Vec<String> {
        [
            &self.card_number,
            &self.card_holder,
            &self.expiry_date,
            &self.cvv,
        ]
        .iter()
        .zip(CARD_REQUIRED_FIELDS)
        .filter(|(value, _)| value.as_deref().map_or(true, str::is_empty))
        .map(|(_, name)| name.to_string())
        .collect()
    }
}

/// Partial update for a card
///
/// Empty strings are ignored like absent fields. For `user_id`, a present
/// `null` (or empty string) detaches the card from its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
pub struct CardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_holder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::present",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "with-utoipa", schema(value_type = Option<String>))]
    pub user_id: Option<Option<String>>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Filter and expansion options for listing cards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardQuery {
    pub user_id: Option<String>,
    pub include_owner: bool,
}

impl CardQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            include_owner: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_reports_empty_and_absent() {
        let card = NewCard {
            card_number: Some("4111111111111111".to_string()),
            card_holder: Some(String::new()),
            expiry_date: None,
            cvv: Some("123".to_string()),
            user_id: None,
        };
        assert_eq!(card.missing_fields(), vec!["cardHolder", "expiryDate"]);

        let complete = NewCard::new("4111111111111111", "Ana", "12/28", "123");
        assert!(complete.missing_fields().is_empty());
    }

    #[test]
    fn test_card_serializes_camel_case() {
        let card = CreditCard::new("4111111111111111", "Ana", "12/28", "123", None);
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["cardNumber"], "4111111111111111");
        assert_eq!(json["expiryDate"], "12/28");
        assert!(json["userId"].is_null());
    }

    #[test]
    fn test_details_owner_expansion() {
        let card = CreditCard::new("4111111111111111", "Ana", "12/28", "123", None);

        let json = serde_json::to_value(CardDetails::bare(card.clone())).unwrap();
        assert!(json.get("user").is_none());

        let json = serde_json::to_value(CardDetails::with_owner(card.clone(), None)).unwrap();
        assert!(json["user"].is_null());

        let decoded: CardDetails = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.user, Some(None));
        assert_eq!(decoded.card, card);
    }

    #[test]
    fn test_patch_user_id_null_detaches() {
        let patch: CardPatch = serde_json::from_str(r#"{"userId":null}"#).unwrap();
        assert_eq!(patch.user_id, Some(None));

        let patch: CardPatch = serde_json::from_str(r#"{"cvv":"999"}"#).unwrap();
        assert_eq!(patch.user_id, None);
        assert!(!patch.is_empty());
        assert!(CardPatch::default().is_empty());
    }

    #[test]
    fn test_masked_number() {
        let card = CreditCard::new("4111 1111 1111 1234", "Ana", "12/28", "123", None);
        assert_eq!(card.masked_number(), "41**********1234");
    }
}
