//! Card service - credit card records and their owner relation

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::domain::result::{Error, Result};
use crate::domain::{
    non_empty, now, CardDetails, CardPatch, CardQuery, CreditCard, Deleted, ExpiryPolicy, NewCard,
    User,
};
use crate::ports::Repository;

use super::user::USER_NOT_FOUND;

pub const CARD_NOT_FOUND: &str = "Credit card not found";

/// Business rules for cards: required fields, expiry format, owner existence
#[derive(Clone)]
pub struct CardService {
    repo: Arc<dyn Repository>,
    policy: ExpiryPolicy,
}

impl CardService {
    pub fn new(repo: Arc<dyn Repository>, policy: ExpiryPolicy) -> Self {
        Self { repo, policy }
    }

    #[instrument(name = "cardvault.cards.list", skip(self))]
    pub async fn list(&self, query: &CardQuery) -> Result<Vec<CardDetails>> {
        let owner_filter = query.user_id.as_deref().filter(|id| !id.is_empty());
        let cards = self.repo.list_cards(owner_filter).await?;
        debug!(count = cards.len(), "Listed cards");

        let mut details = Vec::with_capacity(cards.len());
        for card in cards {
            details.push(self.expand(card, query.include_owner).await?);
        }
        Ok(details)
    }

    #[instrument(name = "cardvault.cards.get", skip(self))]
    pub async fn get(&self, id: &str, include_owner: bool) -> Result<CardDetails> {
        let card = self.require(id).await?;
        self.expand(card, include_owner).await
    }

    /// Create a card after checking required fields, expiry and owner
    ///
    /// All missing fields are reported at once.
    #[instrument(name = "cardvault.cards.create", skip_all)]
    pub async fn create(&self, new_card: NewCard) -> Result<CardDetails> {
        let missing = new_card.missing_fields();
        if !missing.is_empty() {
            return Err(Error::MissingFields(missing));
        }

        let NewCard {
            card_number,
            card_holder,
            expiry_date,
            cvv,
            user_id,
        } = new_card;
        let expiry_date = expiry_date.unwrap_or_default();
        self.policy.check(&expiry_date)?;

        let owner = match non_empty(user_id) {
            Some(owner_id) => Some(self.require_owner(&owner_id).await?),
            None => None,
        };

        let card = CreditCard::new(
            card_number.unwrap_or_default(),
            card_holder.unwrap_or_default(),
            expiry_date,
            cvv.unwrap_or_default(),
            owner.as_ref().map(|u| u.id.clone()),
        );
        self.repo.insert_card(&card).await?;

        info!(card_id = %card.id, owned = owner.is_some(), "Created card");
        Ok(CardDetails::with_owner(card, owner))
    }

    /// Apply a partial update
    ///
    /// Empty strings leave fields untouched. `user_id: Some(None)` or an
    /// empty id detaches the card.
    #[instrument(name = "cardvault.cards.update", skip(self, patch))]
    pub async fn update(&self, id: &str, patch: CardPatch) -> Result<CardDetails> {
        let mut card = self.require(id).await?;

        let expiry_date = non_empty(patch.expiry_date);
        if let Some(expiry) = &expiry_date {
            self.policy.check(expiry)?;
        }

        let owner_change = match patch.user_id {
            None => None,
            Some(requested) => match non_empty(requested) {
                Some(owner_id) => Some(Some(self.require_owner(&owner_id).await?)),
                None => Some(None),
            },
        };

        if let Some(number) = non_empty(patch.card_number) {
            card.card_number = number;
        }
        if let Some(holder) = non_empty(patch.card_holder) {
            card.card_holder = holder;
        }
        if let Some(expiry) = expiry_date {
            card.expiry_date = expiry;
        }
        if let Some(cvv) = non_empty(patch.cvv) {
            card.cvv = cvv;
        }
        let owner = match owner_change {
            Some(owner) => {
                card.user_id = owner.as_ref().map(|u| u.id.clone());
                owner
            }
            None => self.owner_of(&card).await?,
        };
        card.updated_at = now();

        self.repo.update_card(&card).await?;
        info!("Updated card");
        Ok(CardDetails::with_owner(card, owner))
    }

    #[instrument(name = "cardvault.cards.delete", skip(self))]
    pub async fn delete(&self, id: &str) -> Result<Deleted> {
        self.require(id).await?;
        self.repo.delete_card(id).await?;
        info!("Deleted card");
        Ok(Deleted::new("Credit card deleted successfully", id))
    }

    async fn require(&self, id: &str) -> Result<CreditCard> {
        self.repo
            .get_card(id)
            .await?
            .ok_or_else(|| Error::not_found(CARD_NOT_FOUND))
    }

    async fn require_owner(&self, user_id: &str) -> Result<User> {
        self.repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::not_found(USER_NOT_FOUND))
    }

    async fn owner_of(&self, card: &CreditCard) -> Result<Option<User>> {
        match &card.user_id {
            Some(user_id) => self.repo.get_user(user_id).await,
            None => Ok(None),
        }
    }

    async fn expand(&self, card: CreditCard, include_owner: bool) -> Result<CardDetails> {
        if !include_owner {
            return Ok(CardDetails::bare(card));
        }
        let owner = self.owner_of(&card).await?;
        Ok(CardDetails::with_owner(card, owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;

    fn service_with(policy: ExpiryPolicy) -> (CardService, Arc<DuckDbRepository>) {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        (CardService::new(repo.clone(), policy), repo)
    }

    fn service() -> (CardService, Arc<DuckDbRepository>) {
        service_with(ExpiryPolicy::default())
    }

    fn owner(repo: &DuckDbRepository, email: &str) -> User {
        let user = User::new(email, None);
        repo.insert_user(&user).unwrap();
        user
    }

    #[tokio::test]
    async fn test_create_reports_all_missing_fields() {
        let (service, _) = service();
        let card = NewCard {
            card_number: Some("4111111111111111".into()),
            card_holder: Some(String::new()),
            ..NewCard::default()
        };
        match service.create(card).await.unwrap_err() {
            Error::MissingFields(fields) => {
                assert_eq!(fields, vec!["cardHolder", "expiryDate", "cvv"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_checks_expiry() {
        let (service, _) = service();
        let err = service
            .create(NewCard::new("4111111111111111", "Ana", "13/28", "123"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Validation(ref m) if m == "Invalid expiry date format. Expected MM/YY")
        );

        let err = service
            .create(NewCard::new("4111111111111111", "Ana", "12/24", "123"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("2025")));

        let (lenient, _) = service_with(ExpiryPolicy::format_only());
        assert!(lenient
            .create(NewCard::new("4111111111111111", "Ana", "12/24", "123"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_create_with_unknown_owner_is_not_found() {
        let (service, repo) = service();
        let err = service
            .create(NewCard::new("4111111111111111", "Ana", "12/28", "123").owned_by("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m == USER_NOT_FOUND));
        assert!(repo.list_cards(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_embeds_owner() {
        let (service, repo) = service();
        let ana = owner(&repo, "ana@example.com");

        let created = service
            .create(NewCard::new("4111111111111111", "Ana", "12/28", "123").owned_by(&ana.id))
            .await
            .unwrap();
        assert_eq!(created.card.user_id.as_deref(), Some(ana.id.as_str()));
        assert_eq!(created.user, Some(Some(ana)));

        let unowned = service
            .create(NewCard::new("4111111111111111", "Ana", "12/28", "123"))
            .await
            .unwrap();
        assert_eq!(unowned.user, Some(None));
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let (service, repo) = service();
        let ana = owner(&repo, "ana@example.com");
        let created = service
            .create(NewCard::new("4111111111111111", "Ana", "12/28", "123").owned_by(&ana.id))
            .await
            .unwrap();

        let patch = CardPatch {
            card_holder: Some("Ana Pérez".into()),
            cvv: Some(String::new()),
            ..CardPatch::default()
        };
        let updated = service.update(&created.card.id, patch).await.unwrap();
        assert_eq!(updated.card.card_holder, "Ana Pérez");
        assert_eq!(updated.card.cvv, "123");
        assert_eq!(updated.card.card_number, "4111111111111111");
        assert_eq!(updated.user, Some(Some(ana)));
    }

    #[tokio::test]
    async fn test_update_owner_transitions() {
        let (service, repo) = service();
        let ana = owner(&repo, "ana@example.com");
        let created = service
            .create(NewCard::new("4111111111111111", "Ana", "12/28", "123"))
            .await
            .unwrap();
        let id = created.card.id;

        let attach = CardPatch {
            user_id: Some(Some(ana.id.clone())),
            ..CardPatch::default()
        };
        let attached = service.update(&id, attach).await.unwrap();
        assert_eq!(attached.card.user_id.as_deref(), Some(ana.id.as_str()));

        let ghost = CardPatch {
            user_id: Some(Some("ghost".into())),
            ..CardPatch::default()
        };
        let err = service.update(&id, ghost).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m == USER_NOT_FOUND));

        for detach in [Some(None), Some(Some(String::new()))] {
            let patch = CardPatch {
                user_id: detach,
                ..CardPatch::default()
            };
            let detached = service.update(&id, patch).await.unwrap();
            assert_eq!(detached.card.user_id, None);
            assert_eq!(detached.user, Some(None));
        }
    }

    #[tokio::test]
    async fn test_update_rejects_bad_expiry_without_writing() {
        let (service, _) = service();
        let created = service
            .create(NewCard::new("4111111111111111", "Ana", "12/28", "123"))
            .await
            .unwrap();

        let patch = CardPatch {
            expiry_date: Some("00/28".into()),
            cvv: Some("999".into()),
            ..CardPatch::default()
        };
        assert!(service.update(&created.card.id, patch).await.is_err());

        let stored = service.get(&created.card.id, false).await.unwrap();
        assert_eq!(stored.card.cvv, "123");
        assert_eq!(stored.user, None);
    }

    #[tokio::test]
    async fn test_list_filters_by_owner() {
        let (service, repo) = service();
        let ana = owner(&repo, "ana@example.com");
        service
            .create(NewCard::new("4111111111111111", "Ana", "12/28", "123").owned_by(&ana.id))
            .await
            .unwrap();
        service
            .create(NewCard::new("5500000000000004", "Bea", "11/27", "456"))
            .await
            .unwrap();

        let all = service.list(&CardQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|c| c.user.is_none()));

        let query = CardQuery {
            include_owner: true,
            ..CardQuery::for_user(&ana.id)
        };
        let owned = service.list(&query).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].user, Some(Some(ana)));
    }

    #[tokio::test]
    async fn test_delete_missing_card() {
        let (service, _) = service();
        let err = service.delete("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m == CARD_NOT_FOUND));
    }
}
