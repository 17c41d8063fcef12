//! User service - user records and their cards

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::domain::result::{Error, Result};
use crate::domain::{non_empty, now, Deleted, NewUser, User, UserDetails, UserPatch};
use crate::ports::Repository;

pub const USER_NOT_FOUND: &str = "User not found";
pub const EMAIL_EXISTS: &str = "User with this email already exists";
pub const EMAIL_IN_USE: &str = "Email already in use";

/// Business rules for users: required email, email uniqueness, cascade delete
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    #[instrument(name = "cardvault.users.list", skip(self))]
    pub async fn list(&self, include_cards: bool) -> Result<Vec<UserDetails>> {
        let users = self.repo.list_users().await?;
        debug!(count = users.len(), "Listed users");

        let mut details = Vec::with_capacity(users.len());
        for user in users {
            details.push(self.expand(user, include_cards).await?);
        }
        Ok(details)
    }

    #[instrument(name = "cardvault.users.get", skip(self))]
    pub async fn get(&self, id: &str, include_cards: bool) -> Result<UserDetails> {
        let user = self.require(id).await?;
        self.expand(user, include_cards).await
    }

    #[instrument(name = "cardvault.users.create", skip_all)]
    pub async fn create(&self, new_user: NewUser) -> Result<UserDetails> {
        let email = non_empty(new_user.email).ok_or_else(|| Error::validation("Email is required"))?;

        if self.repo.get_user_by_email(&email).await?.is_some() {
            return Err(Error::conflict(EMAIL_EXISTS));
        }

        let user = User::new(email, non_empty(new_user.name));
        self.repo.insert_user(&user).await?;

        info!(user_id = %user.id, "Created user");
        Ok(UserDetails::with_cards(user, Vec::new()))
    }

    /// Apply a partial update
    ///
    /// Changing the email to one held by another user is a conflict; keeping
    /// the current email is not.
    #[instrument(name = "cardvault.users.update", skip(self, patch))]
    pub async fn update(&self, id: &str, patch: UserPatch) -> Result<UserDetails> {
        let mut current = self.require(id).await?;

        if let Some(email) = non_empty(patch.email) {
            if email != current.email && self.repo.get_user_by_email(&email).await?.is_some() {
                return Err(Error::conflict(EMAIL_IN_USE));
            }
            current.email = email;
        }
        if let Some(name) = patch.name {
            current.name = name;
        }
        current.updated_at = now();

        self.repo.update_user(&current).await?;
        info!("Updated user");
        self.expand(current, true).await
    }

    /// Delete a user and every card they own
    #[instrument(name = "cardvault.users.delete", skip(self))]
    pub async fn delete(&self, id: &str) -> Result<Deleted> {
        self.require(id).await?;
        self.repo.delete_user(id).await?;
        info!("Deleted user");
        Ok(Deleted::new("User deleted successfully", id))
    }

    /// Load a user or fail with not-found
    pub async fn require(&self, id: &str) -> Result<User> {
        self.repo
            .get_user(id)
            .await?
            .ok_or_else(|| Error::not_found(USER_NOT_FOUND))
    }

    async fn expand(&self, user: User, include_cards: bool) -> Result<UserDetails> {
        if !include_cards {
            return Ok(UserDetails::bare(user));
        }
        let cards = self.repo.list_cards(Some(&user.id)).await?;
        Ok(UserDetails::with_cards(user, cards))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::CreditCard;

    fn service() -> (UserService, Arc<DuckDbRepository>) {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        (UserService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_create_requires_email() {
        let (service, _) = service();
        let err = service.create(NewUser::default()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Email is required"));

        let err = service
            .create(NewUser::new("", Some("Ana".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let (service, _) = service();
        let created = service
            .create(NewUser::new("ana@example.com", Some(String::new())))
            .await
            .unwrap();
        assert_eq!(created.credit_cards, Some(vec![]));
        assert_eq!(created.user.name, None);

        let err = service
            .create(NewUser::new("ana@example.com", None))
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Conflict(ref m) if m == "User with this email already exists")
        );
    }

    #[tokio::test]
    async fn test_update_email_rules() {
        let (service, _) = service();
        let ana = service.create(NewUser::new("ana@example.com", None)).await.unwrap();
        service.create(NewUser::new("bea@example.com", None)).await.unwrap();

        let taken = UserPatch {
            email: Some("bea@example.com".into()),
            name: None,
        };
        let err = service.update(&ana.user.id, taken).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(ref m) if m == "Email already in use"));

        let same = UserPatch {
            email: Some("ana@example.com".into()),
            name: Some(Some("Ana".into())),
        };
        let updated = service.update(&ana.user.id, same).await.unwrap();
        assert_eq!(updated.user.email, "ana@example.com");
        assert_eq!(updated.user.name.as_deref(), Some("Ana"));
        assert!(updated.user.updated_at >= updated.user.created_at);

        let clear = UserPatch {
            email: Some(String::new()),
            name: Some(None),
        };
        let cleared = service.update(&ana.user.id, clear).await.unwrap();
        assert_eq!(cleared.user.email, "ana@example.com");
        assert_eq!(cleared.user.name, None);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let (service, _) = service();
        for err in [
            service.get("nope", false).await.unwrap_err(),
            service.update("nope", UserPatch::default()).await.unwrap_err(),
            service.delete("nope").await.unwrap_err(),
        ] {
            assert!(matches!(err, Error::NotFound(ref m) if m == USER_NOT_FOUND));
        }
    }

    #[tokio::test]
    async fn test_delete_cascades_to_cards() {
        let (service, repo) = service();
        let ana = service.create(NewUser::new("ana@example.com", None)).await.unwrap();
        let card = CreditCard::new("4111111111111111", "Ana", "12/28", "123", Some(ana.user.id.clone()));
        repo.insert_card(&card).unwrap();

        let with_cards = service.get(&ana.user.id, true).await.unwrap();
        assert_eq!(with_cards.credit_cards.map(|c| c.len()), Some(1));

        let deleted = service.delete(&ana.user.id).await.unwrap();
        assert_eq!(deleted.message, "User deleted successfully");
        assert_eq!(deleted.id, ana.user.id);
        assert!(repo.list_cards(Some(&ana.user.id)).unwrap().is_empty());
        assert!(repo.get_card(&card.id).unwrap().is_none());
    }
}
