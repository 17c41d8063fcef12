//! Repository port - database abstraction

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{CreditCard, User};

/// Database repository abstraction
///
/// Plain storage of users and cards. Existence checks, email uniqueness and
/// validation belong to the services; implementations only persist what
/// they are given.
#[async_trait]
pub trait Repository: Send + Sync {
    // === Schema ===

    /// Run any pending migrations
    async fn ensure_schema_upgraded(&self) -> Result<()>;

    // === Users ===

    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Find a user by exact email
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users, newest first
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Overwrite every mutable column of an existing user
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Delete a user and every card they own
    async fn delete_user(&self, id: &str) -> Result<()>;

    // === Cards ===

    async fn insert_card(&self, card: &CreditCard) -> Result<()>;

    async fn get_card(&self, id: &str) -> Result<Option<CreditCard>>;

    /// Cards newest first, optionally only those owned by `user_id`
    async fn list_cards(&self, user_id: Option<&str>) -> Result<Vec<CreditCard>>;

    /// Overwrite every mutable column of an existing card
    async fn update_card(&self, card: &CreditCard) -> Result<()>;

    async fn delete_card(&self, id: &str) -> Result<()>;
}
