//! Record store port - the client-facing storage interface
//!
//! Both the in-process store and the HTTP client implement this trait, so
//! callers (the CLI, the REST server) never know which backend they talk to.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{
    CardDetails, CardPatch, CardQuery, Deleted, NewCard, NewUser, UserDetails, UserPatch,
};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for display, e.g. `local`
    fn backend(&self) -> &'static str;

    // === Cards ===

    /// Cards newest first; owners are embedded when `query.include_owner`
    async fn list_cards(&self, query: &CardQuery) -> Result<Vec<CardDetails>>;

    async fn get_card(&self, id: &str, include_owner: bool) -> Result<CardDetails>;

    /// Create a card; the result always embeds the owner (or `null`)
    async fn create_card(&self, card: NewCard) -> Result<CardDetails>;

    async fn update_card(&self, id: &str, patch: CardPatch) -> Result<CardDetails>;

    async fn delete_card(&self, id: &str) -> Result<Deleted>;

    // === Users ===

    async fn list_users(&self, include_cards: bool) -> Result<Vec<UserDetails>>;

    async fn get_user(&self, id: &str, include_cards: bool) -> Result<UserDetails>;

    /// Create a user; the result embeds an empty card list
    async fn create_user(&self, user: NewUser) -> Result<UserDetails>;

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<UserDetails>;

    /// Delete a user together with their cards
    async fn delete_user(&self, id: &str) -> Result<Deleted>;
}
