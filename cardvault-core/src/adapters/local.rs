//! In-process record store backed by a [`Repository`]

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::domain::{
    CardDetails, CardPatch, CardQuery, Deleted, ExpiryPolicy, NewCard, NewUser, UserDetails,
    UserPatch,
};
use crate::ports::{RecordStore, Repository};
use crate::services::{CardService, UserService};

/// Runs the card and user services directly against local storage
#[derive(Clone)]
pub struct LocalStore {
    users: UserService,
    cards: CardService,
}

impl LocalStore {
    pub fn new(repo: Arc<dyn Repository>, policy: ExpiryPolicy) -> Self {
        Self {
            users: UserService::new(Arc::clone(&repo)),
            cards: CardService::new(repo, policy),
        }
    }

    /// Open the DuckDB file at `db_path`, migrating it if needed
    pub fn open(db_path: &Path, policy: ExpiryPolicy) -> anyhow::Result<Self> {
        let repo = DuckDbRepository::new(db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        repo.ensure_schema()?;
        Ok(Self::new(Arc::new(repo), policy))
    }

    /// Store over a fresh in-memory database
    pub fn in_memory(policy: ExpiryPolicy) -> anyhow::Result<Self> {
        let repo = DuckDbRepository::open_in_memory()?;
        repo.ensure_schema()?;
        Ok(Self::new(Arc::new(repo), policy))
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn list_cards(&self, query: &CardQuery) -> Result<Vec<CardDetails>> {
        self.cards.list(query).await
    }

    async fn get_card(&self, id: &str, include_owner: bool) -> Result<CardDetails> {
        self.cards.get(id, include_owner).await
    }

    async fn create_card(&self, card: NewCard) -> Result<CardDetails> {
        self.cards.create(card).await
    }

    async fn update_card(&self, id: &str, patch: CardPatch) -> Result<CardDetails> {
        self.cards.update(id, patch).await
    }

    async fn delete_card(&self, id: &str) -> Result<Deleted> {
        self.cards.delete(id).await
    }

    async fn list_users(&self, include_cards: bool) -> Result<Vec<UserDetails>> {
        self.users.list(include_cards).await
    }

    async fn get_user(&self, id: &str, include_cards: bool) -> Result<UserDetails> {
        self.users.get(id, include_cards).await
    }

    async fn create_user(&self, user: NewUser) -> Result<UserDetails> {
        self.users.create(user).await
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<UserDetails> {
        self.users.update(id, patch).await
    }

    async fn delete_user(&self, id: &str) -> Result<Deleted> {
        self.users.delete(id).await
    }
}
