//! Persistence for users and their transactions.
//!
//! Handlers only see the [`Store`] trait. [`PgStore`] is the production
//! backend; [`MemoryStore`] keeps everything in process for tests and local
//! demos.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewTransaction, NewUser, Transaction, UpdateProfile, UpdateTransaction, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule was violated, e.g. a second account for one email.
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Every transaction query is scoped by owner: a transaction id alone never
/// reaches another user's data.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, id: Uuid, update: UpdateProfile) -> StoreResult<Option<User>>;
    /// Removes the user together with all of their transactions.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    async fn create_transaction(&self, owner: Uuid, transaction: NewTransaction) -> StoreResult<Transaction>;
    /// Newest first: by date, then by creation time.
    async fn list_transactions(&self, owner: Uuid) -> StoreResult<Vec<Transaction>>;
    async fn update_transaction(
        &self,
        owner: Uuid,
        id: Uuid,
        update: UpdateTransaction,
    ) -> StoreResult<Option<Transaction>>;
    async fn delete_transaction(&self, owner: Uuid, id: Uuid) -> StoreResult<bool>;
}

pub(crate) const EMAIL_TAKEN: &str = "User already exists";
