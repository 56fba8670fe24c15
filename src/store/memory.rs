use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, EMAIL_TAKEN};
use crate::models::{NewTransaction, NewUser, Transaction, UpdateProfile, UpdateTransaction, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    transactions: HashMap<Uuid, Transaction>,
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: Uuid, update: UpdateProfile) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &update.email {
            if tables.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        tables.transactions.retain(|_, t| t.user_id != id);
        Ok(tables.users.remove(&id).is_some())
    }

    async fn create_transaction(&self, owner: Uuid, transaction: NewTransaction) -> StoreResult<Transaction> {
        let now = Utc::now();
        let created = Transaction {
            id: Uuid::new_v4(),
            user_id: owner,
            kind: transaction.kind,
            category: transaction.category,
            amount: transaction.amount,
            date: transaction.date,
            description: transaction.description,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .transactions
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_transactions(&self, owner: Uuid) -> StoreResult<Vec<Transaction>> {
        let tables = self.tables.read().await;
        let mut transactions: Vec<Transaction> = tables
            .transactions
            .values()
            .filter(|t| t.user_id == owner)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(transactions)
    }

    async fn update_transaction(
        &self,
        owner: Uuid,
        id: Uuid,
        update: UpdateTransaction,
    ) -> StoreResult<Option<Transaction>> {
        let mut tables = self.tables.write().await;
        let Some(transaction) = tables.transactions.get_mut(&id).filter(|t| t.user_id == owner) else {
            return Ok(None);
        };
        update.apply_to(transaction);
        transaction.updated_at = Utc::now();
        Ok(Some(transaction.clone()))
    }

    async fn delete_transaction(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .transactions
            .get(&id)
            .map(|t| t.user_id == owner)
            .unwrap_or(false);
        if owned {
            tables.transactions.remove(&id);
        }
        Ok(owned)
    }
}
