use async_trait::async_trait;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, EMAIL_TAKEN};
use crate::database::Database;
use crate::models::{NewTransaction, NewUser, Transaction, UpdateProfile, UpdateTransaction, User};

const TRANSACTION_COLUMNS: &str =
    "id, user_id, kind, category, amount, date, description, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn map_unique(err: sqlx::Error) -> StoreError {
    let unique = err
        .as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false);
    if unique {
        StoreError::Conflict(EMAIL_TAKEN.to_string())
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, update: UpdateProfile) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.email)
        .fetch_optional(&self.db)
        .await
        .map_err(map_unique)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        // transactions.user_id cascades
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_transaction(&self, owner: Uuid, transaction: NewTransaction) -> StoreResult<Transaction> {
        let query = format!(
            "INSERT INTO transactions (id, user_id, kind, category, amount, date, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            TRANSACTION_COLUMNS
        );
        let created = sqlx::query_as::<_, Transaction>(&query)
            .bind(Uuid::new_v4())
            .bind(owner)
            .bind(transaction.kind)
            .bind(&transaction.category)
            .bind(transaction.amount)
            .bind(transaction.date)
            .bind(&transaction.description)
            .fetch_one(&self.db)
            .await?;
        Ok(created)
    }

    async fn list_transactions(&self, owner: Uuid) -> StoreResult<Vec<Transaction>> {
        let query = format!(
            "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY date DESC, created_at DESC",
            TRANSACTION_COLUMNS
        );
        let transactions = sqlx::query_as::<_, Transaction>(&query)
            .bind(owner)
            .fetch_all(&self.db)
            .await?;
        Ok(transactions)
    }

    async fn update_transaction(
        &self,
        owner: Uuid,
        id: Uuid,
        update: UpdateTransaction,
    ) -> StoreResult<Option<Transaction>> {
        let query = format!(
            r#"
            UPDATE transactions
            SET kind = COALESCE($3, kind),
                category = COALESCE($4, category),
                amount = COALESCE($5, amount),
                date = COALESCE($6, date),
                description = CASE WHEN $7::text IS NULL THEN description ELSE NULLIF($7, '') END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        );
        let updated = sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .bind(owner)
            .bind(update.kind)
            .bind(update.category)
            .bind(update.amount)
            .bind(update.date)
            .bind(update.description)
            .fetch_optional(&self.db)
            .await?;
        Ok(updated)
    }

    async fn delete_transaction(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
