//! User Store
//!
//! Persistence contract used by the workflow, with a PostgreSQL
//! implementation and an in-memory one.

use crate::error::AuthError;
use crate::models::{NewUser, User};

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lookup, insert and password update of user records keyed by email
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by exact email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Insert a new user, assigning its id.
    ///
    /// Fails with [`AuthError::DuplicateEmail`] if the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, AuthError>;

    /// Overwrite a user's password hash
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AuthError>;
}

// ============================================
// PostgreSQL
// ============================================

/// User store backed by the `users` table
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the `users` table and its role type if they do not exist
    pub async fn run_migrations(&self) -> Result<(), AuthError> {
        tracing::info!("Running user table migrations");

        sqlx::query(
            r#"
            DO $$ BEGIN
                CREATE TYPE user_role AS ENUM ('user', 'admin');
            EXCEPTION
                WHEN duplicate_object THEN null;
            END $$;
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                password VARCHAR(255) NOT NULL,
                role user_role NOT NULL DEFAULT 'user'
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        tracing::info!("User table migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        // A unique violation here maps to DuplicateEmail via From<sqlx::Error>.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password, role
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }

        Ok(())
    }
}

// ============================================
// In-memory
// ============================================

/// Process-local user store, keyed by email
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(AuthError::DuplicateEmail);
        }

        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        };
        users.insert(user.email.clone(), user.clone());

        Ok(user)
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::UserNotFound)?;

        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "A".to_string(),
            email: email.to_string(),
            password_hash: "hash-1".to_string(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a@x.com")).await.unwrap();

        let found = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, UserRole::User);
        assert!(store.find_by_email("A@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        let first = store.insert(new_user("a@x.com")).await.unwrap();

        let mut second = new_user("a@x.com");
        second.password_hash = "hash-2".to_string();
        assert!(matches!(
            store.insert(second).await,
            Err(AuthError::DuplicateEmail)
        ));

        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.password_hash, "hash-1");
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts() {
        let store = Arc::new(MemoryUserStore::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.insert(new_user("race@x.com")).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_password() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a@x.com")).await.unwrap();

        store.update_password(user.id, "hash-2").await.unwrap();
        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hash-2");

        assert!(matches!(
            store.update_password(Uuid::new_v4(), "hash-3").await,
            Err(AuthError::UserNotFound)
        ));
    }
}
