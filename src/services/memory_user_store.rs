//! In-memory `UserStore` for tests and tooling.
//!
//! A transaction holds the store lock from `begin` until commit or drop, so
//! transactions are fully serialized. Writes are staged on a copy and only
//! published on commit.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::services::user_store::{
    CredentialUpdate, NewUser, StoreError, StoredUser, UserStore, UserTransaction,
};

#[derive(Debug, Clone, Default)]
struct Records {
    next_id: i32,
    users: BTreeMap<i32, StoredUser>,
}

impl Records {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    records: Arc<Mutex<Records>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads records without checking uniqueness, to model data written
    /// before the constraint existed.
    pub async fn seed_unchecked(&self, users: impl IntoIterator<Item = NewUser>) -> Vec<i32> {
        let mut records = self.records.lock().await;
        users
            .into_iter()
            .map(|user| {
                let id = records.allocate_id();
                records.users.insert(
                    id,
                    StoredUser {
                        id,
                        username: user.username,
                        email: user.email,
                        password_hash: user.password_hash,
                        is_admin: user.is_admin,
                    },
                );
                id
            })
            .collect()
    }

    /// Committed records, ordered by id.
    pub async fn snapshot(&self) -> Vec<StoredUser> {
        self.records.lock().await.users.values().cloned().collect()
    }

    pub async fn users_named(&self, username: &str) -> Vec<StoredUser> {
        self.snapshot()
            .await
            .into_iter()
            .filter(|u| u.username == username)
            .collect()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, StoreError> {
        let guard = Arc::clone(&self.records).lock_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(MemoryUserTransaction { guard, staged }))
    }
}

struct MemoryUserTransaction {
    guard: OwnedMutexGuard<Records>,
    staged: Records,
}

#[async_trait]
impl UserTransaction for MemoryUserTransaction {
    async fn find_by_username(&mut self, username: &str) -> Result<Vec<StoredUser>, StoreError> {
        Ok(self
            .staged
            .users
            .values()
            .filter(|u| u.username == username)
            .cloned()
            .collect())
    }

    async fn insert(&mut self, user: NewUser) -> Result<StoredUser, StoreError> {
        if self
            .staged
            .users
            .values()
            .any(|u| u.username == user.username)
        {
            return Err(StoreError::UniqueViolation(format!(
                "username '{}' already exists",
                user.username
            )));
        }

        let id = self.staged.allocate_id();
        let stored = StoredUser {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
        };
        self.staged.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_credentials(
        &mut self,
        id: i32,
        update: CredentialUpdate,
    ) -> Result<(), StoreError> {
        let user = self
            .staged
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("user {id} does not exist")))?;

        user.password_hash = update.password_hash;
        user.is_admin = update.is_admin;
        if let Some(email) = update.email {
            user.email = email;
        }
        Ok(())
    }

    async fn delete(&mut self, ids: &[i32]) -> Result<u64, StoreError> {
        let removed = ids
            .iter()
            .filter(|id| self.staged.users.remove(*id).is_some())
            .count();
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
