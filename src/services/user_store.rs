//! Transactional user persistence used by the admin reconciler.
//!
//! A store only has to offer keyed lookup by username, insert, update and
//! delete inside a transaction, and must reject a second record with an
//! existing username. Dropping a [`UserTransaction`] without calling
//! [`UserTransaction::commit`] discards every staged write.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("User store unavailable: {0}")]
    Unavailable(String),

    /// Another writer held the store's write lock past the wait timeout.
    #[error("User store busy: {0}")]
    Busy(String),

    /// An insert or update collided with the username uniqueness constraint.
    #[error("Uniqueness constraint violated: {0}")]
    UniqueViolation(String),

    #[error("User store error: {0}")]
    Backend(String),
}

/// A user record as persisted, including its password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct CredentialUpdate {
    pub password_hash: String,
    pub is_admin: bool,
    /// `None` keeps the stored email.
    pub email: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, StoreError>;
}

#[async_trait]
pub trait UserTransaction: Send {
    /// Every record with this username, ordered by id.
    async fn find_by_username(&mut self, username: &str) -> Result<Vec<StoredUser>, StoreError>;

    async fn insert(&mut self, user: NewUser) -> Result<StoredUser, StoreError>;

    async fn update_credentials(
        &mut self,
        id: i32,
        update: CredentialUpdate,
    ) -> Result<(), StoreError>;

    /// Returns the number of rows removed.
    async fn delete(&mut self, ids: &[i32]) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
