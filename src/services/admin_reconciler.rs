//! Brings the administrative account to a known-good state.
//!
//! Whatever the store holds for the bootstrap username (nothing, one record,
//! or several left behind by earlier inconsistent writes), a successful
//! reconciliation leaves exactly one record with that username, flagged as
//! admin, whose hash verifies against the bootstrap secret. Every branch runs
//! in a single store transaction.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AdminConfig;
use crate::models::account::{validate_email, validate_username};
use crate::services::credentials::{CredentialHasher, HashError, hash_blocking};
use crate::services::user_store::{CredentialUpdate, NewUser, StoreError, UserStore};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("User store unavailable: {0}")]
    StoreUnavailable(String),

    /// A concurrent writer kept the store locked past its wait timeout.
    #[error("User store busy with a concurrent writer: {0}")]
    StoreBusy(String),

    /// Another writer created the username between our lookup and insert.
    #[error("Username constraint violated by a concurrent writer: {0}")]
    ConstraintViolation(String),

    #[error("User store error: {0}")]
    Store(String),

    #[error(transparent)]
    Hashing(#[from] HashError),
}

impl ReconcileError {
    /// Whether the caller may retry the whole reconciliation.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::StoreBusy(_) | Self::ConstraintViolation(_)
        )
    }
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Busy(msg) => Self::StoreBusy(msg),
            StoreError::UniqueViolation(msg) => Self::ConstraintViolation(msg),
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileResult {
    Created {
        user_id: i32,
    },
    Updated {
        user_id: i32,
    },
    /// Duplicate records were collapsed into one fresh record.
    Reconciled {
        user_id: i32,
        duplicates_removed: usize,
    },
}

impl ReconcileResult {
    #[must_use]
    pub const fn user_id(&self) -> i32 {
        match self {
            Self::Created { user_id }
            | Self::Updated { user_id }
            | Self::Reconciled { user_id, .. } => *user_id,
        }
    }
}

impl fmt::Display for ReconcileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { user_id } => write!(f, "created admin account (id {user_id})"),
            Self::Updated { user_id } => write!(f, "updated admin account (id {user_id})"),
            Self::Reconciled {
                user_id,
                duplicates_removed,
            } => write!(
                f,
                "reconciled admin account (id {user_id}), removed {duplicates_removed} duplicate(s)"
            ),
        }
    }
}

/// Bootstrap credentials the store is reconciled towards.
#[derive(Clone)]
pub struct DesiredAdmin {
    pub username: String,
    pub email: String,
    pub secret: String,
    /// Overwrite the email of an existing record instead of preserving it.
    pub reset_email: bool,
}

impl fmt::Debug for DesiredAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesiredAdmin")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("secret", &"<redacted>")
            .field("reset_email", &self.reset_email)
            .finish()
    }
}

impl DesiredAdmin {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            secret: secret.into(),
            reset_email: false,
        }
    }

    #[must_use]
    pub const fn with_reset_email(mut self, reset_email: bool) -> Self {
        self.reset_email = reset_email;
        self
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        validate_username(&self.username).map_err(ReconcileError::Validation)?;
        validate_email(&self.email).map_err(ReconcileError::Validation)?;
        if self.secret.is_empty() {
            return Err(ReconcileError::Validation(
                "Admin secret cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn new_user(&self, password_hash: String) -> NewUser {
        NewUser {
            username: self.username.clone(),
            email: self.email.clone(),
            password_hash,
            is_admin: true,
        }
    }
}

impl From<&AdminConfig> for DesiredAdmin {
    fn from(config: &AdminConfig) -> Self {
        Self::new(&config.username, &config.email, &config.password)
            .with_reset_email(config.reset_email)
    }
}

/// Runs one reconciliation against `store`.
///
/// The secret is hashed before the transaction opens. Any error drops the
/// transaction uncommitted, leaving the previous state in place.
pub async fn reconcile(
    store: &dyn UserStore,
    hasher: Arc<dyn CredentialHasher>,
    desired: &DesiredAdmin,
) -> Result<ReconcileResult, ReconcileError> {
    desired.validate()?;

    let password_hash = hash_blocking(hasher, &desired.secret).await?;

    let mut txn = store.begin().await?;
    let matches = txn.find_by_username(&desired.username).await?;

    let result = match matches.as_slice() {
        [] => {
            let user = txn.insert(desired.new_user(password_hash)).await?;
            ReconcileResult::Created { user_id: user.id }
        }
        [existing] => {
            let update = CredentialUpdate {
                password_hash,
                is_admin: true,
                email: desired.reset_email.then(|| desired.email.clone()),
            };
            txn.update_credentials(existing.id, update).await?;
            ReconcileResult::Updated {
                user_id: existing.id,
            }
        }
        duplicates => {
            let ids: Vec<i32> = duplicates.iter().map(|u| u.id).collect();
            warn!(
                username = %desired.username,
                count = ids.len(),
                "Found duplicate admin records, collapsing"
            );
            txn.delete(&ids).await?;
            let user = txn.insert(desired.new_user(password_hash)).await?;
            ReconcileResult::Reconciled {
                user_id: user.id,
                duplicates_removed: ids.len() - 1,
            }
        }
    };

    txn.commit().await?;

    info!(username = %desired.username, outcome = %result, "Admin account reconciled");
    Ok(result)
}

/// Like [`reconcile`], retrying once if a concurrent writer won the create
/// or held the store lock for too long.
pub async fn reconcile_with_retry(
    store: &dyn UserStore,
    hasher: Arc<dyn CredentialHasher>,
    desired: &DesiredAdmin,
) -> Result<ReconcileResult, ReconcileError> {
    match reconcile(store, Arc::clone(&hasher), desired).await {
        Err(ReconcileError::ConstraintViolation(detail) | ReconcileError::StoreBusy(detail)) => {
            warn!(%detail, "Admin reconciliation lost a race, retrying once");
            reconcile(store, hasher, desired).await
        }
        other => other,
    }
}

/// Store and hasher bundled for callers that reconcile repeatedly.
#[derive(Clone)]
pub struct AdminReconciler {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AdminReconciler {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    pub async fn reconcile(&self, desired: &DesiredAdmin) -> Result<ReconcileResult, ReconcileError> {
        reconcile_with_retry(self.store.as_ref(), Arc::clone(&self.hasher), desired).await
    }
}
