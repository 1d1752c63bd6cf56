//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use sea_orm::{DbErr, SqlErr};
use std::sync::Arc;
use tracing::info;

use crate::db::{Store, User};
use crate::models::account::{validate_email, validate_username};
use crate::services::auth_service::{AuthError, AuthService, Registration};
use crate::services::credentials::{CredentialHasher, hash_blocking, verify_blocking};

pub struct SeaOrmAuthService {
    store: Store,
    hasher: Arc<dyn CredentialHasher>,
    min_password_length: usize,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, hasher: Arc<dyn CredentialHasher>, min_password_length: usize) -> Self {
        Self {
            store,
            hasher,
            min_password_length,
        }
    }

    fn validate(&self, registration: &Registration) -> Result<(), AuthError> {
        validate_username(&registration.username).map_err(AuthError::Validation)?;
        validate_email(&registration.email).map_err(AuthError::Validation)?;

        if registration.password.chars().count() < self.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        self.validate(&registration)?;

        if self
            .store
            .get_user_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }
        if self.store.email_exists(&registration.email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_blocking(Arc::clone(&self.hasher), &registration.password).await?;

        // A concurrent registration can still win between the checks and the insert.
        let user = match self
            .store
            .create_user(
                &registration.username,
                &registration.email,
                password_hash,
                false,
            )
            .await
        {
            Ok(user) => user,
            Err(err) => {
                let unique = err
                    .downcast_ref::<DbErr>()
                    .and_then(DbErr::sql_err)
                    .is_some_and(|e| matches!(e, SqlErr::UniqueConstraintViolation(_)));
                if unique {
                    return Err(AuthError::UsernameTaken);
                }
                return Err(err.into());
            }
        };

        info!(user_id = user.id, username = %user.username, "Registered new user");
        Ok(user)
    }

    async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let Some((user, password_hash)) = self
            .store
            .get_user_by_username_with_password(username)
            .await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        let valid = verify_blocking(Arc::clone(&self.hasher), password, &password_hash)
            .await
            .unwrap_or(false);

        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    async fn get_user(&self, id: i32) -> Result<User, AuthError> {
        self.store.get_user(id).await?.ok_or(AuthError::UserNotFound)
    }
}
