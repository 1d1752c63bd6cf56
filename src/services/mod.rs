pub mod credentials;
pub use credentials::{Argon2Hasher, CredentialHasher, HashError};

pub mod user_store;
pub use user_store::{CredentialUpdate, NewUser, StoreError, StoredUser, UserStore, UserTransaction};

pub mod user_store_impl;
pub use user_store_impl::SeaOrmUserStore;

pub mod memory_user_store;
pub use memory_user_store::MemoryUserStore;

pub mod admin_reconciler;
pub use admin_reconciler::{
    AdminReconciler, DesiredAdmin, ReconcileError, ReconcileResult, reconcile,
    reconcile_with_retry,
};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, Registration};
pub use auth_service_impl::SeaOrmAuthService;
