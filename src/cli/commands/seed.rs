//! Seed command handler

use std::sync::Arc;

use anyhow::Context;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    Argon2Hasher, AuthService, CredentialHasher, DesiredAdmin, Registration, SeaOrmAuthService,
    reconcile_with_retry,
};

const DEMO_USERNAME: &str = "john_doe";
const DEMO_EMAIL: &str = "john@example.com";
const DEMO_PASSWORD: &str = "password123";

pub async fn cmd_seed(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.database_url()).await?;
    let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new(&config.security)?);

    let desired = DesiredAdmin::from(&config.admin);
    let result = reconcile_with_retry(&store.user_store(), hasher.clone(), &desired)
        .await
        .context("Admin reconciliation failed")?;
    println!("✓ {}", result);

    if store.get_user_by_username(DEMO_USERNAME).await?.is_some() {
        println!("• Demo customer '{}' already exists", DEMO_USERNAME);
    } else {
        let auth = SeaOrmAuthService::new(
            store.clone(),
            hasher,
            config.security.min_password_length,
        );
        let user = auth
            .register(Registration {
                username: DEMO_USERNAME.to_string(),
                email: DEMO_EMAIL.to_string(),
                password: DEMO_PASSWORD.to_string(),
            })
            .await
            .context("Failed to create demo customer")?;
        println!("✓ Created demo customer '{}' (id {})", user.username, user.id);
    }

    println!();
    println!("Login credentials:");
    println!("  Admin:    {} / {}", desired.username, desired.secret);
    println!("  Customer: {} / {}", DEMO_USERNAME, DEMO_PASSWORD);

    Ok(())
}
