//! Create-admin command handler

use std::sync::Arc;

use anyhow::Context;

use crate::cli::AdminArgs;
use crate::config::{AdminConfig, Config};
use crate::db::Store;
use crate::services::{Argon2Hasher, CredentialHasher, DesiredAdmin, reconcile_with_retry};

fn desired_admin(admin: &AdminConfig, args: AdminArgs) -> DesiredAdmin {
    DesiredAdmin::new(
        args.username.unwrap_or_else(|| admin.username.clone()),
        args.email.unwrap_or_else(|| admin.email.clone()),
        args.password.unwrap_or_else(|| admin.password.clone()),
    )
    .with_reset_email(args.reset_email || admin.reset_email)
}

pub async fn cmd_create_admin(config: &Config, args: AdminArgs) -> anyhow::Result<()> {
    let desired = desired_admin(&config.admin, args);

    let store = Store::new(&config.database_url()).await?;
    let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new(&config.security)?);

    let result = reconcile_with_retry(&store.user_store(), hasher, &desired)
        .await
        .context("Admin reconciliation failed")?;

    println!("✓ {}", result);
    println!("  Username: {}", desired.username);
    println!("  Email:    {}", desired.email);
    if !desired.reset_email {
        println!("  (existing email kept; pass --reset-email to overwrite it)");
    }

    Ok(())
}
