use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{categories, menu_items, orders};
use crate::models::order::{OrderDetail, OrderLine, OrderStatus, OrderSummary};
use crate::services::SeaOrmUserStore;

pub mod migrator;
pub mod repositories;

pub use repositories::menu::{MenuFilter, MenuItemPatch, NewMenuItem};
pub use repositories::order::OrderError;
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if let Some(path) = sqlite_file_path(db_url)
            && let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // In-memory SQLite lives only as long as its connection
        let (max_connections, min_connections) = if is_in_memory(db_url) {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt)
            .await
            .context("Failed to connect to database")?;

        migrator::Migrator::up(&conn, None)
            .await
            .context("Failed to apply migrations")?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Transactional user store consumed by the admin reconciler.
    #[must_use]
    pub fn user_store(&self) -> SeaOrmUserStore {
        SeaOrmUserStore::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn category_repo(&self) -> repositories::category::CategoryRepository {
        repositories::category::CategoryRepository::new(self.conn.clone())
    }

    fn menu_repo(&self) -> repositories::menu::MenuRepository {
        repositories::menu::MenuRepository::new(self.conn.clone())
    }

    fn order_repo(&self) -> repositories::order::OrderRepository {
        repositories::order::OrderRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo()
            .get_by_username_with_password(username)
            .await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        self.user_repo().email_exists(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn user_count(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
        is_admin: bool,
    ) -> Result<User> {
        self.user_repo()
            .create(username, email, password_hash, is_admin)
            .await
    }

    // ========== Categories ==========

    pub async fn list_categories(&self) -> Result<Vec<categories::Model>> {
        self.category_repo().list().await
    }

    pub async fn get_category(&self, id: i32) -> Result<Option<categories::Model>> {
        self.category_repo().get(id).await
    }

    pub async fn create_category(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<categories::Model> {
        self.category_repo().create(name, description).await
    }

    pub async fn update_category(
        &self,
        id: i32,
        name: Option<String>,
        description: Option<Option<String>>,
    ) -> Result<Option<categories::Model>> {
        self.category_repo().update(id, name, description).await
    }

    pub async fn delete_category(&self, id: i32) -> Result<bool> {
        self.category_repo().delete(id).await
    }

    // ========== Menu ==========

    pub async fn list_menu_items(&self, filter: &MenuFilter) -> Result<Vec<menu_items::Model>> {
        self.menu_repo().list(filter).await
    }

    pub async fn get_menu_item(&self, id: i32) -> Result<Option<menu_items::Model>> {
        self.menu_repo().get(id).await
    }

    pub async fn create_menu_item(&self, item: NewMenuItem) -> Result<menu_items::Model> {
        self.menu_repo().create(item).await
    }

    pub async fn update_menu_item(
        &self,
        id: i32,
        patch: MenuItemPatch,
    ) -> Result<Option<menu_items::Model>> {
        self.menu_repo().update(id, patch).await
    }

    pub async fn menu_item_is_ordered(&self, id: i32) -> Result<bool> {
        self.menu_repo().is_ordered(id).await
    }

    pub async fn delete_menu_item(&self, id: i32) -> Result<bool> {
        self.menu_repo().delete(id).await
    }

    pub async fn menu_item_count(&self) -> Result<u64> {
        self.menu_repo().count().await
    }

    // ========== Orders ==========

    pub async fn list_orders(&self) -> Result<Vec<OrderSummary>> {
        self.order_repo().list().await
    }

    pub async fn list_orders_for_user(&self, user_id: i32) -> Result<Vec<OrderSummary>> {
        self.order_repo().list_for_user(user_id).await
    }

    pub async fn get_order(&self, id: i32) -> Result<Option<OrderDetail>> {
        self.order_repo().get(id).await
    }

    pub async fn create_order(
        &self,
        user_id: i32,
        lines: &[OrderLine],
    ) -> std::result::Result<OrderDetail, OrderError> {
        self.order_repo().create(user_id, lines).await
    }

    pub async fn update_order_status(
        &self,
        id: i32,
        status: OrderStatus,
    ) -> Result<Option<orders::Model>> {
        self.order_repo().update_status(id, status).await
    }

    pub async fn delete_order(&self, id: i32) -> Result<bool> {
        self.order_repo().delete(id).await
    }

    pub async fn order_count(&self) -> Result<u64> {
        self.order_repo().count().await
    }

    pub async fn order_count_with_status(&self, status: OrderStatus) -> Result<u64> {
        self.order_repo().count_with_status(status).await
    }

    pub async fn revenue(&self) -> Result<f64> {
        self.order_repo().revenue().await
    }
}

fn is_in_memory(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

/// File path of a `sqlite:` URL, `None` for in-memory or non-sqlite URLs.
fn sqlite_file_path(db_url: &str) -> Option<&str> {
    if is_in_memory(db_url) {
        return None;
    }

    let rest = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty()).then_some(path)
}
