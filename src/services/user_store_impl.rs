//! `SeaORM` implementation of the `UserStore` trait.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};

use crate::entities::{prelude::*, users};
use crate::services::user_store::{
    CredentialUpdate, NewUser, StoreError, StoredUser, UserStore, UserTransaction,
};

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return Self::UniqueViolation(detail);
        }

        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::Unavailable(err.to_string()),
            other => {
                let message = other.to_string();
                // SQLITE_BUSY surfaces as a query error rather than a connection error
                if message.contains("database is locked") {
                    Self::Busy(message)
                } else {
                    Self::Backend(message)
                }
            }
        }
    }
}

impl From<users::Model> for StoredUser {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            password_hash: model.password_hash,
            is_admin: model.is_admin,
        }
    }
}

#[derive(Clone)]
pub struct SeaOrmUserStore {
    conn: DatabaseConnection,
}

impl SeaOrmUserStore {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UserStore for SeaOrmUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, StoreError> {
        let txn = self.conn.begin().await?;

        // SQLite opens transactions deferred: two readers that both find no
        // admin would then fail to upgrade to a write lock with SQLITE_BUSY.
        // Writing first takes the lock up front, so a concurrent reconcile
        // waits on the busy timeout and then reads the committed row.
        if txn.get_database_backend() == DatabaseBackend::Sqlite {
            txn.execute_unprepared("UPDATE users SET id = id WHERE id IS NULL")
                .await?;
        }

        Ok(Box::new(SeaOrmUserTransaction { txn }))
    }
}

struct SeaOrmUserTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl UserTransaction for SeaOrmUserTransaction {
    async fn find_by_username(&mut self, username: &str) -> Result<Vec<StoredUser>, StoreError> {
        let rows = Users::find()
            .filter(users::Column::Username.eq(username))
            .order_by_asc(users::Column::Id)
            .all(&self.txn)
            .await?;

        Ok(rows.into_iter().map(StoredUser::from).collect())
    }

    async fn insert(&mut self, user: NewUser) -> Result<StoredUser, StoreError> {
        let result = Users::insert(users::ActiveModel {
            username: Set(user.username),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            is_admin: Set(user.is_admin),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        })
        .exec(&self.txn)
        .await?;

        let model = Users::find_by_id(result.last_insert_id)
            .one(&self.txn)
            .await?
            .ok_or_else(|| StoreError::Backend("Inserted user could not be read back".into()))?;

        Ok(StoredUser::from(model))
    }

    async fn update_credentials(
        &mut self,
        id: i32,
        update: CredentialUpdate,
    ) -> Result<(), StoreError> {
        let mut active = users::ActiveModel {
            id: Set(id),
            password_hash: Set(update.password_hash),
            is_admin: Set(update.is_admin),
            ..Default::default()
        };
        if let Some(email) = update.email {
            active.email = Set(email);
        }

        Users::update(active).exec(&self.txn).await?;
        Ok(())
    }

    async fn delete(&mut self, ids: &[i32]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Users::delete_many()
            .filter(users::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.txn)
            .await?;

        Ok(result.rows_affected)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await?;
        Ok(())
    }
}
