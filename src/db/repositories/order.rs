use crate::entities::{menu_items, order_items, orders, prelude::*, users};
use crate::models::order::{
    OrderDetail, OrderLine, OrderLineDetail, OrderStatus, OrderSummary, round_cents,
};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use thiserror::Error;
use tracing::info;

/// Rejections raised while placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    Empty,

    #[error("Invalid quantity {quantity} for menu item {menu_item_id}")]
    InvalidQuantity { menu_item_id: i32, quantity: i32 },

    #[error("User {0} not found")]
    UserNotFound(i32),

    #[error("Menu item {0} not found")]
    MenuItemNotFound(i32),

    #[error("Menu item {0} is not available")]
    MenuItemUnavailable(i32),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct OrderRepository {
    conn: DatabaseConnection,
}

impl OrderRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn summarize(order: orders::Model, user: Option<users::Model>) -> OrderSummary {
        OrderSummary {
            id: order.id,
            user_id: order.user_id,
            username: user.map(|u| u.username).unwrap_or_default(),
            total_amount: order.total_amount,
            status: order.status,
            created_at: order.created_at,
        }
    }

    pub async fn list(&self) -> Result<Vec<OrderSummary>> {
        let rows = Orders::find()
            .find_also_related(Users)
            .order_by_desc(orders::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order, user)| Self::summarize(order, user))
            .collect())
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<OrderSummary>> {
        let rows = Orders::find()
            .filter(orders::Column::UserId.eq(user_id))
            .find_also_related(Users)
            .order_by_desc(orders::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order, user)| Self::summarize(order, user))
            .collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<OrderDetail>> {
        let Some((order, user)) = Orders::find_by_id(id)
            .find_also_related(Users)
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let lines = OrderItems::find()
            .filter(order_items::Column::OrderId.eq(id))
            .find_also_related(MenuItems)
            .order_by_asc(order_items::Column::Id)
            .all(&self.conn)
            .await?;

        let items = lines
            .into_iter()
            .map(|(line, item)| OrderLineDetail {
                menu_item_id: line.menu_item_id,
                name: item.map(|i| i.name).unwrap_or_default(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();

        Ok(Some(OrderDetail {
            summary: Self::summarize(order, user),
            items,
        }))
    }

    /// Prices every line from the current menu and writes the order and its
    /// lines in one transaction.
    pub async fn create(
        &self,
        user_id: i32,
        lines: &[OrderLine],
    ) -> std::result::Result<OrderDetail, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::Empty);
        }

        if let Some(bad) = lines.iter().find(|l| l.quantity < 1) {
            return Err(OrderError::InvalidQuantity {
                menu_item_id: bad.menu_item_id,
                quantity: bad.quantity,
            });
        }

        let txn = self.conn.begin().await?;

        let user = Users::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or(OrderError::UserNotFound(user_id))?;

        let mut total = 0.0;
        let mut priced: Vec<(menu_items::Model, i32)> = Vec::with_capacity(lines.len());
        for line in lines {
            let item = MenuItems::find_by_id(line.menu_item_id)
                .one(&txn)
                .await?
                .ok_or(OrderError::MenuItemNotFound(line.menu_item_id))?;

            if !item.available {
                return Err(OrderError::MenuItemUnavailable(item.id));
            }

            total += item.price * f64::from(line.quantity);
            priced.push((item, line.quantity));
        }

        let order = orders::ActiveModel {
            user_id: Set(user.id),
            total_amount: Set(round_cents(total)),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let models: Vec<order_items::ActiveModel> = priced
            .iter()
            .map(|(item, quantity)| order_items::ActiveModel {
                order_id: Set(order.id),
                menu_item_id: Set(item.id),
                quantity: Set(*quantity),
                unit_price: Set(item.price),
                ..Default::default()
            })
            .collect();

        OrderItems::insert_many(models).exec(&txn).await?;

        txn.commit().await?;

        info!(
            order_id = order.id,
            user_id = user.id,
            total = order.total_amount,
            "Order placed"
        );

        let items = priced
            .into_iter()
            .map(|(item, quantity)| OrderLineDetail {
                menu_item_id: item.id,
                name: item.name,
                quantity,
                unit_price: item.price,
            })
            .collect();

        Ok(OrderDetail {
            summary: Self::summarize(order, Some(user)),
            items,
        })
    }

    pub async fn update_status(
        &self,
        id: i32,
        status: OrderStatus,
    ) -> Result<Option<orders::Model>> {
        let Some(existing) = Orders::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: orders::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        Ok(Some(active.update(&self.conn).await?))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        OrderItems::delete_many()
            .filter(order_items::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;

        let result = Orders::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Orders::find().count(&self.conn).await?)
    }

    pub async fn count_with_status(&self, status: OrderStatus) -> Result<u64> {
        Ok(Orders::find()
            .filter(orders::Column::Status.eq(status.as_str()))
            .count(&self.conn)
            .await?)
    }

    /// Sum of all non-cancelled order totals.
    pub async fn revenue(&self) -> Result<f64> {
        let amounts: Vec<f64> = Orders::find()
            .select_only()
            .column(orders::Column::TotalAmount)
            .filter(orders::Column::Status.ne(OrderStatus::Cancelled.as_str()))
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(round_cents(amounts.into_iter().sum()))
    }
}
