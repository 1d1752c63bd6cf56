use crate::entities::{menu_items, order_items, prelude::*};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

#[derive(Debug, Default, Clone)]
pub struct MenuFilter {
    pub category_id: Option<i32>,
    pub available: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: i32,
    pub image_url: Option<String>,
    pub available: bool,
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Default, Clone)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<i32>,
    pub image_url: Option<Option<String>>,
    pub available: Option<bool>,
}

pub struct MenuRepository {
    conn: DatabaseConnection,
}

impl MenuRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, filter: &MenuFilter) -> Result<Vec<menu_items::Model>> {
        let mut query = MenuItems::find().order_by_asc(menu_items::Column::Id);

        if let Some(category_id) = filter.category_id {
            query = query.filter(menu_items::Column::CategoryId.eq(category_id));
        }

        if let Some(available) = filter.available {
            query = query.filter(menu_items::Column::Available.eq(available));
        }

        if let Some(term) = filter.search.as_deref().map(str::trim)
            && !term.is_empty()
        {
            query = query.filter(
                Condition::any()
                    .add(menu_items::Column::Name.contains(term))
                    .add(menu_items::Column::Description.contains(term)),
            );
        }

        Ok(query.all(&self.conn).await?)
    }

    pub async fn get(&self, id: i32) -> Result<Option<menu_items::Model>> {
        Ok(MenuItems::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn create(&self, item: NewMenuItem) -> Result<menu_items::Model> {
        Ok(menu_items::ActiveModel {
            name: Set(item.name),
            description: Set(item.description),
            price: Set(item.price),
            category_id: Set(item.category_id),
            image_url: Set(item.image_url),
            available: Set(item.available),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?)
    }

    pub async fn update(&self, id: i32, patch: MenuItemPatch) -> Result<Option<menu_items::Model>> {
        let Some(existing) = MenuItems::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: menu_items::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(price) = patch.price {
            active.price = Set(price);
        }
        if let Some(category_id) = patch.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(image_url) = patch.image_url {
            active.image_url = Set(image_url);
        }
        if let Some(available) = patch.available {
            active.available = Set(available);
        }

        Ok(Some(active.update(&self.conn).await?))
    }

    /// Whether any order line references the item.
    pub async fn is_ordered(&self, id: i32) -> Result<bool> {
        let count = OrderItems::find()
            .filter(order_items::Column::MenuItemId.eq(id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(MenuItems::find().count(&self.conn).await?)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = MenuItems::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
