pub mod prelude;

pub mod categories;
pub mod menu_items;
pub mod order_items;
pub mod orders;
pub mod users;
