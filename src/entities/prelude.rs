pub use super::categories::Entity as Categories;
pub use super::menu_items::Entity as MenuItems;
pub use super::order_items::Entity as OrderItems;
pub use super::orders::Entity as Orders;
pub use super::users::Entity as Users;
