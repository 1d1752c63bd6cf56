pub mod category;
pub mod menu;
pub mod order;
pub mod user;
