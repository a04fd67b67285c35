pub mod inventory;
pub mod money;
