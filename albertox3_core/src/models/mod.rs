pub mod activity;
pub mod automod;
pub mod blocked;
pub mod inventory;
pub mod kick;
pub mod money;
pub mod permissions;
pub mod quiz;
pub mod settings;
pub mod stats;
