pub mod about;
pub mod activity;
