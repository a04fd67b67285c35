pub mod admin;
pub mod debug;
