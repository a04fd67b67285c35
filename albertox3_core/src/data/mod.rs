pub mod database;
pub mod structs;

pub use database::{Database, Session, SessionClosed};
pub use structs::*;
