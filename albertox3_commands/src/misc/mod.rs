pub mod leet;
pub mod profile;
