pub mod blocking;
pub mod ready;
