pub mod automod;
pub mod kick;
