pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod rewards;
pub mod services;

#[cfg(test)]
pub mod testing;
