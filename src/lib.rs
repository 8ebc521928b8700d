pub mod app;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pii;
pub mod provider;
pub mod services;
pub mod types;
