pub mod config;
pub mod error;
pub mod guard;
pub mod handler;
pub mod provider;
pub mod sanitize;
pub mod server;
