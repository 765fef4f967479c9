pub mod access;
pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod notify;
pub mod services;
pub mod sync;
pub mod types;
