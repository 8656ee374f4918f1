//! AlHaqq Connect: social feed, follows and investment portfolio tracking over HTTP.

pub mod app_state;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;

pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, Result};
