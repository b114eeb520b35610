pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod output;
pub mod services;
pub mod session;
pub mod state;
