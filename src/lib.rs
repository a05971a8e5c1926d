pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod progress;
pub mod services;
pub mod session;
pub mod state;
pub mod views;
