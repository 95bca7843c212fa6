pub mod auth;
pub mod config;
pub mod registry;
pub mod state;
pub mod views;
