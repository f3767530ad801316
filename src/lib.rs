pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod geo;
pub mod models;
pub mod observability;
pub mod state;
