pub mod cli;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod manager;
pub mod market_data;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod statistics;
