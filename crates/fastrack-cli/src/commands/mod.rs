pub mod config;
pub mod fast;
pub mod history;
