pub mod identity;
pub mod config;
pub mod error;
