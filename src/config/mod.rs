// src/config/mod.rs
pub mod app;

pub use app::{AppConfig, BatchConfig, CacheConfig, Credentials, FetchConfig, SmtpConfig, YahooConfig};
