pub mod api;
pub mod config;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod retrieval;

pub use config::AppConfig;
pub use errors::*;
