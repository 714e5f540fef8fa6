pub mod config;
pub mod logging;
pub mod scanner;
pub mod types;
pub mod version;
