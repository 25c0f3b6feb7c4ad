pub mod utils;
pub mod types;
pub mod upstream;
pub mod core;
pub mod error;
pub mod config;
pub mod observability;
pub mod interfaces;
pub mod api;

// Default location of the config directory, relative to the working directory
pub const CONFIG_DIR: &str = "config";

// Environment variable selecting the config overlay (config/{env}.toml)
pub const RUN_ENV_VAR: &str = "RUN_ENV";
